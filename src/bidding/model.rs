use crate::auction::model::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// 입찰 모델
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bid {
    pub id: Uuid,
    pub auction_id: Uuid,
    pub bidder_id: Uuid,
    pub bidder_name: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

// 입찰 생성 요청 (id, 시간은 서버가 부여)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBid {
    pub auction_id: Uuid,
    pub bidder_id: Uuid,
    pub bidder_name: String,
    pub amount: Money,
}
