use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// 관심 목록 항목
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistEntry {
    pub id: Uuid,
    pub auction_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}
