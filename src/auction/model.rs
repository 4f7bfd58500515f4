use crate::currency::format_price_display;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 금액 (USD)
pub type Money = f64;

// 경매 상태
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    #[default]
    Active,
    Ended,
}

// 판매자 정보
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SellerInfo {
    #[serde(rename = "seller_name")]
    pub name: String,
    #[serde(rename = "seller_rating", default)]
    pub rating: f64,
    #[serde(rename = "seller_join_date", default)]
    pub join_date: Option<DateTime<Utc>>,
    #[serde(rename = "seller_sales", default)]
    pub sales: u32,
}

// 경매 모델
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Auction {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: String,
    pub starting_bid: Money,
    pub current_bid: Money,
    pub min_increment: Money,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: AuctionStatus,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub seller: SellerInfo,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub watchers: u64,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// 명시적 종료 상태 또는 종료 시간 경과 시 종료
    pub fn status_at(&self, now: DateTime<Utc>) -> AuctionStatus {
        if self.status == AuctionStatus::Ended || self.end_time <= now {
            AuctionStatus::Ended
        } else {
            AuctionStatus::Active
        }
    }

    /// 다음 최소 입찰가
    pub fn next_minimum_bid(&self) -> Money {
        self.current_bid + self.min_increment
    }
}

// 경매 목록 필터
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuctionFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub status: Option<AuctionStatus>,
    #[serde(default)]
    pub sort: AuctionSort,
}

// 경매 정렬 기준
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuctionSort {
    #[default]
    EndingSoon,
    Newest,
    PriceLow,
    PriceHigh,
}

// 카테고리 요약
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub name: String,
    pub auction_count: usize,
}

// 화면 표시용 경매 정보
#[derive(Debug, Clone, Serialize)]
pub struct AuctionView {
    #[serde(flatten)]
    pub auction: Auction,
    pub effective_status: AuctionStatus,
    pub next_minimum_bid: Money,
    pub price_display: String,
    pub seconds_remaining: i64,
}

impl AuctionView {
    pub fn new(auction: Auction, now: DateTime<Utc>) -> Self {
        let effective_status = auction.status_at(now);
        let next_minimum_bid = auction.next_minimum_bid();
        let price_display = format_price_display(auction.current_bid);
        let seconds_remaining = (auction.end_time - now).num_seconds().max(0);
        Self {
            auction,
            effective_status,
            next_minimum_bid,
            price_display,
            seconds_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(end_in: Duration) -> Auction {
        let now = Utc::now();
        Auction {
            id: Uuid::new_v4(),
            title: "빈티지 카메라".to_string(),
            description: String::new(),
            category: "전자기기".to_string(),
            condition: "used".to_string(),
            starting_bid: 100.0,
            current_bid: 12500.0,
            min_increment: 250.0,
            end_time: now + end_in,
            status: AuctionStatus::Active,
            images: vec![],
            seller: SellerInfo::default(),
            views: 0,
            watchers: 0,
            created_at: now,
        }
    }

    #[test]
    fn test_status_inferred_from_end_time() {
        let now = Utc::now();
        assert_eq!(sample(Duration::hours(1)).status_at(now), AuctionStatus::Active);
        assert_eq!(sample(Duration::hours(-1)).status_at(now), AuctionStatus::Ended);

        let mut explicit = sample(Duration::hours(1));
        explicit.status = AuctionStatus::Ended;
        assert_eq!(explicit.status_at(now), AuctionStatus::Ended);
    }

    #[test]
    fn test_row_round_trip_uses_seller_columns() {
        let auction = sample(Duration::hours(1));
        let row = serde_json::to_value(&auction).unwrap();
        assert!(row.get("seller_name").is_some());
        assert_eq!(row["status"], "active");
        let back: Auction = serde_json::from_value(row).unwrap();
        assert_eq!(back, auction);
    }

    #[test]
    fn test_view_next_minimum_bid() {
        let view = AuctionView::new(sample(Duration::hours(1)), Utc::now());
        assert_eq!(view.next_minimum_bid, 12750.0);
        assert_eq!(view.price_display, "$12,500.00 (₹1,062,500.00)");
    }
}
