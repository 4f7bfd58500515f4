use crate::auction::model::Money;
use crate::backend::SortDirection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// 상품 모델
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub image_url: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// 상품 등록 폼
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub image_url: Option<String>,
}

// 상품 수정 폼 (지정된 필드만 변경)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

// 정렬 기준
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortKey {
    #[default]
    CreatedAt,
    Price,
    Title,
}

impl ProductSortKey {
    pub fn column(&self) -> &'static str {
        match self {
            ProductSortKey::CreatedAt => "created_at",
            ProductSortKey::Price => "price",
            ProductSortKey::Title => "title",
        }
    }
}

// 상품 목록 필터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub search: Option<String>,
    pub sort: Option<ProductSortKey>,
    pub direction: Option<SortDirection>,
}
