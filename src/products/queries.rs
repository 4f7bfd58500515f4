// region:    --- Imports
use super::model::{Product, ProductFilter};
use crate::auth::commands::current_user;
use crate::backend::{decode_rows, Backend, Query, SortDirection, Table};
use crate::error::{MarketError, MarketResult};
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Query Handlers

/// 상품 조회
pub async fn get_product(backend: &Backend, product_id: Uuid) -> MarketResult<Product> {
    info!("{:<12} --> 상품 조회 id: {}", "Query", product_id);
    let rows = backend
        .store
        .select(Table::Products, &Query::new().eq("id", product_id))
        .await?;
    decode_rows::<Product>(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| MarketError::NotFound("상품".to_string()))
}

/// 내 상품 목록 (최신순)
pub async fn list_my_products(backend: &Backend) -> MarketResult<Vec<Product>> {
    let user = current_user(backend).await?;
    info!("{:<12} --> 내 상품 조회 owner: {}", "Query", user.id);
    let query = Query::new()
        .eq("owner_id", user.id)
        .order("created_at", SortDirection::Desc);
    decode_rows(backend.store.select(Table::Products, &query).await?)
}

/// 전체 상품 목록
/// 가격 범위는 양 끝 포함, 제목 검색은 대소문자 무시. 페이지 구분 없이 전부 반환한다.
pub async fn list_products(backend: &Backend, filter: &ProductFilter) -> MarketResult<Vec<Product>> {
    info!("{:<12} --> 상품 목록 조회: {:?}", "Query", filter);
    let mut query = Query::new();
    if let Some(min) = filter.min_price {
        query = query.gte("price", min);
    }
    if let Some(max) = filter.max_price {
        query = query.lte("price", max);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.contains("title", search);
    }
    let sort = filter.sort.unwrap_or_default();
    let direction = filter.direction.unwrap_or(SortDirection::Desc);
    query = query.order(sort.column(), direction);

    decode_rows(backend.store.select(Table::Products, &query).await?)
}

// endregion: --- Query Handlers
