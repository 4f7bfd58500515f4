// region:    --- Imports
use super::model::Bid;
use crate::auction::model::Money;
use crate::backend::{decode_rows, Backend, Query, SortDirection, Table};
use crate::error::MarketResult;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Query Handlers

/// 입찰 이력 조회 (최신순)
pub async fn get_bid_history(backend: &Backend, auction_id: Uuid) -> MarketResult<Vec<Bid>> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", auction_id);
    let query = Query::new()
        .eq("auction_id", auction_id)
        .order("created_at", SortDirection::Desc);
    decode_rows(backend.store.select(Table::Bids, &query).await?)
}

/// 사용자 입찰 조회 (최신순)
pub async fn get_user_bids(backend: &Backend, user_id: Uuid) -> MarketResult<Vec<Bid>> {
    info!("{:<12} --> 사용자 입찰 조회 id: {}", "Query", user_id);
    let query = Query::new()
        .eq("bidder_id", user_id)
        .order("created_at", SortDirection::Desc);
    decode_rows(backend.store.select(Table::Bids, &query).await?)
}

/// 최고 입찰가 조회
pub async fn get_highest_bid(backend: &Backend, auction_id: Uuid) -> MarketResult<Option<Money>> {
    info!("{:<12} --> 최고 입찰가 조회 id: {}", "Query", auction_id);
    let query = Query::new()
        .eq("auction_id", auction_id)
        .order("amount", SortDirection::Desc)
        .limit(1);
    let bids: Vec<Bid> = decode_rows(backend.store.select(Table::Bids, &query).await?)?;
    Ok(bids.first().map(|b| b.amount))
}

// endregion: --- Query Handlers
