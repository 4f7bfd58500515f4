//! 관심 경매 목록
// region:    --- Imports
use crate::auction::model::Auction;
use crate::auction::queries::get_auction;
use crate::auth::commands::current_user;
use crate::backend::{decode_row, decode_rows, Backend, Query, SortDirection, Table};
use crate::error::MarketResult;
use model::WatchlistEntry;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

// endregion: --- Imports

pub mod model;

/// 관심 목록 추가 (이미 있으면 기존 항목 반환)
pub async fn add_to_watchlist(backend: &Backend, auction_id: Uuid) -> MarketResult<WatchlistEntry> {
    let user = current_user(backend).await?;
    // 존재하지 않는 경매는 NotFound
    get_auction(backend, auction_id).await?;

    let query = Query::new()
        .eq("user_id", user.id)
        .eq("auction_id", auction_id);
    let existing: Vec<WatchlistEntry> =
        decode_rows(backend.store.select(Table::Watchlist, &query).await?)?;
    if let Some(entry) = existing.into_iter().next() {
        return Ok(entry);
    }

    info!("{:<12} --> 관심 목록 추가: {}", "Watchlist", auction_id);
    let row = backend
        .store
        .insert(
            Table::Watchlist,
            json!({ "auction_id": auction_id, "user_id": user.id }),
        )
        .await?;
    decode_row(row)
}

/// 관심 목록 제거 (없으면 아무 일도 하지 않음)
pub async fn remove_from_watchlist(backend: &Backend, auction_id: Uuid) -> MarketResult<()> {
    let user = current_user(backend).await?;
    let query = Query::new()
        .eq("user_id", user.id)
        .eq("auction_id", auction_id);
    let removed = backend.store.delete(Table::Watchlist, &query).await?;
    info!(
        "{:<12} --> 관심 목록 제거: {} ({}건)",
        "Watchlist", auction_id, removed
    );
    Ok(())
}

/// 내 관심 경매 목록 (최근 추가순)
/// 그 사이 삭제된 경매는 건너뛴다.
pub async fn list_watchlist(backend: &Backend) -> MarketResult<Vec<Auction>> {
    let user = current_user(backend).await?;
    let query = Query::new()
        .eq("user_id", user.id)
        .order("created_at", SortDirection::Desc);
    let entries: Vec<WatchlistEntry> =
        decode_rows(backend.store.select(Table::Watchlist, &query).await?)?;

    let mut auctions = Vec::with_capacity(entries.len());
    for entry in entries {
        match get_auction(backend, entry.auction_id).await {
            Ok(auction) => auctions.push(auction),
            Err(e) => warn!(
                "{:<12} --> 관심 경매 조회 실패 {}: {}",
                "Watchlist", entry.auction_id, e
            ),
        }
    }
    Ok(auctions)
}
