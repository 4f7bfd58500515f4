// region:    --- Imports
use super::model::{Auction, AuctionFilter, AuctionSort, AuctionStatus, CategorySummary};
use crate::backend::{decode_rows, Backend, Query, SortDirection, Table};
use crate::error::{MarketError, MarketResult};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Query Handlers

/// 경매 조회
pub async fn get_auction(backend: &Backend, auction_id: Uuid) -> MarketResult<Auction> {
    info!("{:<12} --> 경매 조회 id: {}", "Query", auction_id);
    let rows = backend
        .store
        .select(Table::Auctions, &Query::new().eq("id", auction_id))
        .await?;
    decode_rows::<Auction>(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| MarketError::NotFound("경매".to_string()))
}

/// 경매 목록 조회
pub async fn list_auctions(backend: &Backend, filter: &AuctionFilter) -> MarketResult<Vec<Auction>> {
    info!("{:<12} --> 경매 목록 조회: {:?}", "Query", filter);
    let mut query = Query::new();
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        query = query.eq("category", category);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.contains("title", search);
    }
    query = match filter.sort {
        AuctionSort::EndingSoon => query.order("end_time", SortDirection::Asc),
        AuctionSort::Newest => query.order("created_at", SortDirection::Desc),
        AuctionSort::PriceLow => query.order("current_bid", SortDirection::Asc),
        AuctionSort::PriceHigh => query.order("current_bid", SortDirection::Desc),
    };

    let rows = backend.store.select(Table::Auctions, &query).await?;
    let auctions = decode_rows::<Auction>(rows)?;

    // 상태는 종료 시간으로도 결정되므로 조회 후 거른다
    let now = Utc::now();
    Ok(match filter.status {
        Some(status) => auctions
            .into_iter()
            .filter(|a| a.status_at(now) == status)
            .collect(),
        None => auctions,
    })
}

/// 홈 화면 추천 경매 (진행 중, 마감 임박 순)
pub async fn featured_auctions(backend: &Backend, limit: usize) -> MarketResult<Vec<Auction>> {
    let filter = AuctionFilter {
        status: Some(AuctionStatus::Active),
        sort: AuctionSort::EndingSoon,
        ..Default::default()
    };
    let mut auctions = list_auctions(backend, &filter).await?;
    auctions.truncate(limit);
    Ok(auctions)
}

/// 카테고리별 경매 수
pub async fn list_categories(backend: &Backend) -> MarketResult<Vec<CategorySummary>> {
    info!("{:<12} --> 카테고리 조회", "Query");
    let rows = backend.store.select(Table::Auctions, &Query::new()).await?;
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for auction in decode_rows::<Auction>(rows)? {
        if !auction.category.is_empty() {
            *counts.entry(auction.category).or_default() += 1;
        }
    }
    Ok(counts
        .into_iter()
        .map(|(name, auction_count)| CategorySummary {
            name,
            auction_count,
        })
        .collect())
}

// endregion: --- Query Handlers
