//! 입찰 관련 커맨드 처리
//! 1. 입찰 검증 (현재가, 최소 증가폭)
//! 2. 입찰 등록
// region:    --- Imports
use super::model::{Bid, NewBid};
use crate::activity::log_activity;
use crate::auction::model::{AuctionStatus, Money};
use crate::auction::queries::get_auction;
use crate::auth::commands::current_user;
use crate::backend::{decode_row, Backend, Query, Table};
use crate::error::{MarketError, MarketResult};
use crate::profile::find_profile;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub auction_id: Uuid,
    pub amount: Money,
}

/// 입찰 금액 검증
/// 현재가보다 크고, 현재가 + 최소 증가폭 이상이어야 한다.
pub fn validate_bid(current_bid: Money, min_increment: Money, amount: Money) -> MarketResult<()> {
    if !amount.is_finite() {
        return Err(MarketError::Validation(
            "입찰 금액을 숫자로 입력해 주세요.".to_string(),
        ));
    }
    let minimum = current_bid + min_increment;
    if amount <= current_bid || amount < minimum {
        return Err(MarketError::BidTooLow { minimum });
    }
    Ok(())
}

/// 입찰
/// 검증과 등록은 별도 요청이므로, 같은 현재가를 보고 들어온 동시 입찰은 모두 등록될 수 있다.
pub async fn handle_place_bid(backend: &Backend, cmd: PlaceBidCommand) -> MarketResult<Bid> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    let user = current_user(backend).await?;
    let auction = get_auction(backend, cmd.auction_id).await?;

    if auction.status_at(Utc::now()) == AuctionStatus::Ended {
        return Err(MarketError::Validation(
            "경매가 이미 종료되었습니다.".to_string(),
        ));
    }
    validate_bid(auction.current_bid, auction.min_increment, cmd.amount)?;

    let fallback_name = || user.email.split('@').next().unwrap_or_default().to_string();
    let bidder_name = match find_profile(backend, user.id).await {
        Ok(Some(profile)) => profile.display_name(),
        Ok(None) => fallback_name(),
        Err(e) => {
            warn!(
                "{:<12} --> 입찰자 프로필 조회 실패, 이메일 이름 사용: {}",
                "Command", e
            );
            fallback_name()
        }
    };

    let new_bid = NewBid {
        auction_id: auction.id,
        bidder_id: user.id,
        bidder_name,
        amount: cmd.amount,
    };
    let row = backend
        .store
        .insert(Table::Bids, serde_json::to_value(&new_bid)?)
        .await?;
    let bid: Bid = decode_row(row)?;
    info!(
        "{:<12} --> 입찰 등록 성공: {} ({})",
        "Command", bid.id, bid.amount
    );

    // 현재가는 더 낮을 때만 올린다
    let raise = Query::new()
        .eq("id", auction.id)
        .lt("current_bid", cmd.amount);
    match backend
        .store
        .update(Table::Auctions, &raise, json!({ "current_bid": cmd.amount }))
        .await
    {
        Ok(rows) if rows.is_empty() => warn!(
            "{:<12} --> 현재가 미갱신: 더 높거나 같은 입찰이 이미 반영됨",
            "Command"
        ),
        Ok(_) => {}
        Err(e) => warn!("{:<12} --> 현재가 갱신 실패: {}", "Command", e),
    }

    log_activity(
        backend,
        "bid_placed",
        json!({
            "auction_id": bid.auction_id,
            "bid_id": bid.id,
            "amount": bid.amount,
        }),
    )
    .await;

    Ok(bid)
}

// endregion: --- Commands
