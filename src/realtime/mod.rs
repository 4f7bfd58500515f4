//! 실시간 리스너
//! 경매 한 건 또는 사용자 한 명의 입찰 변경을 구독한다.
//! 전달은 변경 이벤트당 최대 한 번이며, 구독 해제 이후에는 콜백이 호출되지 않는다.
// region:    --- Imports
use crate::auction::model::Auction;
use crate::backend::{Backend, ChangeEvent, ChangeKind, ChannelSpec, Filter, Table};
use crate::bidding::model::Bid;
use crate::bidding::queries::get_bid_history;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Modules
pub mod subscription;

pub use subscription::{Listeners, Subscription};

// endregion: --- Modules

// region:    --- Listener Wrappers

/// 경매 행 변경 구독 (변경된 행을 그대로 전달)
pub fn subscribe_to_auction<F>(backend: &Backend, auction_id: Uuid, callback: F) -> Subscription
where
    F: Fn(Auction) + Send + Sync + 'static,
{
    debug!("{:<12} --> 경매 구독: {}", "Realtime", auction_id);
    let channel = ChannelSpec::filtered(
        Table::Auctions,
        Filter::Eq("id".to_string(), json!(auction_id)),
    );

    let active = Arc::new(AtomicBool::new(true));
    let guard = Arc::clone(&active);
    let inner = backend.feed.subscribe(
        channel,
        Arc::new(move |event: &ChangeEvent| {
            if event.kind != ChangeKind::Update || !guard.load(Ordering::SeqCst) {
                return;
            }
            let Some(row) = event.new.clone() else {
                return;
            };
            match serde_json::from_value::<Auction>(row) {
                Ok(auction) => callback(auction),
                Err(e) => warn!("{:<12} --> 경매 행 해석 실패: {}", "Realtime", e),
            }
        }),
    );

    wrap(inner, active)
}

/// 경매 입찰 구독 (새 입찰마다 입찰 이력을 다시 조회해 전달)
pub fn subscribe_to_bids<F>(backend: &Backend, auction_id: Uuid, callback: F) -> Subscription
where
    F: Fn(Vec<Bid>) + Send + Sync + 'static,
{
    debug!("{:<12} --> 입찰 이력 구독: {}", "Realtime", auction_id);
    let channel = ChannelSpec::filtered(
        Table::Bids,
        Filter::Eq("auction_id".to_string(), json!(auction_id)),
    );

    let active = Arc::new(AtomicBool::new(true));
    let guard = Arc::clone(&active);
    let callback = Arc::new(callback);
    let refetch_backend = backend.clone();

    let inner = backend.feed.subscribe(
        channel,
        Arc::new(move |event: &ChangeEvent| {
            if event.kind != ChangeKind::Insert || !guard.load(Ordering::SeqCst) {
                return;
            }
            let Ok(runtime) = Handle::try_current() else {
                warn!(
                    "{:<12} --> 런타임 없음, 입찰 이력 재조회 생략: {}",
                    "Realtime", auction_id
                );
                return;
            };
            let backend = refetch_backend.clone();
            let guard = Arc::clone(&guard);
            let callback = Arc::clone(&callback);
            runtime.spawn(async move {
                match get_bid_history(&backend, auction_id).await {
                    // 조회 중에 해제되었으면 버린다
                    Ok(bids) if guard.load(Ordering::SeqCst) => callback(bids),
                    Ok(_) => {}
                    Err(e) => warn!("{:<12} --> 입찰 이력 재조회 실패: {}", "Realtime", e),
                }
            });
        }),
    );

    wrap(inner, active)
}

/// 사용자 입찰 구독 (새 입찰 행을 그대로 전달)
pub fn subscribe_to_user_bids<F>(backend: &Backend, user_id: Uuid, callback: F) -> Subscription
where
    F: Fn(Bid) + Send + Sync + 'static,
{
    debug!("{:<12} --> 사용자 입찰 구독: {}", "Realtime", user_id);
    let channel = ChannelSpec::filtered(
        Table::Bids,
        Filter::Eq("bidder_id".to_string(), json!(user_id)),
    );

    let active = Arc::new(AtomicBool::new(true));
    let guard = Arc::clone(&active);
    let inner = backend.feed.subscribe(
        channel,
        Arc::new(move |event: &ChangeEvent| {
            if event.kind != ChangeKind::Insert || !guard.load(Ordering::SeqCst) {
                return;
            }
            let Some(row) = event.new.clone() else {
                return;
            };
            match serde_json::from_value::<Bid>(row) {
                Ok(bid) => callback(bid),
                Err(e) => warn!("{:<12} --> 입찰 행 해석 실패: {}", "Realtime", e),
            }
        }),
    );

    wrap(inner, active)
}

fn wrap(inner: Subscription, active: Arc<AtomicBool>) -> Subscription {
    Subscription::new(move || {
        active.store(false, Ordering::SeqCst);
        inner.unsubscribe();
    })
}

// endregion: --- Listener Wrappers

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::{Query, TableStore};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn bid_row(auction_id: Uuid, bidder_id: Uuid, amount: f64) -> serde_json::Value {
        json!({
            "auction_id": auction_id,
            "bidder_id": bidder_id,
            "bidder_name": "tester",
            "amount": amount,
        })
    }

    #[tokio::test]
    async fn test_bid_listener_refetches_history() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        let auction_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _sub = subscribe_to_bids(&backend, auction_id, move |bids| {
            let _ = tx.send(bids.len());
        });

        let bidder = Uuid::new_v4();
        backend
            .store
            .insert(Table::Bids, bid_row(auction_id, bidder, 100.0))
            .await
            .unwrap();
        backend
            .store
            .insert(Table::Bids, bid_row(Uuid::new_v4(), bidder, 100.0))
            .await
            .unwrap();

        let count = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(count, Some(1));
    }

    #[tokio::test]
    async fn test_unsubscribe_twice_stops_delivery() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        let user_id = Uuid::new_v4();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let sub = subscribe_to_user_bids(&backend, user_id, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(memory.feed.subscriber_count(), 1);

        backend
            .store
            .insert(Table::Bids, bid_row(Uuid::new_v4(), user_id, 10.0))
            .await
            .unwrap();
        sub.unsubscribe();
        sub.unsubscribe();
        backend
            .store
            .insert(Table::Bids, bid_row(Uuid::new_v4(), user_id, 20.0))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memory.feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_refetch_in_flight_is_dropped_after_unsubscribe() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        let auction_id = Uuid::new_v4();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let sub = subscribe_to_bids(&backend, auction_id, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        backend
            .store
            .insert(Table::Bids, bid_row(auction_id, Uuid::new_v4(), 10.0))
            .await
            .unwrap();
        // 재조회 작업이 끝나기 전에 해제
        sub.unsubscribe();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_bid_insert_outside_runtime_skips_refetch() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        let auction_id = Uuid::new_v4();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let _sub = subscribe_to_bids(&backend, auction_id, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        memory.feed.publish(ChangeEvent {
            table: Table::Bids,
            kind: ChangeKind::Insert,
            new: Some(bid_row(auction_id, Uuid::new_v4(), 10.0)),
            old: None,
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(memory.feed.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_auction_listener_passes_updated_row() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        let auction_id = Uuid::new_v4();
        memory.store.seed(
            Table::Auctions,
            json!({
                "id": auction_id,
                "title": "시계",
                "starting_bid": 10.0,
                "current_bid": 10.0,
                "min_increment": 1.0,
                "end_time": chrono::Utc::now() + chrono::Duration::hours(1),
                "seller_name": "판매자",
                "created_at": chrono::Utc::now(),
            }),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = subscribe_to_auction(&backend, auction_id, move |auction| {
            let _ = tx.send(auction.current_bid);
        });

        backend
            .store
            .update(
                Table::Auctions,
                &Query::new().eq("id", auction_id),
                json!({"current_bid": 15.0}),
            )
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(15.0));
    }
}
