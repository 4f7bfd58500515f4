//! 폴링 기반 변경 피드
//! 구독마다 주기적으로 대상 행을 조회하고 이전 스냅샷과 비교해
//! insert/update/delete 이벤트를 만든다. 첫 조회는 기준점이며,
//! 연결이 끊긴 동안의 중간 변경은 재전송하지 않는다.
// region:    --- Imports
use super::{ChangeEvent, ChangeFeed, ChangeHandler, ChangeKind, ChannelSpec, Table, TableStore};
use crate::realtime::subscription::Subscription;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, warn};

// endregion: --- Imports

// region:    --- Polling Feed

pub struct PollingFeed {
    store: Arc<dyn TableStore>,
    period: Duration,
}

impl PollingFeed {
    pub fn new(store: Arc<dyn TableStore>, period: Duration) -> Self {
        Self { store, period }
    }
}

impl ChangeFeed for PollingFeed {
    fn subscribe(&self, channel: ChannelSpec, handler: ChangeHandler) -> Subscription {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(
                "{:<12} --> 런타임 밖에서 구독할 수 없습니다: {:?}",
                "Polling", channel
            );
            return Subscription::noop();
        };

        let store = Arc::clone(&self.store);
        let period = self.period;
        debug!("{:<12} --> 폴링 구독 시작: {:?}", "Polling", channel);

        let task = runtime.spawn(async move {
            let query = channel.query();
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut snapshot: Option<BTreeMap<String, Value>> = None;

            loop {
                ticker.tick().await;
                let rows = match store.select(channel.table, &query).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        warn!("{:<12} --> 폴링 조회 실패: {}", "Polling", e);
                        continue;
                    }
                };

                let current = index_rows(rows);
                if let Some(previous) = &snapshot {
                    for event in diff_snapshots(channel.table, previous, &current) {
                        handler(&event);
                    }
                }
                snapshot = Some(current);
            }
        });

        Subscription::new(move || {
            debug!("{:<12} --> 폴링 구독 해제", "Polling");
            task.abort();
        })
    }
}

fn index_rows(rows: Vec<Value>) -> BTreeMap<String, Value> {
    rows.into_iter()
        .filter_map(|row| {
            let key = match row.get("id")? {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key, row))
        })
        .collect()
}

/// 두 스냅샷의 차이를 변경 이벤트로 변환
fn diff_snapshots(
    table: Table,
    previous: &BTreeMap<String, Value>,
    current: &BTreeMap<String, Value>,
) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (id, row) in current {
        match previous.get(id) {
            None => events.push(ChangeEvent {
                table,
                kind: ChangeKind::Insert,
                new: Some(row.clone()),
                old: None,
            }),
            Some(old) if old != row => events.push(ChangeEvent {
                table,
                kind: ChangeKind::Update,
                new: Some(row.clone()),
                old: Some(old.clone()),
            }),
            Some(_) => {}
        }
    }

    for (id, old) in previous {
        if !current.contains_key(id) {
            events.push(ChangeEvent {
                table,
                kind: ChangeKind::Delete,
                new: None,
                old: Some(old.clone()),
            });
        }
    }

    events
}

// endregion: --- Polling Feed
