//! 활동 기록
//! 기록 실패는 경고 로그만 남기고 버린다. 호출한 작업의 결과에는 영향을 주지 않는다.
// region:    --- Imports
use crate::backend::Backend;
use crate::error::MarketResult;
use serde_json::{json, Value};
use std::future::Future;
use tracing::{debug, warn};

// endregion: --- Imports

// region:    --- Best Effort

/// 실패해도 되는 부수 작업 실행
pub async fn best_effort<T, F>(label: &str, task: F) -> Option<T>
where
    F: Future<Output = MarketResult<T>>,
{
    match task.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{:<12} --> {} 실패 (무시): {}", "BestEffort", label, e);
            None
        }
    }
}

/// 활동 기록 RPC 호출
pub async fn log_activity(backend: &Backend, action: &str, details: Value) {
    debug!("{:<12} --> 활동 기록: {}", "Activity", action);
    let args = json!({ "action": action, "details": details });
    best_effort("활동 기록", backend.rpc.call("log_activity", args)).await;
}

// endregion: --- Best Effort
