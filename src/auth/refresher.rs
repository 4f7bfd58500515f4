//! 세션 토큰 갱신 스케줄러
//! 만료가 가까운 세션을 주기적으로 갱신한다. 갱신 결과는 `TokenRefreshed` 이벤트로 전달된다.
// region:    --- Imports
use crate::backend::Backend;
use crate::error::MarketResult;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

/// 만료 이 시간 전부터 갱신
const REFRESH_MARGIN_SECS: i64 = 120;

// region:    --- Session Refresher

pub struct SessionRefresher {
    backend: Backend,
    period: Duration,
    margin: chrono::Duration,
}

impl SessionRefresher {
    pub fn new(backend: Backend, period: Duration) -> Self {
        Self {
            backend,
            period,
            margin: chrono::Duration::seconds(REFRESH_MARGIN_SECS),
        }
    }

    /// 갱신 루프 시작
    pub fn start(self) -> JoinHandle<()> {
        info!(
            "{:<12} --> 세션 갱신 주기: {:?}",
            "Refresher", self.period
        );
        tokio::spawn(async move {
            let mut interval = interval(self.period);
            loop {
                interval.tick().await;
                if let Err(e) = self.refresh_if_expiring().await {
                    error!("{:<12} --> 세션 갱신 중 오류 발생: {}", "Refresher", e);
                }
            }
        })
    }

    /// 만료가 가까우면 갱신. 갱신했으면 true
    pub async fn refresh_if_expiring(&self) -> MarketResult<bool> {
        let Some(session) = self.backend.identity.get_session().await? else {
            return Ok(false);
        };
        if !session.expires_within(Utc::now(), self.margin) {
            return Ok(false);
        }

        let refreshed = self.backend.identity.refresh_session().await?;
        debug!(
            "{:<12} --> 세션 갱신 완료, 만료: {}",
            "Refresher", refreshed.expires_at
        );
        Ok(true)
    }
}

// endregion: --- Session Refresher
