// region:    --- Imports
use crate::error::{MarketError, MarketResult};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Config

/// 실행 설정 (환경 변수, `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub image_host_url: Option<String>,
    pub image_host_key: Option<String>,
    pub storage_bucket: String,
    pub port: u16,
    pub poll_interval: Duration,
    pub session_refresh: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            backend_key: None,
            image_host_url: None,
            image_host_key: None,
            storage_bucket: "avatars".to_string(),
            port: 3000,
            poll_interval: Duration::from_millis(2000),
            session_refresh: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// 설정 로드
    pub fn load() -> MarketResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 키 조회 함수로부터 설정 생성
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MarketResult<Self> {
        let defaults = Self::default();
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            backend_url: optional("MARKET_BACKEND_URL").map(|u| u.trim_end_matches('/').to_string()),
            backend_key: optional("MARKET_BACKEND_KEY"),
            image_host_url: optional("MARKET_IMAGE_HOST_URL"),
            image_host_key: optional("MARKET_IMAGE_HOST_KEY"),
            storage_bucket: optional("MARKET_STORAGE_BUCKET").unwrap_or(defaults.storage_bucket),
            port: try_load(&lookup, "MARKET_PORT", defaults.port)?,
            poll_interval: Duration::from_millis(non_zero(
                "MARKET_POLL_INTERVAL_MS",
                try_load(
                    &lookup,
                    "MARKET_POLL_INTERVAL_MS",
                    defaults.poll_interval.as_millis() as u64,
                )?,
            )?),
            session_refresh: Duration::from_secs(non_zero(
                "MARKET_SESSION_REFRESH_SECS",
                try_load(
                    &lookup,
                    "MARKET_SESSION_REFRESH_SECS",
                    defaults.session_refresh.as_secs(),
                )?,
            )?),
        };

        if config.backend_url.is_some() && config.backend_key.is_none() {
            return Err(MarketError::Config(
                "MARKET_BACKEND_URL 사용 시 MARKET_BACKEND_KEY 가 필요합니다.".to_string(),
            ));
        }
        Ok(config)
    }

    /// 원격 백엔드 사용 여부
    pub fn uses_remote_backend(&self) -> bool {
        self.backend_url.is_some()
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> MarketResult<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("{:<12} --> 잘못된 {} 값: {}", "Config", key, e);
            MarketError::Config(format!("{}: {}", key, e))
        }),
        None => {
            info!("{:<12} --> {} 미설정, 기본값 사용: {}", "Config", key, default);
            Ok(default)
        }
    }
}

/// 주기 값은 0 이 될 수 없다 (tokio interval 제약)
fn non_zero(key: &str, value: u64) -> MarketResult<u64> {
    if value == 0 {
        warn!("{:<12} --> {} 값은 0보다 커야 합니다", "Config", key);
        return Err(MarketError::Config(format!("{}: 0보다 커야 합니다", key)));
    }
    Ok(value)
}

// endregion: --- Config
