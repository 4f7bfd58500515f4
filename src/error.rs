// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

// endregion: --- Imports

// region:    --- Error

/// 마켓 전역 오류 타입
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketError {
    #[error("로그인이 필요합니다.")]
    Unauthenticated,

    #[error("{0}을(를) 찾을 수 없습니다.")]
    NotFound(String),

    #[error("권한이 없습니다: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Validation(String),

    #[error("입찰 금액이 너무 낮습니다. 최소 입찰가: {minimum}")]
    BidTooLow { minimum: f64 },

    #[error("{0}")]
    Persistence(String),

    #[error("네트워크 오류: {0}")]
    Network(String),

    #[error("세션을 확인하는 중입니다.")]
    SessionPending,

    #[error("설정 오류: {0}")]
    Config(String),
}

pub type MarketResult<T> = Result<T, MarketError>;

/// 사용자에게 보여주는 알림(토스트) 내용
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Toast {
    pub title: String,
    pub description: String,
}

impl MarketError {
    /// 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::Unauthenticated => "UNAUTHENTICATED",
            MarketError::NotFound(_) => "NOT_FOUND",
            MarketError::PermissionDenied(_) => "PERMISSION_DENIED",
            MarketError::Validation(_) => "VALIDATION_ERROR",
            MarketError::BidTooLow { .. } => "BID_TOO_LOW",
            MarketError::Persistence(_) => "PERSISTENCE_ERROR",
            MarketError::Network(_) => "NETWORK_ERROR",
            MarketError::SessionPending => "SESSION_PENDING",
            MarketError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// 토스트 알림으로 변환
    pub fn toast(&self) -> Toast {
        let title = match self {
            MarketError::Unauthenticated => "로그인 필요",
            MarketError::NotFound(_) => "찾을 수 없음",
            MarketError::PermissionDenied(_) => "권한 없음",
            MarketError::Validation(_) => "입력 오류",
            MarketError::BidTooLow { .. } => "입찰 실패",
            MarketError::Persistence(_) => "저장 실패",
            MarketError::Network(_) => "네트워크 오류",
            MarketError::SessionPending => "잠시만 기다려 주세요",
            MarketError::Config(_) => "설정 오류",
        };
        Toast {
            title: title.to_string(),
            description: self.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            MarketError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            MarketError::Validation(_) | MarketError::BidTooLow { .. } => StatusCode::BAD_REQUEST,
            MarketError::Persistence(_) | MarketError::Network(_) => StatusCode::BAD_GATEWAY,
            MarketError::SessionPending => StatusCode::SERVICE_UNAVAILABLE,
            MarketError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let toast = self.toast();
        let mut body = serde_json::json!({
            "code": self.code(),
            "title": toast.title,
            "description": toast.description,
        });
        if let MarketError::BidTooLow { minimum } = self {
            body["minimum"] = serde_json::json!(minimum);
        }
        (self.status(), Json(body)).into_response()
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(e: serde_json::Error) -> Self {
        MarketError::Persistence(format!("응답 형식 오류: {}", e))
    }
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        MarketError::Network(e.to_string())
    }
}

// endregion: --- Error
