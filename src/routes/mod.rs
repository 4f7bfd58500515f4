//! 화면 경로와 접근 제어
// region:    --- Imports
use crate::auth::context::AuthState;
use serde::Serialize;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Route

/// 화면 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "page", content = "id", rename_all = "snake_case")]
pub enum Route {
    Home,
    Auctions,
    AuctionDetail(Uuid),
    Categories,
    Login,
    Signup,
    Profile,
    Saved,
    About,
    Contact,
    NotFound,
}

impl Route {
    /// 경로 문자열 해석 (쿼리, 끝 슬래시 무시)
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["auctions"] => Route::Auctions,
            ["auctions", id] => match Uuid::parse_str(id) {
                Ok(id) => Route::AuctionDetail(id),
                Err(_) => Route::NotFound,
            },
            ["categories"] => Route::Categories,
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            ["profile"] => Route::Profile,
            ["saved"] => Route::Saved,
            ["about"] => Route::About,
            ["contact"] => Route::Contact,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Auctions => "/auctions".to_string(),
            Route::AuctionDetail(id) => format!("/auctions/{}", id),
            Route::Categories => "/categories".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Saved => "/saved".to_string(),
            Route::About => "/about".to_string(),
            Route::Contact => "/contact".to_string(),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// 로그인이 필요한 화면
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Profile | Route::Saved)
    }
}

// endregion: --- Route

// region:    --- Guard

/// 접근 판정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Granted,
    /// 인증 상태 확인 중 (로딩 표시)
    Pending,
    RedirectToLogin,
}

/// 보호 경로 접근 판정
/// 인증 상태를 확인하는 동안에는 허용도 이동도 하지 않는다.
pub fn guard(route: Route, state: &AuthState) -> Access {
    if !route.requires_auth() {
        return Access::Granted;
    }
    if state.loading {
        return Access::Pending;
    }
    if state.is_authenticated() {
        Access::Granted
    } else {
        Access::RedirectToLogin
    }
}

// endregion: --- Guard
