// region:    --- Imports
use crate::auction::model::{AuctionFilter, AuctionView, CategorySummary};
use crate::auction::queries;
use crate::auth::commands as auth_commands;
use crate::auth::context::{AuthContext, AuthState};
use crate::auth::model::{AuthUser, Credentials, SignUpRequest};
use crate::backend::Backend;
use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
use crate::bidding::model::Bid;
use crate::bidding::queries::{get_bid_history, get_user_bids};
use crate::error::{MarketError, MarketResult};
use crate::products::commands as product_commands;
use crate::products::model::{NewProduct, Product, ProductFilter, ProductUpdate};
use crate::products::queries as product_queries;
use crate::profile::model::{ProfileUpdate, UserProfile};
use crate::profile;
use crate::routes::{guard, Access, Route};
use crate::watchlist;
use crate::watchlist::model::WatchlistEntry;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- App State

/// 핸들러 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub backend: Backend,
    pub auth: Arc<AuthContext>,
    pub storage_bucket: String,
}

/// 보호 경로와 같은 규칙으로 로그인 확인
fn ensure_signed_in(state: &AppState) -> MarketResult<()> {
    match guard(Route::Profile, &state.auth.state()) {
        Access::Granted => Ok(()),
        Access::Pending => Err(MarketError::SessionPending),
        Access::RedirectToLogin => Err(MarketError::Unauthenticated),
    }
}

/// 라우터 구성
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/home", get(handle_home))
        .route("/api/auctions", get(handle_list_auctions))
        .route("/api/auctions/:id", get(handle_get_auction))
        .route(
            "/api/auctions/:id/bids",
            get(handle_get_bid_history).post(handle_place_bid_request),
        )
        .route("/api/categories", get(handle_categories))
        .route("/api/auth/signin", post(handle_sign_in))
        .route("/api/auth/signup", post(handle_sign_up))
        .route("/api/auth/signout", post(handle_sign_out))
        .route("/api/auth/reset-password", post(handle_reset_password))
        .route("/api/auth/password", post(handle_update_password))
        .route("/api/session", get(handle_session))
        .route(
            "/api/profile",
            get(handle_get_profile).put(handle_update_profile),
        )
        .route("/api/profile/avatar", post(handle_upload_avatar))
        .route("/api/profile/bids", get(handle_my_bids))
        .route(
            "/api/products",
            get(handle_list_products).post(handle_create_product),
        )
        .route("/api/products/mine", get(handle_my_products))
        .route("/api/products/image", post(handle_upload_product_image))
        .route(
            "/api/products/:id",
            get(handle_get_product)
                .put(handle_update_product)
                .delete(handle_delete_product),
        )
        .route(
            "/api/saved",
            get(handle_list_saved).post(handle_add_saved),
        )
        .route("/api/saved/:auction_id", delete(handle_remove_saved))
        .route("/api/pages", get(handle_resolve_page))
        .with_state(state)
}

// endregion: --- App State

// region:    --- Auction Handlers

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub featured: Vec<AuctionView>,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Serialize)]
pub struct AuctionDetail {
    pub auction: AuctionView,
    pub bids: Vec<Bid>,
}

#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub amount: f64,
}

const FEATURED_LIMIT: usize = 6;

fn views(auctions: Vec<crate::auction::model::Auction>) -> Vec<AuctionView> {
    let now = Utc::now();
    auctions
        .into_iter()
        .map(|auction| AuctionView::new(auction, now))
        .collect()
}

/// 홈 화면 (마감 임박 경매 + 카테고리)
pub async fn handle_home(State(state): State<AppState>) -> MarketResult<Json<HomePage>> {
    let featured = queries::featured_auctions(&state.backend, FEATURED_LIMIT).await?;
    let categories = queries::list_categories(&state.backend).await?;
    Ok(Json(HomePage {
        featured: views(featured),
        categories,
    }))
}

/// 경매 목록
pub async fn handle_list_auctions(
    State(state): State<AppState>,
    Query(filter): Query<AuctionFilter>,
) -> MarketResult<Json<Vec<AuctionView>>> {
    let auctions = queries::list_auctions(&state.backend, &filter).await?;
    Ok(Json(views(auctions)))
}

/// 경매 상세 (입찰 이력 포함)
pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> MarketResult<Json<AuctionDetail>> {
    let auction = queries::get_auction(&state.backend, id).await?;
    let bids = get_bid_history(&state.backend, id).await?;
    Ok(Json(AuctionDetail {
        auction: AuctionView::new(auction, Utc::now()),
        bids,
    }))
}

/// 입찰 이력
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> MarketResult<Json<Vec<Bid>>> {
    Ok(Json(get_bid_history(&state.backend, id).await?))
}

/// 입찰 요청 처리
pub async fn handle_place_bid_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BidRequest>,
) -> MarketResult<(StatusCode, Json<Bid>)> {
    ensure_signed_in(&state)?;
    let cmd = PlaceBidCommand {
        auction_id: id,
        amount: request.amount,
    };
    let bid = handle_place_bid(&state.backend, cmd).await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

/// 카테고리 목록
pub async fn handle_categories(
    State(state): State<AppState>,
) -> MarketResult<Json<Vec<CategorySummary>>> {
    Ok(Json(queries::list_categories(&state.backend).await?))
}

// endregion: --- Auction Handlers

// region:    --- Auth Handlers

/// 세션 정보 (토큰은 노출하지 않음)
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub loading: bool,
    pub authenticated: bool,
    pub user: Option<AuthUser>,
    pub expires_at: Option<DateTime<Utc>>,
    pub profile: Option<UserProfile>,
}

impl From<AuthState> for SessionView {
    fn from(state: AuthState) -> Self {
        Self {
            loading: state.loading,
            authenticated: state.is_authenticated(),
            user: state.session.as_ref().map(|s| s.user.clone()),
            expires_at: state.session.as_ref().map(|s| s.expires_at),
            profile: state.profile,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> MarketResult<Json<SessionView>> {
    auth_commands::sign_in(&state.backend, &credentials).await?;
    state.auth.refresh_profile().await?;
    Ok(Json(state.auth.state().into()))
}

pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> MarketResult<(StatusCode, Json<SessionView>)> {
    auth_commands::sign_up(&state.backend, &request).await?;
    state.auth.refresh_profile().await?;
    Ok((StatusCode::CREATED, Json(state.auth.state().into())))
}

pub async fn handle_sign_out(State(state): State<AppState>) -> MarketResult<StatusCode> {
    auth_commands::sign_out(&state.backend).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> MarketResult<StatusCode> {
    auth_commands::reset_password(&state.backend, &request.email).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn handle_update_password(
    State(state): State<AppState>,
    Json(request): Json<PasswordRequest>,
) -> MarketResult<StatusCode> {
    ensure_signed_in(&state)?;
    auth_commands::update_password(&state.backend, &request.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 현재 인증 상태
pub async fn handle_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.auth.state().into())
}

// endregion: --- Auth Handlers

// region:    --- Profile Handlers

pub async fn handle_get_profile(State(state): State<AppState>) -> MarketResult<Json<UserProfile>> {
    ensure_signed_in(&state)?;
    Ok(Json(profile::get_my_profile(&state.backend).await?))
}

pub async fn handle_update_profile(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> MarketResult<Json<UserProfile>> {
    ensure_signed_in(&state)?;
    let user_id = auth_commands::current_user(&state.backend).await?.id;
    let updated = profile::update_profile(&state.backend, user_id, &update).await?;
    state.auth.refresh_profile().await?;
    Ok(Json(updated))
}

/// 아바타 업로드 (요청 본문 = 이미지 바이트)
pub async fn handle_upload_avatar(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> MarketResult<Json<UserProfile>> {
    ensure_signed_in(&state)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let updated = profile::upload_avatar(
        &state.backend,
        &state.storage_bucket,
        body.to_vec(),
        content_type,
    )
    .await?;
    state.auth.refresh_profile().await?;
    Ok(Json(updated))
}

/// 내 입찰 내역
pub async fn handle_my_bids(State(state): State<AppState>) -> MarketResult<Json<Vec<Bid>>> {
    ensure_signed_in(&state)?;
    let user = auth_commands::current_user(&state.backend).await?;
    Ok(Json(get_user_bids(&state.backend, user.id).await?))
}

// endregion: --- Profile Handlers

// region:    --- Product Handlers

#[derive(Debug, Deserialize)]
pub struct ImageParams {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct ImageUploaded {
    pub url: String,
}

pub async fn handle_list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> MarketResult<Json<Vec<Product>>> {
    Ok(Json(product_queries::list_products(&state.backend, &filter).await?))
}

pub async fn handle_create_product(
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> MarketResult<(StatusCode, Json<Product>)> {
    ensure_signed_in(&state)?;
    let created = product_commands::create_product(&state.backend, &product).await?;
    info!("{:<12} --> 상품 등록 완료: {}", "Handler", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn handle_my_products(State(state): State<AppState>) -> MarketResult<Json<Vec<Product>>> {
    ensure_signed_in(&state)?;
    Ok(Json(product_queries::list_my_products(&state.backend).await?))
}

pub async fn handle_get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> MarketResult<Json<Product>> {
    Ok(Json(product_queries::get_product(&state.backend, id).await?))
}

pub async fn handle_update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ProductUpdate>,
) -> MarketResult<Json<Product>> {
    ensure_signed_in(&state)?;
    Ok(Json(
        product_commands::update_product(&state.backend, id, &update).await?,
    ))
}

pub async fn handle_delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> MarketResult<StatusCode> {
    ensure_signed_in(&state)?;
    product_commands::delete_product(&state.backend, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 상품 이미지 업로드 (요청 본문 = 이미지 바이트)
pub async fn handle_upload_product_image(
    State(state): State<AppState>,
    Query(params): Query<ImageParams>,
    body: Bytes,
) -> MarketResult<Json<ImageUploaded>> {
    ensure_signed_in(&state)?;
    let url =
        product_commands::upload_product_image(&state.backend, &params.file_name, body.to_vec())
            .await?;
    Ok(Json(ImageUploaded { url }))
}

// endregion: --- Product Handlers

// region:    --- Watchlist Handlers

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub auction_id: Uuid,
}

pub async fn handle_list_saved(
    State(state): State<AppState>,
) -> MarketResult<Json<Vec<AuctionView>>> {
    ensure_signed_in(&state)?;
    Ok(Json(views(watchlist::list_watchlist(&state.backend).await?)))
}

pub async fn handle_add_saved(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> MarketResult<Json<WatchlistEntry>> {
    ensure_signed_in(&state)?;
    Ok(Json(
        watchlist::add_to_watchlist(&state.backend, request.auction_id).await?,
    ))
}

pub async fn handle_remove_saved(
    State(state): State<AppState>,
    Path(auction_id): Path<Uuid>,
) -> MarketResult<StatusCode> {
    ensure_signed_in(&state)?;
    watchlist::remove_from_watchlist(&state.backend, auction_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Watchlist Handlers

// region:    --- Page Handlers

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct PageResolution {
    pub route: Route,
    pub path: String,
    pub access: Access,
    /// 로그인 화면으로 보낼 때의 이동 경로
    pub redirect: Option<String>,
}

/// 화면 경로 해석과 접근 판정
pub async fn handle_resolve_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Json<PageResolution> {
    let route = Route::parse(&params.path);
    let access = guard(route, &state.auth.state());
    let redirect = (access == Access::RedirectToLogin).then(|| Route::Login.path());
    Json(PageResolution {
        route,
        path: route.path(),
        access,
        redirect,
    })
}

// endregion: --- Page Handlers
