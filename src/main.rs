// region:    --- Imports
use auction_market::auth::context::AuthContext;
use auction_market::auth::refresher::SessionRefresher;
use auction_market::backend::{memory::MemoryBackend, rest, Backend};
use auction_market::config::Config;
use auction_market::handlers::{self, AppState};
use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 설정 로드
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{:<12} --> 설정 로드 실패: {}", "Main", e);
            return Err(e.into());
        }
    };

    // 백엔드 연결 (미설정 시 메모리 백엔드 + 데모 경매)
    let backend: Backend = if config.uses_remote_backend() {
        let backend = rest::connect(&config)?;
        info!("{:<12} --> 원격 백엔드 연결", "Main");
        backend
    } else {
        let memory = MemoryBackend::new();
        memory.seed_demo_auctions()?;
        info!("{:<12} --> 메모리 백엔드 사용", "Main");
        memory.backend()
    };

    // 인증 상태 초기화 및 세션 갱신 시작
    let auth = Arc::new(AuthContext::mount(backend.clone()).await);
    let _refresher = SessionRefresher::new(backend.clone(), config.session_refresh).start();

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let state = AppState {
        backend,
        auth,
        storage_bucket: config.storage_bucket.clone(),
    };
    let routes_all = handlers::router(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 10)); // 이미지 업로드 10MB

    // 리스너 생성
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
