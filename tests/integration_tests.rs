use auction_market::auction::model::Auction;
use auction_market::auth::context::AuthContext;
use auction_market::backend::memory::MemoryBackend;
use auction_market::backend::Table;
use auction_market::handlers::{router, AppState};
use reqwest::{Client, StatusCode};
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// 트레이싱 초기화 (여러 테스트에서 호출해도 안전)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// 테스트 서버 실행
struct TestApp {
    base_url: String,
    client: Client,
    memory: MemoryBackend,
    auctions: Vec<Auction>,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request");
        read(response).await
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request");
        read(response).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn sign_up(&self, email: &str, name: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/auth/signup",
                json!({ "email": email, "password": "password1", "full_name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }
}

async fn read(response: reqwest::Response) -> (StatusCode, Value) {
    let status = response.status();
    let text = response.text().await.expect("Failed to read body");
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).expect("응답이 JSON 이 아닙니다")
    };
    (status, body)
}

async fn spawn_app() -> TestApp {
    spawn_app_with(true).await
}

/// `mounted == false` 이면 인증 상태가 loading 으로 남는다
async fn spawn_app_with(mounted: bool) -> TestApp {
    init_tracing();
    let memory = MemoryBackend::new();
    let auctions = memory.seed_demo_auctions().unwrap();
    let backend = memory.backend();
    let auth = if mounted {
        AuthContext::mount(backend.clone()).await
    } else {
        AuthContext::new(backend.clone())
    };
    let auth = Arc::new(auth);
    let app = router(AppState {
        backend,
        auth,
        storage_bucket: "avatars".to_string(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    info!("{:<12} --> 테스트 서버: {}", "Test", addr);

    TestApp {
        base_url: format!("http://{}", addr),
        client: Client::new(),
        memory,
        auctions,
    }
}

/// 홈 화면과 경매 목록
#[tokio::test]
async fn test_home_and_listing() {
    let app = spawn_app().await;

    let (status, home) = app.get("/api/home").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(home["featured"].as_array().unwrap().len(), 3);
    assert_eq!(home["categories"].as_array().unwrap().len(), 3);

    let (status, list) = app.get("/api/auctions?sort=price_high").await;
    assert_eq!(status, StatusCode::OK);
    let first = &list[0];
    assert_eq!(first["current_bid"], 12500.0);
    assert_eq!(first["price_display"], "$12,500.00 (₹1,062,500.00)");
    assert_eq!(first["next_minimum_bid"], 12750.0);

    let (status, error) = app
        .get(&format!("/api/auctions/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");
}

/// 보호 화면 접근 제어
#[tokio::test]
async fn test_protected_pages_follow_session() {
    let app = spawn_app().await;

    let (_, page) = app.get("/api/pages?path=/profile").await;
    assert_eq!(page["access"], "redirect_to_login");
    assert_eq!(page["redirect"], "/login");

    let (status, _) = app.get("/api/profile").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, page) = app.get("/api/pages?path=/about").await;
    assert_eq!(page["access"], "granted");

    let session = app.sign_up("jiwoo@example.com", "지우").await;
    assert_eq!(session["authenticated"], true);
    assert_eq!(session["profile"]["full_name"], "지우");

    let (_, page) = app.get("/api/pages?path=/profile").await;
    assert_eq!(page["access"], "granted");

    let (status, profile) = app.get("/api/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "jiwoo@example.com");

    let (status, _) = app.post("/api/auth/signout", Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, session) = app.get("/api/session").await;
    assert_eq!(session["authenticated"], false);
}

/// 입찰 흐름
#[tokio::test]
async fn test_place_bid() {
    let app = spawn_app().await;
    let camera = app
        .auctions
        .iter()
        .find(|a| a.current_bid == 12500.0)
        .unwrap()
        .clone();
    let bids_path = format!("/api/auctions/{}/bids", camera.id);

    // 로그인 전 입찰
    let (status, error) = app.post(&bids_path, json!({ "amount": 13000.0 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error["code"], "UNAUTHENTICATED");

    app.sign_up("bidder@example.com", "입찰왕").await;

    // 최소 증가폭 미달
    let (status, error) = app.post(&bids_path, json!({ "amount": 12600.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "BID_TOO_LOW");
    assert_eq!(error["minimum"], 12750.0);
    assert!(app.memory.store.rows(Table::Bids).is_empty());

    let (status, bid) = app.post(&bids_path, json!({ "amount": 12750.0 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bid["bidder_name"], "입찰왕");

    let (_, detail) = app.get(&format!("/api/auctions/{}", camera.id)).await;
    assert_eq!(detail["auction"]["current_bid"], 12750.0);
    assert_eq!(detail["auction"]["next_minimum_bid"], 13000.0);
    assert_eq!(detail["bids"].as_array().unwrap().len(), 1);

    let (_, mine) = app.get("/api/profile/bids").await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let calls = app.memory.rpc.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "log_activity");
}

/// 상품 소유자 확인
#[tokio::test]
async fn test_product_ownership() {
    let app = spawn_app().await;

    app.sign_up("owner@example.com", "주인").await;
    let (status, product) = app
        .post("/api/products", json!({ "title": "캠핑 의자", "price": 45.0 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_path = format!("/api/products/{}", product["id"].as_str().unwrap());

    app.sign_up("intruder@example.com", "손님").await;
    let (status, error) = app
        .send(reqwest::Method::PUT, &product_path, json!({ "price": 1.0 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["code"], "PERMISSION_DENIED");

    let (status, _) = app
        .send(reqwest::Method::DELETE, &product_path, Value::Null)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, stored) = app.get(&product_path).await;
    assert_eq!(stored["price"], 45.0);

    let (_, mine) = app.get("/api/products/mine").await;
    assert!(mine.as_array().unwrap().is_empty());

    let (_, all) = app.get("/api/products?min_price=10&max_price=50").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

/// 인증 상태 로딩 중 상품 요청
#[tokio::test]
async fn test_product_requests_wait_for_session() {
    let app = spawn_app_with(false).await;
    app.sign_up("early@example.com", "성급").await;

    let (_, session) = app.get("/api/session").await;
    assert_eq!(session["loading"], true);

    let (status, error) = app
        .post("/api/products", json!({ "title": "캠핑 의자", "price": 45.0 }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["code"], "SESSION_PENDING");

    let (status, error) = app.get("/api/products/mine").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["code"], "SESSION_PENDING");

    let product_path = format!("/api/products/{}", uuid::Uuid::new_v4());
    let (status, _) = app
        .send(reqwest::Method::PUT, &product_path, json!({ "price": 1.0 }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = app
        .send(reqwest::Method::DELETE, &product_path, Value::Null)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .client
        .post(app.url("/api/products/image?file_name=chair.png"))
        .body(vec![1u8, 2, 3])
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    assert!(app.memory.store.rows(Table::Products).is_empty());
}

/// 관심 목록
#[tokio::test]
async fn test_saved_auctions() {
    let app = spawn_app().await;
    let target = app.auctions[0].id;

    let (status, _) = app.get("/api/saved").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.sign_up("saver@example.com", "저장").await;
    for _ in 0..2 {
        let (status, _) = app.post("/api/saved", json!({ "auction_id": target })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, saved) = app.get("/api/saved").await;
    assert_eq!(saved.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            reqwest::Method::DELETE,
            &format!("/api/saved/{}", target),
            Value::Null,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, saved) = app.get("/api/saved").await;
    assert!(saved.as_array().unwrap().is_empty());
}
