//! 메모리 백엔드
//! 테스트와 오프라인 실행에 사용한다. 모든 호출은 한 번 양보(yield)하여
//! 원격 호출의 대기 지점을 흉내낸다.
// region:    --- Imports
use super::{
    AuthHandler, Backend, ChangeEvent, ChangeFeed, ChangeHandler, ChangeKind, ChannelSpec,
    IdentityService, ImageHost, ObjectStorage, Query, RemoteProcedure, Table, TableStore,
};
use crate::auction::model::{Auction, AuctionStatus, SellerInfo};
use crate::auth::model::{AuthEvent, AuthUser, Credentials, Session};
use crate::error::{MarketError, MarketResult};
use crate::realtime::subscription::{Listeners, Subscription};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Memory Identity

struct StoredUser {
    user: AuthUser,
    password: String,
}

/// 메모리 인증 서비스
#[derive(Default)]
pub struct MemoryIdentity {
    users: Mutex<HashMap<String, StoredUser>>,
    session: Mutex<Option<Session>>,
    password_resets: Mutex<Vec<String>>,
    listeners: Listeners<AuthEvent>,
}

impl MemoryIdentity {
    fn issue_session(user: AuthUser) -> Session {
        Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user,
        }
    }

    fn current(&self) -> MarketResult<Session> {
        self.session
            .lock()
            .clone()
            .ok_or(MarketError::Unauthenticated)
    }

    /// 세션 만료 시간 변경 (갱신 테스트용)
    pub fn set_session_expiry(&self, expires_at: DateTime<Utc>) {
        if let Some(session) = self.session.lock().as_mut() {
            session.expires_at = expires_at;
        }
    }

    /// 비밀번호 재설정 요청 목록
    pub fn password_resets(&self) -> Vec<String> {
        self.password_resets.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    async fn get_session(&self) -> MarketResult<Option<Session>> {
        tokio::task::yield_now().await;
        Ok(self.session.lock().clone())
    }

    async fn sign_in(&self, credentials: &Credentials) -> MarketResult<Session> {
        tokio::task::yield_now().await;
        let user = {
            let users = self.users.lock();
            match users.get(&credentials.email.to_lowercase()) {
                Some(stored) if stored.password == credentials.password => stored.user.clone(),
                _ => {
                    return Err(MarketError::Validation(
                        "이메일 또는 비밀번호가 올바르지 않습니다.".to_string(),
                    ))
                }
            }
        };

        let session = Self::issue_session(user);
        *self.session.lock() = Some(session.clone());
        debug!("{:<12} --> 로그인: {}", "Memory", session.user.email);
        self.listeners.emit(&AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> MarketResult<Session> {
        tokio::task::yield_now().await;
        let key = credentials.email.to_lowercase();
        let user = {
            let mut users = self.users.lock();
            if users.contains_key(&key) {
                return Err(MarketError::Validation("이미 가입된 이메일입니다.".to_string()));
            }
            let user = AuthUser {
                id: Uuid::new_v4(),
                email: credentials.email.clone(),
            };
            users.insert(
                key,
                StoredUser {
                    user: user.clone(),
                    password: credentials.password.clone(),
                },
            );
            user
        };

        let session = Self::issue_session(user);
        *self.session.lock() = Some(session.clone());
        self.listeners.emit(&AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> MarketResult<()> {
        tokio::task::yield_now().await;
        let previous = self.session.lock().take();
        if previous.is_some() {
            self.listeners.emit(&AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn refresh_session(&self) -> MarketResult<Session> {
        tokio::task::yield_now().await;
        let current = self.current()?;
        let session = Self::issue_session(current.user);
        *self.session.lock() = Some(session.clone());
        self.listeners
            .emit(&AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn reset_password(&self, email: &str) -> MarketResult<()> {
        tokio::task::yield_now().await;
        self.password_resets.lock().push(email.to_string());
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> MarketResult<()> {
        tokio::task::yield_now().await;
        let session = self.current()?;
        if let Some(stored) = self
            .users
            .lock()
            .get_mut(&session.user.email.to_lowercase())
        {
            stored.password = new_password.to_string();
        }
        self.listeners.emit(&AuthEvent::UserUpdated(session));
        Ok(())
    }

    fn on_auth_change(&self, handler: AuthHandler) -> Subscription {
        self.listeners.register(handler)
    }
}

// endregion: --- Memory Identity

// region:    --- Memory Feed

/// 메모리 변경 피드
#[derive(Default)]
pub struct MemoryFeed {
    listeners: Listeners<ChangeEvent>,
}

impl MemoryFeed {
    pub fn publish(&self, event: ChangeEvent) {
        self.listeners.emit(&event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ChangeFeed for MemoryFeed {
    fn subscribe(&self, channel: ChannelSpec, handler: ChangeHandler) -> Subscription {
        debug!("{:<12} --> 채널 구독: {:?}", "Memory", channel);
        self.listeners.register(Arc::new(move |event: &ChangeEvent| {
            if event.matches(&channel) {
                handler(event);
            }
        }))
    }
}

// endregion: --- Memory Feed

// region:    --- Memory Store

/// 메모리 테이블 저장소
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    feed: Arc<MemoryFeed>,
    write_failure: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new(feed: Arc<MemoryFeed>) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            feed,
            write_failure: Mutex::new(None),
        }
    }

    /// 이후 모든 쓰기 실패 (None 이면 해제)
    pub fn fail_writes(&self, message: Option<&str>) {
        *self.write_failure.lock() = message.map(str::to_string);
    }

    /// 테이블 전체 행
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .lock()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// 알림 없이 행 추가
    pub fn seed(&self, table: Table, row: Value) {
        self.tables.lock().entry(table).or_default().push(row);
    }

    fn check_writable(&self) -> MarketResult<()> {
        match self.write_failure.lock().as_ref() {
            Some(message) => Err(MarketError::Persistence(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn select(&self, table: Table, query: &Query) -> MarketResult<Vec<Value>> {
        tokio::task::yield_now().await;
        Ok(query.apply(self.rows(table)))
    }

    async fn insert(&self, table: Table, mut row: Value) -> MarketResult<Value> {
        tokio::task::yield_now().await;
        self.check_writable()?;

        let object = row
            .as_object_mut()
            .ok_or_else(|| MarketError::Persistence("행은 JSON 객체여야 합니다.".to_string()))?;
        if object.get("id").map_or(true, Value::is_null) {
            object.insert("id".to_string(), json!(Uuid::new_v4()));
        }
        if object.get("created_at").map_or(true, Value::is_null) {
            object.insert("created_at".to_string(), json!(Utc::now()));
        }

        self.tables
            .lock()
            .entry(table)
            .or_default()
            .push(row.clone());
        debug!("{:<12} --> insert {}: {}", "Memory", table, row["id"]);

        self.feed.publish(ChangeEvent {
            table,
            kind: ChangeKind::Insert,
            new: Some(row.clone()),
            old: None,
        });
        Ok(row)
    }

    async fn update(&self, table: Table, query: &Query, patch: Value) -> MarketResult<Vec<Value>> {
        tokio::task::yield_now().await;
        self.check_writable()?;

        let Some(patch) = patch.as_object() else {
            return Err(MarketError::Persistence(
                "변경 내용은 JSON 객체여야 합니다.".to_string(),
            ));
        };

        let mut changes = Vec::new();
        {
            let mut tables = self.tables.lock();
            let rows = tables.entry(table).or_default();
            for row in rows.iter_mut().filter(|r| query.matches(r)) {
                let old = row.clone();
                if let Some(object) = row.as_object_mut() {
                    for (key, value) in patch {
                        object.insert(key.clone(), value.clone());
                    }
                }
                changes.push((old, row.clone()));
            }
        }

        let updated = changes.iter().map(|(_, new)| new.clone()).collect();
        for (old, new) in changes {
            self.feed.publish(ChangeEvent {
                table,
                kind: ChangeKind::Update,
                new: Some(new),
                old: Some(old),
            });
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, query: &Query) -> MarketResult<usize> {
        tokio::task::yield_now().await;
        self.check_writable()?;

        let removed: Vec<Value> = {
            let mut tables = self.tables.lock();
            let rows = tables.entry(table).or_default();
            let (removed, kept): (Vec<Value>, Vec<Value>) =
                rows.drain(..).partition(|r| query.matches(r));
            *rows = kept;
            removed
        };

        let count = removed.len();
        for old in removed {
            self.feed.publish(ChangeEvent {
                table,
                kind: ChangeKind::Delete,
                new: None,
                old: Some(old),
            });
        }
        Ok(count)
    }
}

// endregion: --- Memory Store

// region:    --- Memory Storage, RPC, Images

/// 메모리 오브젝트 스토리지
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStorage {
    pub fn object(&self, bucket: &str, path: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().get(&format!("{}/{}", bucket, path)).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> MarketResult<String> {
        tokio::task::yield_now().await;
        let key = format!("{}/{}", bucket, path);
        self.objects
            .lock()
            .insert(key.clone(), (bytes, content_type.to_string()));
        Ok(format!("memory://storage/{}", key))
    }
}

/// 메모리 RPC (호출 기록, 실패 주입)
#[derive(Default)]
pub struct MemoryRpc {
    calls: Mutex<Vec<(String, Value)>>,
    failure: Mutex<Option<String>>,
}

impl MemoryRpc {
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn fail_calls(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }
}

#[async_trait]
impl RemoteProcedure for MemoryRpc {
    async fn call(&self, name: &str, args: Value) -> MarketResult<Value> {
        tokio::task::yield_now().await;
        if let Some(message) = self.failure.lock().clone() {
            return Err(MarketError::Persistence(message));
        }
        self.calls.lock().push((name.to_string(), args));
        Ok(Value::Null)
    }
}

/// 메모리 이미지 호스팅
#[derive(Default)]
pub struct MemoryImageHost {
    uploads: Mutex<Vec<String>>,
}

impl MemoryImageHost {
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl ImageHost for MemoryImageHost {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> MarketResult<String> {
        tokio::task::yield_now().await;
        if bytes.is_empty() {
            return Err(MarketError::Network("빈 이미지는 업로드할 수 없습니다.".to_string()));
        }
        let url = format!("memory://images/{}/{}", Uuid::new_v4(), file_name);
        self.uploads.lock().push(url.clone());
        Ok(url)
    }
}

// endregion: --- Memory Storage, RPC, Images

// region:    --- Memory Backend

/// 메모리 백엔드 묶음
pub struct MemoryBackend {
    pub identity: Arc<MemoryIdentity>,
    pub store: Arc<MemoryStore>,
    pub feed: Arc<MemoryFeed>,
    pub storage: Arc<MemoryStorage>,
    pub rpc: Arc<MemoryRpc>,
    pub images: Arc<MemoryImageHost>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let feed = Arc::new(MemoryFeed::default());
        Self {
            identity: Arc::new(MemoryIdentity::default()),
            store: Arc::new(MemoryStore::new(Arc::clone(&feed))),
            feed,
            storage: Arc::new(MemoryStorage::default()),
            rpc: Arc::new(MemoryRpc::default()),
            images: Arc::new(MemoryImageHost::default()),
        }
    }

    /// 트레잇 핸들 묶음으로 변환
    pub fn backend(&self) -> Backend {
        Backend {
            identity: self.identity.clone(),
            store: self.store.clone(),
            feed: self.feed.clone(),
            storage: self.storage.clone(),
            rpc: self.rpc.clone(),
            images: self.images.clone(),
        }
    }

    /// 경매 추가
    pub fn seed_auction(&self, auction: &Auction) -> MarketResult<()> {
        self.store
            .seed(Table::Auctions, serde_json::to_value(auction)?);
        Ok(())
    }

    /// 오프라인 실행용 데모 경매
    pub fn seed_demo_auctions(&self) -> MarketResult<Vec<Auction>> {
        let now = Utc::now();
        let demo = [
            ("빈티지 라이카 카메라", "카메라", 12500.0, 250.0, 36),
            ("로드 자전거 (카본)", "스포츠", 1800.0, 50.0, 12),
            ("1960년대 손목시계", "시계", 4200.0, 100.0, 72),
        ];

        let mut auctions = Vec::with_capacity(demo.len());
        for (title, category, current_bid, min_increment, hours) in demo {
            let auction = Auction {
                id: Uuid::new_v4(),
                title: title.to_string(),
                description: format!("{} 경매 상품입니다.", title),
                category: category.to_string(),
                condition: "used".to_string(),
                starting_bid: current_bid / 2.0,
                current_bid,
                min_increment,
                end_time: now + Duration::hours(hours),
                status: AuctionStatus::Active,
                images: vec![],
                seller: SellerInfo {
                    name: "데모 판매자".to_string(),
                    rating: 4.8,
                    join_date: Some(now - Duration::days(400)),
                    sales: 27,
                },
                views: 0,
                watchers: 0,
                created_at: now,
            };
            self.seed_auction(&auction)?;
            auctions.push(auction);
        }
        info!(
            "{:<12} --> 데모 경매 {}건 등록",
            "Memory",
            auctions.len()
        );
        Ok(auctions)
    }
}

// endregion: --- Memory Backend
