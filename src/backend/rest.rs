//! 호스팅 백엔드 REST 클라이언트
//! 인증(`/auth/v1`), 테이블(`/rest/v1`), 스토리지(`/storage/v1`), RPC 호출을 담당한다.
// region:    --- Imports
use super::images::{DisabledImageHost, HostedImages};
use super::polling::PollingFeed;
use super::{
    AuthHandler, Backend, IdentityService, ImageHost, ObjectStorage, Query, RemoteProcedure,
    Table, TableStore,
};
use crate::auth::model::{AuthEvent, AuthUser, Credentials, Session};
use crate::config::Config;
use crate::error::{MarketError, MarketResult};
use crate::realtime::subscription::{Listeners, Subscription};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Rest Client

/// 공유 HTTP 클라이언트 (현재 세션의 토큰을 함께 보낸다)
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: Arc<RwLock<Option<Session>>>,
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session: Arc::new(RwLock::new(None)),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self
            .session
            .read()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.api_key.clone());
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn set_session(&self, session: Option<Session>) -> Option<Session> {
        std::mem::replace(&mut *self.session.write(), session)
    }
}

/// 응답 본문을 JSON 으로 읽고 실패 상태를 오류로 변환
async fn read_json(response: Response, auth_endpoint: bool) -> MarketResult<Value> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(&body)?);
    }

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("{} {}", status, body));

    warn!("{:<12} --> 요청 실패: {} {}", "Rest", status, message);
    Err(match status {
        StatusCode::UNAUTHORIZED => MarketError::Unauthenticated,
        StatusCode::FORBIDDEN => MarketError::PermissionDenied(message),
        StatusCode::NOT_FOUND => MarketError::NotFound(message),
        s if auth_endpoint && s.is_client_error() => MarketError::Validation(message),
        _ => MarketError::Persistence(message),
    })
}

// endregion: --- Rest Client

// region:    --- Rest Identity

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<RemoteUser>,
}

#[derive(Deserialize)]
struct RemoteUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> Option<Session> {
        let user = self.user?;
        Some(Session {
            access_token: self.access_token?,
            refresh_token: self.refresh_token?,
            expires_at: Utc::now() + Duration::seconds(self.expires_in.unwrap_or(3600)),
            user: AuthUser {
                id: user.id,
                email: user.email.unwrap_or_default(),
            },
        })
    }
}

/// 원격 인증 서비스
pub struct RestIdentity {
    client: RestClient,
    listeners: Listeners<AuthEvent>,
}

impl RestIdentity {
    pub fn new(client: RestClient) -> Self {
        Self {
            client,
            listeners: Listeners::new(),
        }
    }

    async fn token(&self, grant_type: &str, body: Value) -> MarketResult<Session> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;
        let value = read_json(response, true).await?;
        serde_json::from_value::<TokenResponse>(value)?
            .into_session()
            .ok_or_else(|| MarketError::Persistence("세션 정보가 없는 응답입니다.".to_string()))
    }
}

#[async_trait]
impl IdentityService for RestIdentity {
    async fn get_session(&self) -> MarketResult<Option<Session>> {
        let Some(session) = self.client.current_session() else {
            return Ok(None);
        };
        if !session.expires_within(Utc::now(), Duration::zero()) {
            return Ok(Some(session));
        }

        // 만료된 세션은 한 번 갱신을 시도한다
        match self.refresh_session().await {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("{:<12} --> 만료 세션 갱신 실패: {}", "Rest", e);
                if self.client.set_session(None).is_some() {
                    self.listeners.emit(&AuthEvent::SignedOut);
                }
                Ok(None)
            }
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> MarketResult<Session> {
        info!("{:<12} --> 로그인 요청: {}", "Rest", credentials.email);
        let session = self
            .token(
                "password",
                json!({"email": credentials.email, "password": credentials.password}),
            )
            .await?;
        self.client.set_session(Some(session.clone()));
        self.listeners.emit(&AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> MarketResult<Session> {
        info!("{:<12} --> 회원가입 요청: {}", "Rest", credentials.email);
        let response = self
            .client
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({"email": credentials.email, "password": credentials.password}))
            .send()
            .await?;
        let value = read_json(response, true).await?;
        let session = serde_json::from_value::<TokenResponse>(value)?
            .into_session()
            .ok_or_else(|| {
                MarketError::Validation("가입 확인 이메일을 확인해 주세요.".to_string())
            })?;
        self.client.set_session(Some(session.clone()));
        self.listeners.emit(&AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> MarketResult<()> {
        if self.client.current_session().is_some() {
            let response = self
                .client
                .request(Method::POST, "/auth/v1/logout")
                .send()
                .await;
            // 원격 로그아웃 실패와 관계없이 로컬 세션은 지운다
            if let Err(e) = response {
                warn!("{:<12} --> 로그아웃 요청 실패: {}", "Rest", e);
            }
        }
        if self.client.set_session(None).is_some() {
            self.listeners.emit(&AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn refresh_session(&self) -> MarketResult<Session> {
        let current = self
            .client
            .current_session()
            .ok_or(MarketError::Unauthenticated)?;
        debug!("{:<12} --> 토큰 갱신", "Rest");
        let session = self
            .token(
                "refresh_token",
                json!({"refresh_token": current.refresh_token}),
            )
            .await?;
        self.client.set_session(Some(session.clone()));
        self.listeners
            .emit(&AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn reset_password(&self, email: &str) -> MarketResult<()> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/recover")
            .json(&json!({"email": email}))
            .send()
            .await?;
        read_json(response, true).await?;
        Ok(())
    }

    async fn update_password(&self, new_password: &str) -> MarketResult<()> {
        let session = self
            .client
            .current_session()
            .ok_or(MarketError::Unauthenticated)?;
        let response = self
            .client
            .request(Method::PUT, "/auth/v1/user")
            .json(&json!({"password": new_password}))
            .send()
            .await?;
        read_json(response, true).await?;
        self.listeners.emit(&AuthEvent::UserUpdated(session));
        Ok(())
    }

    fn on_auth_change(&self, handler: AuthHandler) -> Subscription {
        self.listeners.register(handler)
    }
}

// endregion: --- Rest Identity

// region:    --- Rest Store

/// 원격 테이블 저장소
pub struct RestStore {
    client: RestClient,
}

impl RestStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

fn filter_params(query: &Query) -> Vec<(String, String)> {
    query.filters.iter().map(|f| f.to_param()).collect()
}

fn into_rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        Value::Null => vec![],
        row => vec![row],
    }
}

#[async_trait]
impl TableStore for RestStore {
    async fn select(&self, table: Table, query: &Query) -> MarketResult<Vec<Value>> {
        let response = self
            .client
            .request(Method::GET, &format!("/rest/v1/{}", table))
            .query(&query.to_params())
            .send()
            .await?;
        Ok(into_rows(read_json(response, false).await?))
    }

    async fn insert(&self, table: Table, row: Value) -> MarketResult<Value> {
        let response = self
            .client
            .request(Method::POST, &format!("/rest/v1/{}", table))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        into_rows(read_json(response, false).await?)
            .into_iter()
            .next()
            .ok_or_else(|| MarketError::Persistence(format!("{} 삽입 결과가 비어 있습니다.", table)))
    }

    async fn update(&self, table: Table, query: &Query, patch: Value) -> MarketResult<Vec<Value>> {
        let response = self
            .client
            .request(Method::PATCH, &format!("/rest/v1/{}", table))
            .header("Prefer", "return=representation")
            .query(&filter_params(query))
            .json(&patch)
            .send()
            .await?;
        Ok(into_rows(read_json(response, false).await?))
    }

    async fn delete(&self, table: Table, query: &Query) -> MarketResult<usize> {
        let response = self
            .client
            .request(Method::DELETE, &format!("/rest/v1/{}", table))
            .header("Prefer", "return=representation")
            .query(&filter_params(query))
            .send()
            .await?;
        Ok(into_rows(read_json(response, false).await?).len())
    }
}

// endregion: --- Rest Store

// region:    --- Rest Storage, RPC

/// 원격 오브젝트 스토리지
pub struct RestStorage {
    client: RestClient,
}

impl RestStorage {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for RestStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> MarketResult<String> {
        let response = self
            .client
            .request(Method::POST, &format!("/storage/v1/object/{}/{}", bucket, path))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        read_json(response, false).await?;
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.client.base_url(),
            bucket,
            path
        ))
    }
}

/// 원격 RPC
pub struct RestRpc {
    client: RestClient,
}

impl RestRpc {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteProcedure for RestRpc {
    async fn call(&self, name: &str, args: Value) -> MarketResult<Value> {
        let response = self
            .client
            .request(Method::POST, &format!("/rest/v1/rpc/{}", name))
            .json(&args)
            .send()
            .await?;
        read_json(response, false).await
    }
}

// endregion: --- Rest Storage, RPC

// region:    --- Connect

/// 설정으로부터 원격 백엔드 구성
pub fn connect(config: &Config) -> MarketResult<Backend> {
    let (Some(url), Some(key)) = (&config.backend_url, &config.backend_key) else {
        return Err(MarketError::Config(
            "원격 백엔드 주소와 키가 필요합니다.".to_string(),
        ));
    };
    info!("{:<12} --> 원격 백엔드 연결: {}", "Rest", url);

    let client = RestClient::new(url, key);
    let store: Arc<dyn TableStore> = Arc::new(RestStore::new(client.clone()));
    let images: Arc<dyn ImageHost> = match (&config.image_host_url, &config.image_host_key) {
        (Some(url), Some(key)) => Arc::new(HostedImages::new(url, key)),
        _ => Arc::new(DisabledImageHost),
    };

    Ok(Backend {
        identity: Arc::new(RestIdentity::new(client.clone())),
        feed: Arc::new(PollingFeed::new(Arc::clone(&store), config.poll_interval)),
        store,
        storage: Arc::new(RestStorage::new(client.clone())),
        rpc: Arc::new(RestRpc::new(client)),
        images,
    })
}

// endregion: --- Connect

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_without_session_fields() {
        let pending: TokenResponse = serde_json::from_value(json!({
            "user": {"id": Uuid::new_v4(), "email": "a@b.c"}
        }))
        .unwrap();
        assert!(pending.into_session().is_none());

        let full: TokenResponse = serde_json::from_value(json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 60,
            "user": {"id": Uuid::new_v4(), "email": "a@b.c"}
        }))
        .unwrap();
        let session = full.into_session().unwrap();
        assert_eq!(session.user.email, "a@b.c");
        assert!(session.expires_within(Utc::now(), Duration::seconds(61)));
    }

    #[test]
    fn test_into_rows_normalises_shapes() {
        assert_eq!(into_rows(Value::Null).len(), 0);
        assert_eq!(into_rows(json!({"id": 1})).len(), 1);
        assert_eq!(into_rows(json!([{"id": 1}, {"id": 2}])).len(), 2);
    }

    #[test]
    fn test_connect_requires_remote_settings() {
        let err = connect(&Config::default()).err();
        assert!(matches!(err, Some(MarketError::Config(_))));
    }
}
