//! 호스팅 백엔드(인증, 테이블, 변경 피드, 스토리지, RPC) 경계
//! 애플리케이션 코드는 이 트레잇들만 사용하고, 구현은
//! `rest`(원격), `memory`(테스트/오프라인) 두 가지가 있다.
// region:    --- Imports
use crate::auth::model::{AuthEvent, Credentials, Session};
use crate::error::{MarketError, MarketResult};
use crate::realtime::subscription::{Handler, Subscription};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- Modules
pub mod images;
pub mod memory;
pub mod polling;
pub mod query;
pub mod rest;

pub use query::{Filter, Query, SortDirection};

// endregion: --- Modules

// region:    --- Tables

/// 백엔드 테이블
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Auctions,
    Bids,
    Products,
    Profiles,
    Watchlist,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Auctions => "auctions",
            Table::Bids => "bids",
            Table::Products => "products",
            Table::Profiles => "profiles",
            Table::Watchlist => "watchlist",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// endregion: --- Tables

// region:    --- Change Events

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// 변경 피드 이벤트
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub new: Option<Value>,
    pub old: Option<Value>,
}

impl ChangeEvent {
    /// 삭제 이벤트는 이전 행, 나머지는 새 행 기준으로 조건 확인
    pub fn matches(&self, channel: &ChannelSpec) -> bool {
        if self.table != channel.table {
            return false;
        }
        let row = match self.kind {
            ChangeKind::Delete => self.old.as_ref(),
            _ => self.new.as_ref(),
        };
        match (&channel.filter, row) {
            (None, _) => true,
            (Some(filter), Some(row)) => filter.matches(row),
            (Some(_), None) => false,
        }
    }
}

/// 구독 채널 (테이블 + 선택적 컬럼 조건)
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
    pub table: Table,
    pub filter: Option<Filter>,
}

impl ChannelSpec {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            filter: None,
        }
    }

    pub fn filtered(table: Table, filter: Filter) -> Self {
        Self {
            table,
            filter: Some(filter),
        }
    }

    /// 채널 대상 행을 조회하는 쿼리
    pub fn query(&self) -> Query {
        let mut query = Query::new();
        if let Some(filter) = &self.filter {
            query.filters.push(filter.clone());
        }
        query
    }
}

// endregion: --- Change Events

// region:    --- Backend Traits

pub type AuthHandler = Handler<AuthEvent>;
pub type ChangeHandler = Handler<ChangeEvent>;

/// 인증/세션 서비스
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn get_session(&self) -> MarketResult<Option<Session>>;
    async fn sign_in(&self, credentials: &Credentials) -> MarketResult<Session>;
    async fn sign_up(&self, credentials: &Credentials) -> MarketResult<Session>;
    async fn sign_out(&self) -> MarketResult<()>;
    async fn refresh_session(&self) -> MarketResult<Session>;
    async fn reset_password(&self, email: &str) -> MarketResult<()>;
    async fn update_password(&self, new_password: &str) -> MarketResult<()>;
    /// 인증 상태 변경 알림 구독
    fn on_auth_change(&self, handler: AuthHandler) -> Subscription;
}

/// 관계형 테이블 저장소
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, table: Table, query: &Query) -> MarketResult<Vec<Value>>;
    /// 삽입된 행(서버 부여 id, 시간 포함) 반환
    async fn insert(&self, table: Table, row: Value) -> MarketResult<Value>;
    /// 변경된 행 목록 반환
    async fn update(&self, table: Table, query: &Query, patch: Value) -> MarketResult<Vec<Value>>;
    /// 삭제된 행 수 반환
    async fn delete(&self, table: Table, query: &Query) -> MarketResult<usize>;
}

/// 테이블 변경 피드
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, channel: ChannelSpec, handler: ChangeHandler) -> Subscription;
}

/// 오브젝트 스토리지
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 업로드 후 공개 URL 반환
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> MarketResult<String>;
}

/// 원격 프로시저 호출
#[async_trait]
pub trait RemoteProcedure: Send + Sync {
    async fn call(&self, name: &str, args: Value) -> MarketResult<Value>;
}

/// 외부 이미지 호스팅
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> MarketResult<String>;
}

// endregion: --- Backend Traits

// region:    --- Backend

/// 백엔드 핸들 묶음
#[derive(Clone)]
pub struct Backend {
    pub identity: Arc<dyn IdentityService>,
    pub store: Arc<dyn TableStore>,
    pub feed: Arc<dyn ChangeFeed>,
    pub storage: Arc<dyn ObjectStorage>,
    pub rpc: Arc<dyn RemoteProcedure>,
    pub images: Arc<dyn ImageHost>,
}

/// 조회 결과 행을 모델로 변환
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> MarketResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(MarketError::from))
        .collect()
}

pub fn decode_row<T: DeserializeOwned>(row: Value) -> MarketResult<T> {
    Ok(serde_json::from_value(row)?)
}

// endregion: --- Backend
