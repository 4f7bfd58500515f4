//! 인증 상태 저장소
//! 세션과 프로필을 한 곳에서 관리하고, 읽는 쪽은 스냅샷(`state`)이나
//! 변경 알림(`subscribe`)으로 접근한다.
// region:    --- Imports
use super::model::{AuthEvent, AuthUser, Session};
use crate::activity::best_effort;
use crate::backend::Backend;
use crate::error::MarketResult;
use crate::profile::find_profile;
use crate::profile::model::UserProfile;
use crate::realtime::Subscription;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- Auth State

/// 인증 상태 스냅샷
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub loading: bool,
    pub session: Option<Session>,
    pub profile: Option<UserProfile>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }
}

// endregion: --- Auth State

// region:    --- Auth Context

type StateTx = Arc<watch::Sender<AuthState>>;

/// 인증 컨텍스트
pub struct AuthContext {
    backend: Backend,
    state: StateTx,
    listener: Mutex<Option<Subscription>>,
}

impl AuthContext {
    /// 생성 직후에는 loading 상태이며 인증 변경 리스너가 등록된다.
    pub fn new(backend: Backend) -> Self {
        let (tx, _rx) = watch::channel(AuthState {
            loading: true,
            ..Default::default()
        });
        let state: StateTx = Arc::new(tx);

        let handler_backend = backend.clone();
        let handler_state = Arc::clone(&state);
        let listener = backend
            .identity
            .on_auth_change(Arc::new(move |event: &AuthEvent| {
                Self::apply_event(&handler_backend, &handler_state, event);
            }));

        Self {
            backend,
            state,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// 생성 후 기존 세션까지 반영
    pub async fn mount(backend: Backend) -> Self {
        let context = Self::new(backend);
        context.initialize().await;
        context
    }

    /// 기존 세션과 프로필 조회 후 loading 해제
    pub async fn initialize(&self) {
        let session = best_effort("세션 조회", self.backend.identity.get_session())
            .await
            .flatten();
        let profile = match &session {
            Some(session) => best_effort("프로필 조회", find_profile(&self.backend, session.user.id))
                .await
                .flatten(),
            None => None,
        };

        info!(
            "{:<12} --> 인증 상태 초기화 (로그인: {})",
            "AuthContext",
            session.is_some()
        );
        self.state.send_modify(|state| {
            state.loading = false;
            state.session = session;
            state.profile = profile;
        });
    }

    /// 현재 상태 스냅샷
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// 상태 변경 알림 수신기
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// 로그인 사용자의 프로필 다시 조회
    pub async fn refresh_profile(&self) -> MarketResult<Option<UserProfile>> {
        let Some(user) = self.state().user().cloned() else {
            return Ok(None);
        };
        let profile = find_profile(&self.backend, user.id).await?;
        Self::store_profile(&self.state, &user, profile.clone());
        Ok(profile)
    }

    /// 리스너 해제 (여러 번 호출해도 안전)
    pub fn unmount(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.unsubscribe();
            debug!("{:<12} --> 인증 리스너 해제", "AuthContext");
        }
    }

    fn apply_event(backend: &Backend, state: &StateTx, event: &AuthEvent) {
        let session = match event {
            AuthEvent::SignedOut => {
                info!("{:<12} --> 로그아웃 반영", "AuthContext");
                state.send_modify(|s| {
                    s.session = None;
                    s.profile = None;
                });
                return;
            }
            AuthEvent::SignedIn(session)
            | AuthEvent::TokenRefreshed(session)
            | AuthEvent::UserUpdated(session) => session.clone(),
        };

        let user = session.user.clone();
        state.send_modify(|s| {
            if s.user() != Some(&user) {
                s.profile = None;
            }
            s.session = Some(session);
        });

        // 프로필은 비동기로 다시 조회
        let Ok(handle) = Handle::try_current() else {
            warn!("{:<12} --> 런타임 없음, 프로필 조회 생략", "AuthContext");
            return;
        };
        let backend = backend.clone();
        let state = Arc::clone(state);
        // 프로필 행이 아직 없으면 기존 값을 유지한다
        handle.spawn(async move {
            if let Some(Some(profile)) =
                best_effort("프로필 조회", find_profile(&backend, user.id)).await
            {
                Self::store_profile(&state, &user, Some(profile));
            }
        });
    }

    /// 같은 사용자가 여전히 로그인 중일 때만 반영
    fn store_profile(state: &StateTx, user: &AuthUser, profile: Option<UserProfile>) {
        state.send_if_modified(|s| {
            if s.user().map(|u| u.id) != Some(user.id) {
                return false;
            }
            s.profile = profile;
            true
        });
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.unmount();
    }
}

// endregion: --- Auth Context
