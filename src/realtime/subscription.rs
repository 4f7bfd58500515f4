// region:    --- Imports
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// endregion: --- Imports

// region:    --- Subscription

type Release = Box<dyn FnOnce() + Send>;

/// 구독 핸들
/// `unsubscribe`는 여러 번 호출해도 안전하며, 해제 동작은 정확히 한 번만 실행된다.
/// 핸들이 drop 되면 자동으로 해제된다.
pub struct Subscription {
    release: Mutex<Option<Release>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// 아무것도 해제하지 않는 구독
    pub fn noop() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    /// 구독 해제
    pub fn unsubscribe(&self) {
        let release = self.release.lock().take();
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// endregion: --- Subscription

// region:    --- Listeners

pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// 핸들러 레지스트리
/// 변경 피드(메모리 구현)와 인증 상태 알림이 함께 사용한다.
pub struct Listeners<E> {
    next_id: AtomicU64,
    handlers: Arc<Mutex<HashMap<u64, Handler<E>>>>,
}

impl<E: 'static> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 핸들러 등록
    pub fn register(&self, handler: Handler<E>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().insert(id, handler);

        let handlers = Arc::clone(&self.handlers);
        Subscription::new(move || {
            handlers.lock().remove(&id);
        })
    }

    /// 등록된 모든 핸들러 호출
    pub fn emit(&self, event: &E) {
        // 핸들러 안에서 등록/해제가 일어날 수 있으므로 락을 잡은 채로 호출하지 않는다
        let handlers: Vec<Handler<E>> = self.handlers.lock().values().cloned().collect();
        for handler in handlers {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

// endregion: --- Listeners
