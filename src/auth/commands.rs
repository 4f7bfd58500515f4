//! 인증 관련 커맨드 처리
//! 로그인, 회원가입, 로그아웃, 비밀번호 재설정/변경
// region:    --- Imports
use super::model::{AuthUser, Credentials, Session, SignUpRequest};
use crate::backend::Backend;
use crate::error::{MarketError, MarketResult};
use crate::profile;
use tracing::{info, warn};

// endregion: --- Imports

const MIN_PASSWORD_LENGTH: usize = 6;

// region:    --- Validation

fn validate_email(email: &str) -> MarketResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(MarketError::Validation("올바른 이메일 주소를 입력해 주세요.".to_string()))
    }
}

fn validate_password(password: &str) -> MarketResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(MarketError::Validation(format!(
            "비밀번호는 {}자 이상이어야 합니다.",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// endregion: --- Validation

// region:    --- Commands

/// 현재 로그인 사용자 (없으면 Unauthenticated)
pub async fn current_user(backend: &Backend) -> MarketResult<AuthUser> {
    backend
        .identity
        .get_session()
        .await?
        .map(|session| session.user)
        .ok_or(MarketError::Unauthenticated)
}

/// 로그인
pub async fn sign_in(backend: &Backend, credentials: &Credentials) -> MarketResult<Session> {
    info!("{:<12} --> 로그인 요청: {}", "Auth", credentials.email);
    validate_email(&credentials.email)?;
    if credentials.password.is_empty() {
        return Err(MarketError::Validation("비밀번호를 입력해 주세요.".to_string()));
    }
    backend.identity.sign_in(credentials).await
}

/// 회원가입 (프로필 행도 함께 생성)
pub async fn sign_up(backend: &Backend, request: &SignUpRequest) -> MarketResult<Session> {
    info!("{:<12} --> 회원가입 요청: {}", "Auth", request.email);
    validate_email(&request.email)?;
    validate_password(&request.password)?;

    let session = backend.identity.sign_up(&request.credentials()).await?;
    profile::create_profile(backend, &session.user, request.full_name.clone()).await?;
    Ok(session)
}

/// 로그아웃
pub async fn sign_out(backend: &Backend) -> MarketResult<()> {
    info!("{:<12} --> 로그아웃", "Auth");
    backend.identity.sign_out().await
}

/// 비밀번호 재설정 메일 요청
pub async fn reset_password(backend: &Backend, email: &str) -> MarketResult<()> {
    validate_email(email)?;
    backend.identity.reset_password(email.trim()).await.map_err(|e| {
        warn!("{:<12} --> 비밀번호 재설정 요청 실패: {}", "Auth", e);
        e
    })
}

/// 비밀번호 변경
pub async fn update_password(backend: &Backend, new_password: &str) -> MarketResult<()> {
    validate_password(new_password)?;
    current_user(backend).await?;
    backend.identity.update_password(new_password).await
}

// endregion: --- Commands

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::Table;

    fn request(email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: Some("박지민".to_string()),
        }
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        let session = sign_up(&backend, &request("park@example.com", "hunter22"))
            .await
            .unwrap();

        let profiles = memory.store.rows(Table::Profiles);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["id"], serde_json::json!(session.user.id));
        assert_eq!(profiles[0]["full_name"], "박지민");
        assert_eq!(current_user(&backend).await.unwrap(), session.user);
    }

    #[tokio::test]
    async fn test_sign_up_rejects_bad_input() {
        let backend = MemoryBackend::new().backend();
        let err = sign_up(&backend, &request("not-an-email", "hunter22"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));

        let err = sign_up(&backend, &request("a@b.co", "123"))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));
    }

    #[tokio::test]
    async fn test_current_user_without_session() {
        let backend = MemoryBackend::new().backend();
        assert_eq!(
            current_user(&backend).await.unwrap_err(),
            MarketError::Unauthenticated
        );
    }

    #[tokio::test]
    async fn test_sign_in_after_sign_out() {
        let backend = MemoryBackend::new().backend();
        sign_up(&backend, &request("choi@example.com", "hunter22"))
            .await
            .unwrap();
        sign_out(&backend).await.unwrap();
        assert!(current_user(&backend).await.is_err());

        let wrong = Credentials {
            email: "choi@example.com".to_string(),
            password: "wrong-pass".to_string(),
        };
        assert!(sign_in(&backend, &wrong).await.is_err());

        let right = Credentials {
            email: "CHOI@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        sign_in(&backend, &right).await.unwrap();
        assert!(current_user(&backend).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_password_requires_session() {
        let backend = MemoryBackend::new().backend();
        assert_eq!(
            update_password(&backend, "longenough").await.unwrap_err(),
            MarketError::Unauthenticated
        );
    }
}
