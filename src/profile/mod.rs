//! 사용자 프로필 조회/수정
// region:    --- Imports
use crate::auth::commands::current_user;
use crate::auth::model::AuthUser;
use crate::backend::{decode_row, decode_rows, Backend, Query, Table};
use crate::error::{MarketError, MarketResult};
use model::{ProfileUpdate, Role, UserProfile};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

pub mod model;

// region:    --- Queries

/// 프로필 조회 (없으면 None)
pub async fn find_profile(backend: &Backend, user_id: Uuid) -> MarketResult<Option<UserProfile>> {
    let rows = backend
        .store
        .select(Table::Profiles, &Query::new().eq("id", user_id))
        .await?;
    Ok(decode_rows::<UserProfile>(rows)?.into_iter().next())
}

/// 프로필 조회
pub async fn get_profile(backend: &Backend, user_id: Uuid) -> MarketResult<UserProfile> {
    find_profile(backend, user_id)
        .await?
        .ok_or_else(|| MarketError::NotFound("프로필".to_string()))
}

/// 내 프로필 조회
pub async fn get_my_profile(backend: &Backend) -> MarketResult<UserProfile> {
    let user = current_user(backend).await?;
    get_profile(backend, user.id).await
}

// endregion: --- Queries

// region:    --- Commands

/// 회원가입 시 프로필 생성
pub async fn create_profile(
    backend: &Backend,
    user: &AuthUser,
    full_name: Option<String>,
) -> MarketResult<UserProfile> {
    info!("{:<12} --> 프로필 생성: {}", "Profile", user.id);
    let row = backend
        .store
        .insert(
            Table::Profiles,
            json!({
                "id": user.id,
                "email": user.email,
                "full_name": full_name,
                "role": Role::User,
            }),
        )
        .await?;
    decode_row(row)
}

/// 프로필 수정 (본인만 가능)
pub async fn update_profile(
    backend: &Backend,
    user_id: Uuid,
    update: &ProfileUpdate,
) -> MarketResult<UserProfile> {
    let caller = current_user(backend).await?;
    if caller.id != user_id {
        return Err(MarketError::PermissionDenied(
            "다른 사용자의 프로필은 수정할 수 없습니다.".to_string(),
        ));
    }
    if let Some(name) = &update.full_name {
        if name.trim().is_empty() {
            return Err(MarketError::Validation("이름을 입력해 주세요.".to_string()));
        }
    }

    info!("{:<12} --> 프로필 수정: {}", "Profile", user_id);
    let rows = backend
        .store
        .update(
            Table::Profiles,
            &Query::new().eq("id", user_id),
            serde_json::to_value(update)?,
        )
        .await?;
    decode_rows::<UserProfile>(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| MarketError::NotFound("프로필".to_string()))
}

/// 아바타 업로드 후 프로필에 반영
pub async fn upload_avatar(
    backend: &Backend,
    bucket: &str,
    bytes: Vec<u8>,
    content_type: &str,
) -> MarketResult<UserProfile> {
    let user = current_user(backend).await?;
    let Some(extension) = content_type.strip_prefix("image/") else {
        return Err(MarketError::Validation("이미지 파일만 업로드할 수 있습니다.".to_string()));
    };
    if bytes.is_empty() {
        return Err(MarketError::Validation("빈 파일입니다.".to_string()));
    }

    let path = format!("{}/{}.{}", user.id, Uuid::new_v4(), extension);
    let url = backend
        .storage
        .upload(bucket, &path, bytes, content_type)
        .await?;
    info!("{:<12} --> 아바타 업로드: {}", "Profile", url);

    let rows = backend
        .store
        .update(
            Table::Profiles,
            &Query::new().eq("id", user.id),
            json!({ "avatar_url": url }),
        )
        .await?;
    decode_rows::<UserProfile>(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| MarketError::NotFound("프로필".to_string()))
}

// endregion: --- Commands

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::commands::sign_up;
    use crate::auth::model::SignUpRequest;
    use crate::backend::memory::MemoryBackend;

    async fn signed_up(backend: &Backend, email: &str) -> AuthUser {
        sign_up(
            backend,
            &SignUpRequest {
                email: email.to_string(),
                password: "password1".to_string(),
                full_name: None,
            },
        )
        .await
        .unwrap()
        .user
    }

    #[tokio::test]
    async fn test_update_own_profile() {
        let backend = MemoryBackend::new().backend();
        let user = signed_up(&backend, "han@example.com").await;

        let update = ProfileUpdate {
            full_name: Some("한소희".to_string()),
            phone: Some("010-1234-5678".to_string()),
            address: None,
        };
        let profile = update_profile(&backend, user.id, &update).await.unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("한소희"));
        assert_eq!(profile.phone.as_deref(), Some("010-1234-5678"));
        assert_eq!(get_my_profile(&backend).await.unwrap(), profile);
    }

    #[tokio::test]
    async fn test_update_other_profile_is_denied() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        let first = signed_up(&backend, "one@example.com").await;
        signed_up(&backend, "two@example.com").await;

        let update = ProfileUpdate {
            full_name: Some("침입자".to_string()),
            ..Default::default()
        };
        let err = update_profile(&backend, first.id, &update).await.unwrap_err();
        assert!(matches!(err, MarketError::PermissionDenied(_)));

        let stored = memory.store.rows(Table::Profiles);
        assert!(stored.iter().all(|p| p["full_name"].is_null()));
    }

    #[tokio::test]
    async fn test_upload_avatar() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        let user = signed_up(&backend, "avatar@example.com").await;

        let err = upload_avatar(&backend, "avatars", vec![1, 2], "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));

        let profile = upload_avatar(&backend, "avatars", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        let url = profile.avatar_url.unwrap();
        assert!(url.starts_with(&format!("memory://storage/avatars/{}/", user.id)));
        assert!(url.ends_with(".png"));
    }
}
