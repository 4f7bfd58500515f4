//! 상품 등록/수정/삭제
//! 수정과 삭제는 소유자만 가능하며, 소유자가 아니면 아무것도 변경하지 않는다.
// region:    --- Imports
use super::model::{NewProduct, Product, ProductUpdate};
use super::queries::get_product;
use crate::auth::commands::current_user;
use crate::auth::model::AuthUser;
use crate::backend::{decode_row, decode_rows, Backend, Query, Table};
use crate::error::{MarketError, MarketResult};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Validation

fn validate_title(title: &str) -> MarketResult<()> {
    if title.trim().is_empty() {
        return Err(MarketError::Validation("상품명을 입력해 주세요.".to_string()));
    }
    Ok(())
}

fn validate_price(price: f64) -> MarketResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(MarketError::Validation(
            "가격은 0보다 커야 합니다.".to_string(),
        ));
    }
    Ok(())
}

/// 소유 상품 확인
async fn owned_product(backend: &Backend, product_id: Uuid, user: &AuthUser) -> MarketResult<Product> {
    let product = get_product(backend, product_id).await?;
    if product.owner_id != user.id {
        warn!(
            "{:<12} --> 소유자가 아닌 사용자의 요청: product={}, user={}",
            "Command", product_id, user.id
        );
        return Err(MarketError::PermissionDenied(
            "본인이 등록한 상품만 변경할 수 있습니다.".to_string(),
        ));
    }
    Ok(product)
}

// endregion: --- Validation

// region:    --- Commands

/// 상품 등록
pub async fn create_product(backend: &Backend, product: &NewProduct) -> MarketResult<Product> {
    let user = current_user(backend).await?;
    validate_title(&product.title)?;
    validate_price(product.price)?;

    info!("{:<12} --> 상품 등록: {}", "Command", product.title);
    let row = backend
        .store
        .insert(
            Table::Products,
            json!({
                "title": product.title.trim(),
                "description": product.description,
                "price": product.price,
                "image_url": product.image_url,
                "owner_id": user.id,
            }),
        )
        .await?;
    decode_row(row)
}

/// 상품 수정
pub async fn update_product(
    backend: &Backend,
    product_id: Uuid,
    update: &ProductUpdate,
) -> MarketResult<Product> {
    let user = current_user(backend).await?;
    owned_product(backend, product_id, &user).await?;
    if let Some(title) = &update.title {
        validate_title(title)?;
    }
    if let Some(price) = update.price {
        validate_price(price)?;
    }

    info!("{:<12} --> 상품 수정: {}", "Command", product_id);
    let query = Query::new().eq("id", product_id).eq("owner_id", user.id);
    let rows = backend
        .store
        .update(Table::Products, &query, serde_json::to_value(update)?)
        .await?;
    decode_rows::<Product>(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| MarketError::NotFound("상품".to_string()))
}

/// 상품 삭제
pub async fn delete_product(backend: &Backend, product_id: Uuid) -> MarketResult<()> {
    let user = current_user(backend).await?;
    owned_product(backend, product_id, &user).await?;

    info!("{:<12} --> 상품 삭제: {}", "Command", product_id);
    let query = Query::new().eq("id", product_id).eq("owner_id", user.id);
    let removed = backend.store.delete(Table::Products, &query).await?;
    if removed == 0 {
        return Err(MarketError::NotFound("상품".to_string()));
    }
    Ok(())
}

/// 상품 이미지 업로드 (외부 이미지 호스팅)
pub async fn upload_product_image(
    backend: &Backend,
    file_name: &str,
    bytes: Vec<u8>,
) -> MarketResult<String> {
    current_user(backend).await?;
    if bytes.is_empty() {
        return Err(MarketError::Validation("빈 파일입니다.".to_string()));
    }
    backend.images.upload(file_name, bytes).await
}

// endregion: --- Commands

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::commands::{sign_in, sign_up};
    use crate::auth::model::{Credentials, SignUpRequest};
    use crate::backend::memory::MemoryBackend;
    use crate::backend::SortDirection;
    use crate::products::model::{ProductFilter, ProductSortKey};
    use crate::products::queries::{list_my_products, list_products};

    async fn join(backend: &Backend, email: &str) {
        sign_up(
            backend,
            &SignUpRequest {
                email: email.to_string(),
                password: "password1".to_string(),
                full_name: None,
            },
        )
        .await
        .unwrap();
    }

    async fn switch_to(backend: &Backend, email: &str) {
        sign_in(
            backend,
            &Credentials {
                email: email.to_string(),
                password: "password1".to_string(),
            },
        )
        .await
        .unwrap();
    }

    fn new_product(title: &str, price: f64) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: String::new(),
            price,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_valid_form() {
        let backend = MemoryBackend::new().backend();
        assert_eq!(
            create_product(&backend, &new_product("램프", 10.0))
                .await
                .unwrap_err(),
            MarketError::Unauthenticated
        );

        join(&backend, "seller@example.com").await;
        assert!(matches!(
            create_product(&backend, &new_product("  ", 10.0)).await,
            Err(MarketError::Validation(_))
        ));
        assert!(matches!(
            create_product(&backend, &new_product("램프", 0.0)).await,
            Err(MarketError::Validation(_))
        ));
        let product = create_product(&backend, &new_product(" 램프 ", 10.0))
            .await
            .unwrap();
        assert_eq!(product.title, "램프");
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update_or_delete() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        join(&backend, "owner@example.com").await;
        let product = create_product(&backend, &new_product("자전거", 300.0))
            .await
            .unwrap();

        join(&backend, "other@example.com").await;
        let update = ProductUpdate {
            price: Some(1.0),
            ..Default::default()
        };
        assert!(matches!(
            update_product(&backend, product.id, &update).await,
            Err(MarketError::PermissionDenied(_))
        ));
        assert!(matches!(
            delete_product(&backend, product.id).await,
            Err(MarketError::PermissionDenied(_))
        ));

        let stored = get_product(&backend, product.id).await.unwrap();
        assert_eq!(stored, product);
        assert_eq!(memory.store.rows(Table::Products).len(), 1);
    }

    #[tokio::test]
    async fn test_owner_updates_and_deletes() {
        let backend = MemoryBackend::new().backend();
        join(&backend, "owner@example.com").await;
        let product = create_product(&backend, &new_product("자전거", 300.0))
            .await
            .unwrap();

        let update = ProductUpdate {
            price: Some(250.0),
            ..Default::default()
        };
        let updated = update_product(&backend, product.id, &update).await.unwrap();
        assert_eq!(updated.price, 250.0);
        assert_eq!(updated.title, "자전거");

        delete_product(&backend, product.id).await.unwrap();
        assert!(matches!(
            get_product(&backend, product.id).await,
            Err(MarketError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let backend = MemoryBackend::new().backend();
        join(&backend, "a@example.com").await;
        for (title, price) in [("Desk Lamp", 40.0), ("Floor LAMP", 120.0), ("Chair", 80.0)] {
            create_product(&backend, &new_product(title, price))
                .await
                .unwrap();
        }
        join(&backend, "b@example.com").await;
        create_product(&backend, &new_product("Lamp shade", 15.0))
            .await
            .unwrap();

        let filter = ProductFilter {
            min_price: Some(15.0),
            max_price: Some(120.0),
            search: Some("lamp".to_string()),
            sort: Some(ProductSortKey::Price),
            direction: Some(SortDirection::Asc),
        };
        let titles: Vec<String> = list_products(&backend, &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Lamp shade", "Desk Lamp", "Floor LAMP"]);

        let mine = list_my_products(&backend).await.unwrap();
        assert_eq!(mine.len(), 1);

        switch_to(&backend, "a@example.com").await;
        assert_eq!(list_my_products(&backend).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_upload_product_image() {
        let memory = MemoryBackend::new();
        let backend = memory.backend();
        join(&backend, "img@example.com").await;
        let url = upload_product_image(&backend, "lamp.jpg", vec![0xff, 0xd8])
            .await
            .unwrap();
        assert!(url.ends_with("/lamp.jpg"));
        assert_eq!(memory.images.uploads(), vec![url]);
    }
}
