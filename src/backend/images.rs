// region:    --- Imports
use super::ImageHost;
use crate::error::{MarketError, MarketResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Hosted Images

/// 외부 이미지 호스팅 업로드 (multipart POST)
pub struct HostedImages {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HostedImages {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

/// 응답에서 호스팅 URL 추출 (`data.url` 또는 `url`)
fn hosted_url(body: &Value) -> Option<String> {
    body.pointer("/data/url")
        .or_else(|| body.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ImageHost for HostedImages {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> MarketResult<String> {
        info!(
            "{:<12} --> 이미지 업로드: {} ({} bytes)",
            "Images",
            file_name,
            bytes.len()
        );
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("image", part);

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            warn!("{:<12} --> 이미지 업로드 실패: {}", "Images", status);
            return Err(MarketError::Network(format!(
                "이미지 업로드 실패 ({})",
                status
            )));
        }

        hosted_url(&body)
            .ok_or_else(|| MarketError::Network("이미지 URL 이 없는 응답입니다.".to_string()))
    }
}

// endregion: --- Hosted Images

// region:    --- Disabled

/// 이미지 호스팅 미설정
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _file_name: &str, _bytes: Vec<u8>) -> MarketResult<String> {
        Err(MarketError::Network(
            "이미지 업로드가 설정되지 않았습니다.".to_string(),
        ))
    }
}

// endregion: --- Disabled
