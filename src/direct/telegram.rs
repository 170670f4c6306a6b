use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;
use crate::api::{ProgressStream, TransferCounter};
use crate::core::{CloudError, Result};
use crate::progress::TransferSample;
use super::{DirectUploader, DocumentId, FractionCallback};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct BotResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> BotResponse<T> {
    fn into_result(self) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(CloudError::Provider(
                self.description.unwrap_or_else(|| "telegram request failed".to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    file_id: String,
}

/// Bot API `sendDocument` uploader
pub struct BotApiUploader {
    client: Client,
    api_base: Url,
    bot_token: String,
    chat_id: String,
}

impl BotApiUploader {
    pub fn new(bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        Self::with_api_base(DEFAULT_API_BASE, bot_token, chat_id, timeout)
    }

    pub fn with_api_base(api_base: &str, bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self> {
        if bot_token.is_empty() || chat_id.is_empty() {
            return Err(CloudError::param("telegram bot token and chat id are required"));
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_base: Url::parse(api_base)?,
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        Ok(self.api_base.join(&format!("/bot{}/{}", self.bot_token, method))?)
    }
}

#[async_trait]
impl DirectUploader for BotApiUploader {
    async fn connect(&self) -> Result<()> {
        let response: BotResponse<serde_json::Value> =
            self.client.get(self.method_url("getMe")?).send().await?.json().await?;
        let me = response.into_result()?;
        debug!(bot = ?me.get("username"), "telegram bot authenticated");

        Ok(())
    }

    async fn send_document(&self, path: &Path, caption: &str, on_progress: FractionCallback) -> Result<DocumentId> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let counter = TransferCounter::new(
            size,
            Arc::new(move |sample: TransferSample| {
                if sample.bytes_total > 0 {
                    on_progress(sample.bytes_sent as f64 / sample.bytes_total as f64);
                }
            }),
        );
        let stream = ProgressStream::new(ReaderStream::new(file), counter);
        let document = Part::stream_with_length(Body::wrap_stream(stream), size).file_name(file_name);

        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", document);

        let response: BotResponse<SentMessage> = self
            .client
            .post(self.method_url("sendDocument")?)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        response
            .into_result()?
            .document
            .map(|document| DocumentId(document.file_id))
            .ok_or_else(|| CloudError::Provider("message carries no document".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_credentials() {
        assert!(BotApiUploader::new("", "1", Duration::from_secs(1)).is_err());
        assert!(BotApiUploader::new("t", "", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_method_url() {
        let uploader = BotApiUploader::new("123:abc", "42", Duration::from_secs(1)).unwrap();
        assert_eq!(
            uploader.method_url("sendDocument").unwrap().as_str(),
            "https://api.telegram.org/bot123:abc/sendDocument"
        );
    }

    #[test]
    fn test_bot_error_description() {
        let response: BotResponse<SentMessage> =
            serde_json::from_str(r#"{"ok":false,"error_code":413,"description":"Request Entity Too Large"}"#).unwrap();
        match response.into_result() {
            Err(CloudError::Provider(message)) => assert_eq!(message, "Request Entity Too Large"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
