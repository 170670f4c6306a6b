use std::path::Path;
use std::time::Duration;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use url::Url;
use crate::core::{CloudError, Result, UploadItem};
use crate::progress::TransferSample;
use super::progress_stream::{ProgressStream, TransferCallback, TransferCounter};
use super::types::{
    CreateFolderRequest, Dashboard, Envelope, FileRecord, FolderRecord, LoginRequest, SharedFolder,
};

const INVALID_SHARE_LINK: &str = "Link invalid or expired";

/// Multipart upload of one or more files
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub items: Vec<UploadItem>,
    pub uploaded_by: String,
    pub folder_id: Option<String>,
    /// Push channel socket that should receive the processing stages
    pub socket_id: Option<String>,
}

impl UploadRequest {
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|item| item.size).sum()
    }
}

/// Backend REST client
#[derive(Debug, Clone)]
pub struct CloudClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl CloudClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Non-2xx becomes `ServerError` carrying the envelope message when there is one.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or_else(|| format!("request failed with status {}", status));

        Err(CloudError::server_error(status.as_u16(), message))
    }

    async fn process_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&text)?;

        envelope.into_data()
    }

    async fn expect_success(response: Response) -> Result<()> {
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(());
        }

        let envelope: Envelope<serde_json::Value> = serde_json::from_str(&text)?;
        if envelope.success {
            Ok(())
        } else {
            Err(CloudError::Rejected(
                envelope.message.unwrap_or_else(|| "request was not successful".to_string()),
            ))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self.authorized(self.client.get(url)).send().await?;

        Self::process_response(response).await
    }

    /// Any failure, transport included, is reported as `IncorrectPassword`.
    pub async fn login(&self, password: &str) -> Result<String> {
        let url = self.endpoint("/api/auth/login")?;
        let response = self
            .client
            .post(url)
            .json(&LoginRequest { password })
            .send()
            .await
            .map_err(|err| {
                warn!(%err, "login request failed");
                CloudError::IncorrectPassword
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "login rejected");
            return Err(CloudError::IncorrectPassword);
        }

        let envelope: Envelope<serde_json::Value> = response.json().await.map_err(|err| {
            warn!(%err, "login response undecodable");
            CloudError::IncorrectPassword
        })?;
        match envelope.token {
            Some(token) if envelope.success => {
                info!("logged in");
                Ok(token)
            }
            _ => Err(CloudError::IncorrectPassword),
        }
    }

    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.get("/api/files").await
    }

    pub async fn list_folders(&self) -> Result<Vec<FolderRecord>> {
        self.get("/api/folders").await
    }

    pub async fn recent_files(&self) -> Result<Vec<FileRecord>> {
        self.get("/api/files/recent").await
    }

    pub async fn trash(&self) -> Result<Vec<FileRecord>> {
        self.get("/api/files/trash").await
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let (files, folders, recent) =
            tokio::try_join!(self.list_files(), self.list_folders(), self.recent_files())?;

        Ok(Dashboard { files, folders, recent })
    }

    pub async fn create_folder(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CloudError::param("folder name is empty"));
        }

        let url = self.endpoint("/api/folders")?;
        let response = self
            .authorized(self.client.post(url))
            .json(&CreateFolderRequest { name })
            .send()
            .await?;

        Self::expect_success(response).await?;
        info!(folder = name, "folder created");
        Ok(())
    }

    /// Files inside are moved to the bin by the backend.
    pub async fn delete_folder(&self, folder_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/folders/{}", folder_id))?;
        let response = self.authorized(self.client.delete(url)).send().await?;

        Self::expect_success(response).await
    }

    pub async fn toggle_public(&self, folder_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/folders/{}/toggle-public", folder_id))?;
        let response = self.authorized(self.client.patch(url)).send().await?;

        Self::expect_success(response).await
    }

    /// Moves a file to the bin.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/files/{}", file_id))?;
        let response = self.authorized(self.client.delete(url)).send().await?;

        Self::expect_success(response).await
    }

    pub async fn restore(&self, file_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/files/restore/{}", file_id))?;
        let response = self.authorized(self.client.post(url)).send().await?;

        Self::expect_success(response).await
    }

    pub async fn delete_permanent(&self, file_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("/api/files/permanent/{}", file_id))?;
        let response = self.authorized(self.client.delete(url)).send().await?;

        Self::expect_success(response).await
    }

    /// Permanently deletes everything in the bin, returns how many files went.
    pub async fn empty_trash(&self) -> Result<usize> {
        let files = self.trash().await?;
        if files.is_empty() {
            return Ok(0);
        }

        futures::future::try_join_all(files.iter().map(|file| self.delete_permanent(&file.id))).await?;
        info!(count = files.len(), "bin emptied");

        Ok(files.len())
    }

    pub fn preview_url(&self, file_id: &str) -> Result<Url> {
        self.endpoint(&format!("/api/files/preview/{}", file_id))
    }

    pub fn download_url(&self, file_id: &str, inline: bool) -> Result<Url> {
        let mut url = self.endpoint(&format!("/api/files/download/{}", file_id))?;
        if inline {
            url.query_pairs_mut().append_pair("inline", "true");
        }

        Ok(url)
    }

    /// Streams a file to `dest`, reporting `(written, content-length)`.
    pub async fn download(&self, file_id: &str, dest: &Path, on_progress: Option<TransferCallback>) -> Result<u64> {
        let url = self.download_url(file_id, false)?;
        let response = self.authorized(self.client.get(url)).send().await?;
        let response = Self::check_status(response).await?;

        let total = response.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if let Some(callback) = &on_progress {
                callback(TransferSample::new(written, total));
            }
        }
        file.flush().await?;
        info!(file_id, bytes = written, dest = %dest.display(), "downloaded");

        Ok(written)
    }

    /// Resolves a share link. No credentials are sent.
    ///
    /// Every failure becomes `Rejected`, carrying the server message when there is one.
    pub async fn public_folder(&self, share_id: &str) -> Result<SharedFolder> {
        let url = self.endpoint(&format!("/api/folders/public/{}", share_id))?;
        let invalid_link = |err: reqwest::Error| {
            warn!(%err, share_id, "share link request failed");
            CloudError::Rejected(INVALID_SHARE_LINK.to_string())
        };
        let response = self.client.get(url).send().await.map_err(invalid_link)?;

        let status = response.status();
        let text = response.text().await.map_err(invalid_link)?;
        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| INVALID_SHARE_LINK.to_string());
            return Err(CloudError::Rejected(message));
        }

        SharedFolder::from_json(&text)
    }

    /// Sends every item in one multipart body. Processing continues on the server
    /// after this returns and is reported over the push channel.
    pub async fn upload_multiple(&self, request: &UploadRequest, on_progress: TransferCallback) -> Result<()> {
        if request.items.is_empty() {
            return Err(CloudError::param("nothing to upload"));
        }

        let counter = TransferCounter::new(request.total_bytes(), on_progress);
        let mut form = Form::new();

        for item in &request.items {
            let file = tokio::fs::File::open(&item.path).await?;
            let stream = ProgressStream::new(ReaderStream::new(file), counter.clone());
            let part = Part::stream_with_length(Body::wrap_stream(stream), item.size)
                .file_name(item.file_name.clone());
            form = form.part("files", part);
        }

        form = form.text("uploadedBy", request.uploaded_by.clone());
        if let Some(folder_id) = &request.folder_id {
            form = form.text("folderId", folder_id.clone());
        }
        if let Some(socket_id) = &request.socket_id {
            form = form.text("socketId", socket_id.clone());
        }

        let url = self.endpoint("/api/files/upload-multiple")?;
        info!(items = request.items.len(), bytes = request.total_bytes(), "uploading");
        let response = self.authorized(self.client.post(url)).multipart(form).send().await?;

        Self::expect_success(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CloudClient {
        CloudClient::new("https://cloud.example", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_download_url() {
        let client = client();
        assert_eq!(
            client.download_url("f1", false).unwrap().as_str(),
            "https://cloud.example/api/files/download/f1"
        );
        assert_eq!(
            client.download_url("f1", true).unwrap().as_str(),
            "https://cloud.example/api/files/download/f1?inline=true"
        );
        assert_eq!(
            client.preview_url("f1").unwrap().as_str(),
            "https://cloud.example/api/files/preview/f1"
        );
    }

    #[test]
    fn test_empty_token_is_dropped() {
        let client = client().with_token(Some(String::new()));
        assert!(client.token.is_none());
    }

    #[tokio::test]
    async fn test_blank_folder_name_sends_nothing() {
        let result = client().create_folder("   ").await;
        assert!(matches!(result, Err(CloudError::ParamError(_))));
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let request = UploadRequest {
            items: vec![],
            uploaded_by: "Guest".to_string(),
            folder_id: None,
            socket_id: None,
        };
        let result = client().upload_multiple(&request, std::sync::Arc::new(|_: TransferSample| {})).await;
        assert!(matches!(result, Err(CloudError::ParamError(_))));
    }
}
