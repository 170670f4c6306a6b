use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::{CloudError, Result};

/// Every backend response is wrapped in this
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub token: Option<String>,
}

impl<T> Envelope<T> {
    /// `data` of a successful envelope, `Rejected` otherwise.
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(CloudError::Rejected(
                self.message.unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }

        self.data
            .ok_or_else(|| CloudError::Rejected("response has no data".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// Human readable, e.g. "1.5 MB"
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub share_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Unauthenticated view of a shared folder
#[derive(Debug, Clone, PartialEq)]
pub struct SharedFolder {
    pub name: String,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct SharedPayload {
    #[serde(default)]
    folder: Option<FolderRecord>,
    #[serde(default)]
    files: Option<Vec<FileRecord>>,
}

#[derive(Debug, Default, Deserialize)]
struct SharedResponse {
    #[serde(default)]
    files: Option<Vec<FileRecord>>,
    #[serde(default)]
    data: Option<SharedPayload>,
}

impl SharedFolder {
    pub const DEFAULT_NAME: &'static str = "Shared Folder";

    /// Files may sit at the top level or under `data`; the name only under `data.folder`.
    pub fn from_json(body: &str) -> Result<Self> {
        let response: SharedResponse = serde_json::from_str(body)?;
        let data = response.data.unwrap_or_default();

        let name = data
            .folder
            .map(|folder| folder.name)
            .unwrap_or_else(|| Self::DEFAULT_NAME.to_string());
        let files = response.files.or(data.files).unwrap_or_default();

        Ok(Self { name, files })
    }
}

/// Files, folders and the recent list, fetched together
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub files: Vec<FileRecord>,
    pub folders: Vec<FolderRecord>,
    pub recent: Vec<FileRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateFolderRequest<'a> {
    pub name: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_record_wire_names() {
        let json = r#"{
            "_id": "f1",
            "name": "beach.jpg",
            "size": "2.5 MB",
            "type": "img",
            "uploadedBy": "Mom",
            "folderId": "d1",
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;

        let file: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "f1");
        assert_eq!(file.kind.as_deref(), Some("img"));
        assert_eq!(file.uploaded_by.as_deref(), Some("Mom"));
        assert_eq!(file.folder_id.as_deref(), Some("d1"));
        assert!(file.created_at.is_some());
        assert!(file.deleted_at.is_none());
    }

    #[test]
    fn test_envelope_into_data() {
        let ok: Envelope<Vec<u8>> = serde_json::from_str(r#"{"success":true,"data":[1,2]}"#).unwrap();
        assert_eq!(ok.into_data().unwrap(), vec![1, 2]);

        let rejected: Envelope<Vec<u8>> =
            serde_json::from_str(r#"{"success":false,"message":"nope"}"#).unwrap();
        match rejected.into_data() {
            Err(CloudError::Rejected(message)) => assert_eq!(message, "nope"),
            other => panic!("unexpected {other:?}"),
        }

        let empty: Envelope<Vec<u8>> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(empty.into_data().is_err());
    }

    #[test]
    fn test_shared_folder_shapes() {
        let nested = r#"{"success":true,"data":{"folder":{"_id":"d1","name":"Trip","isPublic":true},"files":[{"_id":"a","name":"a.png"}]}}"#;
        let shared = SharedFolder::from_json(nested).unwrap();
        assert_eq!(shared.name, "Trip");
        assert_eq!(shared.files.len(), 1);

        let flat = r#"{"files":[{"_id":"a","name":"a.png"},{"_id":"b","name":"b.mp4"}]}"#;
        let shared = SharedFolder::from_json(flat).unwrap();
        assert_eq!(shared.name, SharedFolder::DEFAULT_NAME);
        assert_eq!(shared.files.len(), 2);

        let shared = SharedFolder::from_json("{}").unwrap();
        assert!(shared.files.is_empty());
    }
}
