use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A remote image persisted to blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedImage {
    /// Freshly minted, independent of the image bytes.
    pub id: Uuid,
    pub local_path: String,
    pub source_url: String,
}
