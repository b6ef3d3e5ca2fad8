//! Google Cloud Storage artifact store

use async_trait::async_trait;

use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};

use crate::error::{Error, Result};
use crate::providers::artifact_store::ArtifactStore;

/// Artifact blobs in a GCS bucket
pub struct GcsArtifactStore {
    client: GcsClient,
    bucket: String,
}

impl GcsArtifactStore {
    /// Create a new GCS artifact store using application default credentials
    ///
    /// # Arguments
    /// * `bucket` - GCS bucket name
    pub async fn new(bucket: String) -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::Config(format!("Failed to create GCS client: {}", e)))?;

        Ok(Self {
            client: GcsClient::new(config),
            bucket,
        })
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ArtifactStore for GcsArtifactStore {
    async fn upload(&self, name: &str, data: Vec<u8>) -> Result<String> {
        let mut media = Media::new(name.to_string());
        media.content_type = "application/octet-stream".into();
        let upload_type = UploadType::Simple(media);

        self.client
            .upload_object(
                &UploadObjectRequest {
                    bucket: self.bucket.clone(),
                    ..Default::default()
                },
                data,
                &upload_type,
            )
            .await
            .map_err(|e| Error::storage(format!("Failed to upload {}: {}", self.uri(name), e)))?;

        Ok(self.uri(name))
    }

    async fn download(&self, name: &str) -> Result<Vec<u8>> {
        self.client
            .download_object(
                &GetObjectRequest {
                    bucket: self.bucket.clone(),
                    object: name.to_string(),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
            .map_err(|e| Error::storage(format!("Failed to download {}: {}", self.uri(name), e)))
    }

    fn uri(&self, name: &str) -> String {
        format!("gs://{}/{}", self.bucket, name)
    }

    fn name(&self) -> &str {
        "gcs"
    }
}
