//! GCP authentication
//!
//! Issues OAuth2 access tokens for Vertex AI. Two credential sources:
//! a service account key (signed JWT exchange) or, on Cloud Run / Cloud
//! Functions, the instance metadata server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Where access tokens come from
#[derive(Debug, Clone)]
enum CredentialSource {
    ServiceAccount { key_path: PathBuf },
    MetadataServer,
}

/// GCP authentication manager
pub struct GcpAuth {
    /// Credential source
    source: CredentialSource,
    /// Project ID
    project_id: String,
    /// HTTP client used for token requests
    http: reqwest::Client,
    /// Cached access token
    token: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl GcpAuth {
    /// Create from service account JSON key file
    pub fn from_service_account(key_path: impl AsRef<Path>, project_id: String) -> Result<Self> {
        let key_path = key_path.as_ref().to_path_buf();
        if !key_path.exists() {
            return Err(Error::Config(format!(
                "Service account key not found: {}",
                key_path.display()
            )));
        }

        Ok(Self::with_source(
            CredentialSource::ServiceAccount { key_path },
            project_id,
        ))
    }

    /// Use the metadata server of the hosting platform
    pub fn from_metadata_server(project_id: String) -> Self {
        Self::with_source(CredentialSource::MetadataServer, project_id)
    }

    /// Service account when a key path is given, metadata server otherwise
    pub fn from_config(config: &crate::config::GcpConfig) -> Result<Self> {
        match &config.service_account_key_path {
            Some(path) => Self::from_service_account(path, config.project_id.clone()),
            None => Ok(Self::from_metadata_server(config.project_id.clone())),
        }
    }

    fn with_source(source: CredentialSource, project_id: String) -> Self {
        Self {
            source,
            project_id,
            http: reqwest::Client::new(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Get project ID
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Get a valid access token (refreshing if needed)
    pub async fn get_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(ref cached) = *token {
                // Token valid for at least 60 more seconds
                if cached.expires_at > Instant::now() + Duration::from_secs(60) {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let response = match &self.source {
            CredentialSource::ServiceAccount { key_path } => {
                self.exchange_service_account_jwt(key_path).await?
            }
            CredentialSource::MetadataServer => self.fetch_metadata_token().await?,
        };

        // Assume 55 minutes when the server does not say
        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(55 * 60));
        {
            let mut token = self.token.write().await;
            *token = Some(CachedToken {
                access_token: response.access_token.clone(),
                expires_at: Instant::now() + lifetime,
            });
        }

        Ok(response.access_token)
    }

    /// Fetch a token for the attached service account from the metadata server
    async fn fetch_metadata_token(&self) -> Result<TokenResponse> {
        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::Config(format!("Metadata server request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Config(format!(
                "Metadata token request failed ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Config(format!("Failed to parse metadata token: {}", e)))
    }

    /// Exchange a service-account-signed JWT for an access token
    async fn exchange_service_account_jwt(&self, key_path: &Path) -> Result<TokenResponse> {
        let key_content = tokio::fs::read_to_string(key_path).await.map_err(|e| {
            Error::Config(format!(
                "Failed to read service account key {}: {}",
                key_path.display(),
                e
            ))
        })?;

        #[derive(serde::Deserialize)]
        struct ServiceAccountKey {
            client_email: String,
            private_key: String,
            token_uri: String,
        }

        let key: ServiceAccountKey = serde_json::from_str(&key_content).map_err(|e| {
            Error::Config(format!("Invalid service account key format: {}", e))
        })?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| Error::internal(format!("System clock before epoch: {}", e)))?
            .as_secs() as i64;

        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": "https://www.googleapis.com/auth/cloud-platform",
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        // Sign the JWT using RS256
        use base64::Engine;
        let header = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(r#"{"alg":"RS256","typ":"JWT"}"#.as_bytes());
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(claims.to_string().as_bytes());

        let signing_input = format!("{}.{}", header, payload);

        let private_key = key.private_key.replace("\\n", "\n");
        let key_pair = ring::signature::RsaKeyPair::from_pkcs8(
            pem::parse(&private_key)
                .map_err(|e| Error::Config(format!("Failed to parse private key PEM: {}", e)))?
                .contents(),
        )
        .map_err(|e| Error::Config(format!("Failed to parse private key: {:?}", e)))?;

        let mut signature = vec![0u8; key_pair.public().modulus_len()];
        key_pair
            .sign(
                &ring::signature::RSA_PKCS1_SHA256,
                &ring::rand::SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|e| Error::Config(format!("Failed to sign JWT: {:?}", e)))?;

        let signature_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&signature);
        let jwt = format!("{}.{}", signing_input, signature_b64);

        let response = self
            .http
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Config(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Config(format!(
                "Token exchange failed ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Config(format!("Failed to parse token response: {}", e)))
    }

    /// Create HTTP client with auth headers
    pub async fn authorized_client(&self) -> Result<reqwest::Client> {
        let token = self.get_token().await?;
        let mut headers = reqwest::header::HeaderMap::new();
        let value = format!("Bearer {}", token)
            .parse()
            .map_err(|e| Error::internal(format!("Invalid access token header: {}", e)))?;
        headers.insert(reqwest::header::AUTHORIZATION, value);

        reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_file_rejected() {
        let result = GcpAuth::from_service_account("/nonexistent/key.json", "p".to_string());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_config_without_key_uses_metadata_server() {
        let config = crate::config::GcpConfig::default();
        let auth = GcpAuth::from_config(&config).unwrap();
        assert!(matches!(auth.source, CredentialSource::MetadataServer));
        assert_eq!(auth.project_id(), "new-rag-project-prod");
    }
}
