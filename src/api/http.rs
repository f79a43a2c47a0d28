use crate::api::NoteService;
use crate::errors::{ClientError, ClientResult};
use crate::models::{
    ClientConfig, CreateNoteRequest, LockResponse, LockStatus, Note, NotePermissions,
    NoteResponse, RestoreVersionRequest, UpdateNoteRequest,
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Error body the service attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpNoteService {
    base_url: String,
    http_client: Client,
}

impl HttpNoteService {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Url::parse(&config.base_url).context("invalid base url")?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
            .context("bearer token is not a valid header value")?;
        headers.insert(AUTHORIZATION, bearer);

        let http_client = Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn note_url(&self, note_id: u64, suffix: &str) -> String {
        format!("{}/notes/{}{}", self.base_url, note_id, suffix)
    }

    async fn checked(&self, response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClientError::PermissionDenied(message)
            }
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            _ => ClientError::Transport(format!("{status}: {message}")),
        })
    }

    /// Note-returning endpoints answer either with a bare note or with the
    /// `{success, note|data}` envelope depending on deployment age.
    fn note_from_payload(payload: serde_json::Value) -> ClientResult<Note> {
        if payload.get("success").is_some()
            || payload.get("note").is_some()
            || payload.get("data").is_some()
        {
            let response: NoteResponse = serde_json::from_value(payload)?;
            let message = response.message.clone();
            return response.into_note().ok_or_else(|| {
                ClientError::Internal(
                    message.unwrap_or_else(|| "response carried no note payload".to_string()),
                )
            });
        }

        Ok(serde_json::from_value(payload)?)
    }
}

#[async_trait]
impl NoteService for HttpNoteService {
    async fn get_note(&self, note_id: u64) -> ClientResult<Note> {
        let response = self
            .http_client
            .get(self.note_url(note_id, ""))
            .send()
            .await?;
        let payload = self.checked(response).await?.json().await?;
        Self::note_from_payload(payload)
    }

    async fn create_note(&self, request: &CreateNoteRequest) -> ClientResult<Note> {
        let response = self
            .http_client
            .post(format!("{}/notes", self.base_url))
            .json(request)
            .send()
            .await?;
        let payload = self.checked(response).await?.json().await?;
        Self::note_from_payload(payload)
    }

    async fn update_note(&self, note_id: u64, request: &UpdateNoteRequest) -> ClientResult<Note> {
        let response = self
            .http_client
            .put(self.note_url(note_id, ""))
            .json(request)
            .send()
            .await?;
        let payload = self.checked(response).await?.json().await?;
        Self::note_from_payload(payload)
    }

    async fn update_permissions(
        &self,
        note_id: u64,
        permissions: &NotePermissions,
    ) -> ClientResult<Note> {
        let response = self
            .http_client
            .put(self.note_url(note_id, "/permissions"))
            .json(permissions)
            .send()
            .await?;
        let payload = self.checked(response).await?.json().await?;
        Self::note_from_payload(payload)
    }

    async fn acquire_lock(&self, note_id: u64) -> ClientResult<LockResponse> {
        let response = self
            .http_client
            .post(self.note_url(note_id, "/lock"))
            .send()
            .await?;

        let lock: LockResponse = match self.checked(response).await {
            Ok(response) => response.json().await?,
            // The service answers 409 when another actor holds the lock.
            Err(ClientError::Conflict(message)) => return Err(ClientError::LockConflict(message)),
            Err(err) => return Err(err),
        };

        if !lock.success {
            let holder = lock
                .locked_by_user
                .or(lock.message)
                .unwrap_or_else(|| "another user is editing this note".to_string());
            return Err(ClientError::LockConflict(holder));
        }

        Ok(lock)
    }

    async fn release_lock(&self, note_id: u64) -> ClientResult<()> {
        let response = self
            .http_client
            .delete(self.note_url(note_id, "/lock"))
            .send()
            .await?;
        self.checked(response).await?;
        Ok(())
    }

    async fn refresh_lock(&self, note_id: u64) -> ClientResult<LockResponse> {
        let response = self
            .http_client
            .put(self.note_url(note_id, "/lock/refresh"))
            .send()
            .await?;

        let lock: LockResponse = match self.checked(response).await {
            Ok(response) => response.json().await?,
            Err(ClientError::Conflict(message)) | Err(ClientError::NotFound(message)) => {
                return Err(ClientError::LockExpired(message))
            }
            Err(err) => return Err(err),
        };

        if !lock.success {
            let message = lock
                .message
                .unwrap_or_else(|| "edit lock is no longer held".to_string());
            return Err(ClientError::LockExpired(message));
        }

        Ok(lock)
    }

    async fn lock_status(&self, note_id: u64) -> ClientResult<LockStatus> {
        let response = self
            .http_client
            .get(self.note_url(note_id, "/lock-status"))
            .send()
            .await?;
        Ok(self.checked(response).await?.json().await?)
    }

    async fn list_versions(&self, note_id: u64) -> ClientResult<serde_json::Value> {
        let response = self
            .http_client
            .get(self.note_url(note_id, "/versions"))
            .send()
            .await?;
        Ok(self.checked(response).await?.json().await?)
    }

    async fn restore_version(&self, note_id: u64, version_number: u32) -> ClientResult<Note> {
        let response = self
            .http_client
            .post(self.note_url(note_id, "/restore"))
            .json(&RestoreVersionRequest { version_number })
            .send()
            .await?;
        let payload = self.checked(response).await?.json().await?;
        Self::note_from_payload(payload)
    }
}
