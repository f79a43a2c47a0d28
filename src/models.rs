use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_BODY_CHARS: usize = 280;
pub const MAX_TAG_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessTier {
    Private,
    SharedRead,
    SharedWrite,
}

impl AccessTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::SharedRead => "SHARED_READ",
            Self::SharedWrite => "SHARED_WRITE",
        }
    }
}

impl Default for AccessTier {
    fn default() -> Self {
        Self::Private
    }
}

/// Sharing settings of a note. Exactly one audience set is populated:
/// `readers` under `SharedRead`, `writers` under `SharedWrite`, neither
/// under `Private`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePermissions {
    #[serde(default)]
    pub access_tier: AccessTier,
    #[serde(default)]
    pub readers: BTreeSet<String>,
    #[serde(default)]
    pub writers: BTreeSet<String>,
}

impl NotePermissions {
    pub fn private() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub collections: BTreeSet<String>,
    #[serde(flatten)]
    pub permissions: NotePermissions,
    #[serde(default = "initial_version")]
    pub version_number: u32,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub is_locked_for_editing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_expires_at: Option<DateTime<Utc>>,
}

fn initial_version() -> u32 {
    1
}

/// Immutable historical snapshot of a note's content. The history is
/// append-only and ordered by `version_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteVersion {
    pub version_number: u32,
    pub title: String,
    pub body: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_description: Option<String>,
}

/// Client-side record of an exclusive edit claim confirmed by the server.
#[derive(Debug, Clone)]
pub struct EditLock {
    pub note_id: u64,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub renewed: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
    pub collections: BTreeSet<String>,
    pub permissions: NotePermissions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
    pub collections: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreVersionRequest {
    pub version_number: u32,
}

/// Envelope used by note-returning endpoints. Older deployments wrap the
/// note under `data`, newer ones under `note`; both are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub note: Option<Note>,
    #[serde(default)]
    pub data: Option<Note>,
}

impl NoteResponse {
    pub fn into_note(self) -> Option<Note> {
        self.note.or(self.data)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub locked_by_user: Option<String>,
    #[serde(default)]
    pub lock_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub locked_by: Option<String>,
    #[serde(default)]
    pub lock_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub username: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        bearer_token: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            username: username.into(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}
