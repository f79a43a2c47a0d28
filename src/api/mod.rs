pub mod http;

use crate::errors::ClientResult;
use crate::models::{
    CreateNoteRequest, LockResponse, LockStatus, Note, NotePermissions, UpdateNoteRequest,
};
use async_trait::async_trait;

/// Seam to the remote note service. The server is the authority for lock
/// state, version numbers and permission enforcement; implementations
/// translate its verdicts into `ClientError` values and nothing more.
///
/// Contract notes:
/// - `acquire_lock` returns `ClientError::LockConflict` when another actor
///   holds a non-expired lock.
/// - `refresh_lock` returns `ClientError::LockExpired` when the claim has
///   lapsed or was revoked.
/// - `list_versions` returns the raw payload; callers normalize it through
///   [`crate::versions::normalize_version_payload`] so the legacy wrapper
///   shapes are handled in exactly one place.
#[async_trait]
pub trait NoteService: Send + Sync {
    async fn get_note(&self, note_id: u64) -> ClientResult<Note>;

    async fn create_note(&self, request: &CreateNoteRequest) -> ClientResult<Note>;

    async fn update_note(&self, note_id: u64, request: &UpdateNoteRequest) -> ClientResult<Note>;

    async fn update_permissions(
        &self,
        note_id: u64,
        permissions: &NotePermissions,
    ) -> ClientResult<Note>;

    async fn acquire_lock(&self, note_id: u64) -> ClientResult<LockResponse>;

    async fn release_lock(&self, note_id: u64) -> ClientResult<()>;

    async fn refresh_lock(&self, note_id: u64) -> ClientResult<LockResponse>;

    async fn lock_status(&self, note_id: u64) -> ClientResult<LockStatus>;

    async fn list_versions(&self, note_id: u64) -> ClientResult<serde_json::Value>;

    async fn restore_version(&self, note_id: u64, version_number: u32) -> ClientResult<Note>;
}
