//! Client-side protocol and state machine for collaborative note
//! editing: a pessimistic edit lock with TTL and periodic renewal, an
//! owner-gated three-tier sharing model, and an append-only version
//! history with restore-by-copy-forward. The remote note service stays
//! authoritative for lock state, version numbers and permission
//! enforcement; this crate drives it correctly from the client side.

pub mod api;
pub mod errors;
pub mod lock;
pub mod models;
pub mod permissions;
pub mod session;
pub mod versions;

pub use api::http::HttpNoteService;
pub use api::NoteService;
pub use errors::{ClientError, ClientResult};
pub use lock::{
    EditLockController, LockSnapshot, LockState, LOCK_RENEWAL_SECONDS, LOCK_TTL_SECONDS,
};
pub use models::{
    AccessTier, ClientConfig, CreateNoteRequest, EditLock, LockResponse, LockStatus, Note,
    NotePermissions, NoteResponse, NoteVersion, RestoreVersionRequest, UpdateNoteRequest,
    MAX_BODY_CHARS, MAX_TAG_CHARS, MAX_TITLE_CHARS,
};
pub use session::{EditorState, NoteCache, NoteEditSession};
pub use versions::{normalize_version_payload, VersionHistoryStore};
