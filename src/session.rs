use crate::api::NoteService;
use crate::errors::{ClientError, ClientResult};
use crate::lock::{EditLockController, LockSnapshot};
use crate::models::{
    CreateNoteRequest, Note, NotePermissions, UpdateNoteRequest, MAX_BODY_CHARS, MAX_TAG_CHARS,
    MAX_TITLE_CHARS,
};
use crate::permissions;
use crate::versions::VersionHistoryStore;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Session-scoped view of the notes this client has seen. Passed by
/// handle to the orchestrator; there is no ambient global cache.
#[derive(Clone, Default)]
pub struct NoteCache {
    notes: Arc<Mutex<HashMap<u64, Note>>>,
}

impl NoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, note: Note) {
        let mut notes = self.notes.lock().await;
        notes.insert(note.id, note);
    }

    pub async fn get(&self, note_id: u64) -> Option<Note> {
        let notes = self.notes.lock().await;
        notes.get(&note_id).cloned()
    }

    pub async fn invalidate(&self, note_id: u64) {
        let mut notes = self.notes.lock().await;
        notes.remove(&note_id);
    }

    pub async fn clear(&self) {
        let mut notes = self.notes.lock().await;
        notes.clear();
    }

    /// Re-fetches one note from the server and replaces the cached copy.
    pub async fn refresh(&self, service: &dyn NoteService, note_id: u64) -> ClientResult<Note> {
        let note = service.get_note(note_id).await?;
        self.insert(note.clone()).await;
        Ok(note)
    }
}

/// Editable form state hydrated from a note snapshot.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
    pub collections: BTreeSet<String>,
    pub permissions: NotePermissions,
}

impl EditorState {
    fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            body: note.body.clone(),
            tags: note.tags.clone(),
            collections: note.collections.clone(),
            permissions: note.permissions.clone(),
        }
    }

    pub fn character_count(&self) -> usize {
        self.body.chars().count()
    }

    fn validate(&self) -> ClientResult<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ClientError::Validation("title must not be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ClientError::Validation(format!(
                "title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }

        let body = self.body.trim();
        if body.is_empty() {
            return Err(ClientError::Validation("body must not be empty".to_string()));
        }
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(ClientError::Validation(format!(
                "body exceeds {MAX_BODY_CHARS} characters"
            )));
        }

        for tag in &self.tags {
            if tag.trim().is_empty() || tag.chars().count() > MAX_TAG_CHARS {
                return Err(ClientError::Validation(format!(
                    "tag '{tag}' must be 1..={MAX_TAG_CHARS} characters"
                )));
            }
        }

        Ok(())
    }
}

/// Drives one "open a note for editing" interaction: lock acquisition,
/// hydration, the submit sequence, and lock release on every exit path.
pub struct NoteEditSession {
    id: String,
    service: Arc<dyn NoteService>,
    cache: NoteCache,
    username: String,
    note: Option<Note>,
    lock: Option<EditLockController>,
    versions: VersionHistoryStore,
    pub editor: EditorState,
    closed: bool,
}

impl std::fmt::Debug for NoteEditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteEditSession")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("note", &self.note)
            .field("editor", &self.editor)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl NoteEditSession {
    /// Opens an editing session. For an existing note this resolves
    /// ownership, takes the edit lock (a refusal aborts the attempt; the
    /// caller must close the edit surface and show the conflict), then
    /// hydrates the editor from the note and its version history. A
    /// brand-new note skips locking entirely.
    pub async fn open(
        service: Arc<dyn NoteService>,
        cache: NoteCache,
        username: impl Into<String>,
        note_id: Option<u64>,
    ) -> ClientResult<Self> {
        let username = username.into();

        let Some(note_id) = note_id else {
            return Ok(Self {
                id: Uuid::new_v4().to_string(),
                service: Arc::clone(&service),
                cache,
                username,
                note: None,
                lock: None,
                versions: VersionHistoryStore::new(service),
                editor: EditorState::default(),
                closed: false,
            });
        };

        let note = match cache.get(note_id).await {
            Some(note) => note,
            None => cache.refresh(service.as_ref(), note_id).await?,
        };

        let lock = EditLockController::new(Arc::clone(&service), note_id, username.clone());
        lock.acquire().await?;

        let mut versions = VersionHistoryStore::new(Arc::clone(&service));
        versions.load(note_id).await?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            service,
            cache,
            username,
            editor: EditorState::from_note(&note),
            note: Some(note),
            lock: Some(lock),
            versions,
            closed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_creating(&self) -> bool {
        self.note.is_none()
    }

    pub fn note(&self) -> Option<&Note> {
        self.note.as_ref()
    }

    /// Whether the permission controls should be rendered at all.
    /// Non-owners get read-only sharing info and any permission block
    /// they submit is discarded.
    pub fn can_edit_permissions(&self) -> bool {
        permissions::can_edit_permissions(self.note.as_ref(), &self.username)
    }

    pub fn lock_snapshot(&self) -> Option<LockSnapshot> {
        self.lock.as_ref().map(EditLockController::snapshot)
    }

    /// Warning to surface once the lock has lapsed: the session stays
    /// editable and the server arbitrates the eventual save.
    pub fn lock_warning(&self) -> Option<String> {
        let snapshot = self.lock_snapshot()?;
        snapshot.lapsed.then(|| {
            "the edit lock has expired; saving may be rejected if someone else took over"
                .to_string()
        })
    }

    pub fn version_history(&self) -> &VersionHistoryStore {
        &self.versions
    }

    /// Persists the editor state. Creation sends one request carrying the
    /// permission block; an edit updates content first and, only for the
    /// owner and only when the block materially changed, permissions as a
    /// second dependent step. The lock is released afterwards whether or
    /// not persistence succeeded.
    pub async fn submit(&mut self) -> ClientResult<Note> {
        self.editor.validate()?;

        let outcome = match self.note.clone() {
            None => self.create().await,
            Some(note) => self.update(note).await,
        };

        self.finish();

        let note = outcome?;
        self.cache.insert(note.clone()).await;
        self.note = Some(note.clone());
        Ok(note)
    }

    async fn create(&self) -> ClientResult<Note> {
        let request = CreateNoteRequest {
            title: self.editor.title.trim().to_string(),
            body: self.editor.body.trim().to_string(),
            tags: self.editor.tags.clone(),
            collections: self.editor.collections.clone(),
            permissions: self.editor.permissions.clone(),
        };
        self.service.create_note(&request).await
    }

    async fn update(&self, note: Note) -> ClientResult<Note> {
        let request = UpdateNoteRequest {
            title: self.editor.title.trim().to_string(),
            body: self.editor.body.trim().to_string(),
            tags: self.editor.tags.clone(),
            collections: self.editor.collections.clone(),
        };

        let proposed = self.editor.permissions.clone();
        let changed = permissions::permissions_changed(&note.permissions, &proposed);
        let owner = permissions::can_edit_permissions(Some(&note), &self.username);

        if changed && !owner {
            tracing::warn!(
                note_id = note.id,
                username = %self.username,
                "discarding permission changes submitted by a non-owner"
            );
        }

        let updated = self.service.update_note(note.id, &request).await?;

        if changed && owner {
            return self.service.update_permissions(note.id, &proposed).await;
        }

        Ok(updated)
    }

    /// Restores a historical version: the server copies its content
    /// forward into a new version and the session re-hydrates title and
    /// body from the result.
    pub async fn restore_version(&mut self, version_number: u32) -> ClientResult<Note> {
        let note_id = self
            .note
            .as_ref()
            .map(|note| note.id)
            .ok_or_else(|| {
                ClientError::Validation("an unsaved note has no versions to restore".to_string())
            })?;

        let restored = self.versions.restore(note_id, version_number).await?;
        self.cache.insert(restored.clone()).await;
        self.editor.title = restored.title.clone();
        self.editor.body = restored.body.clone();
        self.note = Some(restored.clone());
        Ok(restored)
    }

    /// Abandons the session without saving. Also invoked on teardown via
    /// `Drop`, so navigating away always cancels the renewal timer and
    /// hands the lock back.
    pub fn cancel(&mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.closed {
            return;
        }
        if let Some(lock) = &self.lock {
            lock.release();
        }
        self.closed = true;
    }
}

impl Drop for NoteEditSession {
    fn drop(&mut self) {
        self.finish();
    }
}
