use crate::api::NoteService;
use crate::errors::{ClientError, ClientResult};
use crate::models::{Note, NoteVersion};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Keys under which older deployments wrap the version array.
const WRAPPER_KEYS: [&str; 3] = ["versions", "data", "result"];

/// Normalizes the version-list payload into a plain list. Accepts a bare
/// array or any of the legacy wrapper objects; every other shape yields an
/// empty list. Entries that fail the shape check (no numeric
/// `versionNumber`, missing content fields) are discarded, not fatal.
pub fn normalize_version_payload(payload: serde_json::Value) -> Vec<NoteVersion> {
    let entries = match payload {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Object(mut object) => {
            let wrapped = WRAPPER_KEYS
                .iter()
                .find_map(|key| match object.remove(*key) {
                    Some(serde_json::Value::Array(entries)) => Some(entries),
                    _ => None,
                });
            match wrapped {
                Some(entries) => entries,
                None => {
                    tracing::warn!("unrecognized version payload shape, treating as empty");
                    return Vec::new();
                }
            }
        }
        _ => {
            tracing::warn!("unrecognized version payload shape, treating as empty");
            return Vec::new();
        }
    };

    let total = entries.len();
    let versions: Vec<NoteVersion> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(version) => Some(version),
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed version entry");
                None
            }
        })
        .collect();

    if versions.len() != total {
        tracing::warn!(
            kept = versions.len(),
            received = total,
            "version list contained malformed entries"
        );
    }

    versions
}

/// Fetches and orders the immutable version list of one note, and drives
/// restore requests. History is append-only: restoring never rewrites it,
/// the server appends a fresh version with the restored content.
pub struct VersionHistoryStore {
    service: Arc<dyn NoteService>,
    versions: Vec<NoteVersion>,
}

impl VersionHistoryStore {
    pub fn new(service: Arc<dyn NoteService>) -> Self {
        Self {
            service,
            versions: Vec::new(),
        }
    }

    /// Loads the full version list. A note with no versions yet is not an
    /// error: `NotFound` resolves to an empty history.
    pub async fn load(&mut self, note_id: u64) -> ClientResult<&[NoteVersion]> {
        match self.service.list_versions(note_id).await {
            Ok(payload) => {
                self.versions = normalize_version_payload(payload);
            }
            Err(ClientError::NotFound(_)) => {
                self.versions.clear();
            }
            Err(err) => return Err(err),
        }

        Ok(&self.versions)
    }

    /// Versions ordered newest-first; the first element is the live one.
    pub fn sorted(&self) -> Vec<NoteVersion> {
        let mut ordered = self.versions.clone();
        ordered.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        ordered
    }

    pub fn latest(&self) -> Option<NoteVersion> {
        self.versions
            .iter()
            .max_by_key(|version| version.version_number)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Distinct authors across the history.
    pub fn contributors(&self) -> usize {
        self.versions
            .iter()
            .map(|version| version.created_by.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Asks the server to copy a historical version's content forward into
    /// a brand-new version. Deliberately not idempotent: each restore is a
    /// recorded edit, so repeating it appends again. The history is
    /// re-fetched so the local list tracks the server's counter.
    pub async fn restore(&mut self, note_id: u64, version_number: u32) -> ClientResult<Note> {
        let note = self.service.restore_version(note_id, version_number).await?;
        self.load(note_id).await?;
        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_version_payload;

    fn entry(version: u32) -> serde_json::Value {
        serde_json::json!({
            "versionNumber": version,
            "title": format!("title v{version}"),
            "body": format!("body v{version}"),
            "createdBy": "alice",
            "createdAt": "2025-03-01T10:00:00Z"
        })
    }

    #[test]
    fn accepts_bare_array_and_all_wrapper_shapes() {
        let bare = serde_json::json!([entry(1), entry(2)]);
        assert_eq!(normalize_version_payload(bare).len(), 2);

        for key in ["versions", "data", "result"] {
            let wrapped = serde_json::json!({ key: [entry(1)] });
            assert_eq!(normalize_version_payload(wrapped).len(), 1, "key {key}");
        }
    }

    #[test]
    fn discards_entries_without_numeric_version_number() {
        let payload = serde_json::json!([
            entry(1),
            {"versionNumber": "two", "title": "t", "body": "b", "createdBy": "a", "createdAt": "2025-03-01T10:00:00Z"},
            {"title": "no version at all"},
            entry(4),
        ]);

        let versions = normalize_version_payload(payload);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version_number, 1);
        assert_eq!(versions[1].version_number, 4);
    }

    #[test]
    fn unknown_shapes_become_empty_lists() {
        assert!(normalize_version_payload(serde_json::json!({"success": false})).is_empty());
        assert!(normalize_version_payload(serde_json::json!("weird")).is_empty());
        assert!(normalize_version_payload(serde_json::Value::Null).is_empty());
    }

    #[test]
    fn change_description_is_optional() {
        let payload = serde_json::json!([{
            "versionNumber": 3,
            "title": "t",
            "body": "b",
            "createdBy": "bob",
            "createdAt": "2025-03-01T10:00:00Z",
            "changeDescription": "fixed a typo"
        }]);

        let versions = normalize_version_payload(payload);
        assert_eq!(versions[0].change_description.as_deref(), Some("fixed a typo"));
    }
}
