//! Document persistence
//!
//! Each profile owns three JSON documents (bank, difficulty, quests). A
//! store only moves bytes; decoding lives here so a corrupt or too-new
//! document falls back to a fresh default instead of failing the session.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::error::StoreError;

/// The documents a profile persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Bank,
    Difficulty,
    Quests,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Bank, DocumentKind::Difficulty, DocumentKind::Quests];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Bank => "bank",
            DocumentKind::Difficulty => "difficulty",
            DocumentKind::Quests => "quests",
        }
    }
}

/// Whole-document load/save keyed by profile. A save replaces the previous
/// document atomically; readers see either the old or the new bytes.
pub trait DocumentStore: Send + Sync {
    fn load(&self, profile_id: &str, kind: DocumentKind) -> Result<Option<Vec<u8>>, StoreError>;

    fn save(&self, profile_id: &str, kind: DocumentKind, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Decode a document, or fall back to the default when it is malformed or
/// written by a newer version
pub fn decode_or_default<T>(kind: DocumentKind, bytes: &[u8], current_version: u32) -> T
where
    T: DeserializeOwned + Default,
{
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            error!(document = kind.as_str(), error = %e, "Corrupt document, resetting to default");
            return T::default();
        }
    };

    let version = value.get("version").and_then(serde_json::Value::as_u64);
    match version {
        Some(v) if v <= u64::from(current_version) => {}
        other => {
            error!(
                document = kind.as_str(),
                version = ?other,
                supported = current_version,
                "Unsupported document version, resetting to default"
            );
            return T::default();
        }
    }

    match serde_json::from_value(value) {
        Ok(doc) => doc,
        Err(e) => {
            error!(document = kind.as_str(), error = %e, "Corrupt document, resetting to default");
            T::default()
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Keeps documents in memory; for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<(String, DocumentKind), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, profile_id: &str, kind: DocumentKind) -> Result<Option<Vec<u8>>, StoreError> {
        let documents = self.documents.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(documents.get(&(profile_id.to_string(), kind)).cloned())
    }

    fn save(&self, profile_id: &str, kind: DocumentKind, bytes: &[u8]) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        documents.insert((profile_id.to_string(), kind), bytes.to_vec());
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

/// One directory per profile under `root`, one JSON file per document
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_dir(&self, profile_id: &str) -> PathBuf {
        self.root.join(encode_profile_id(profile_id))
    }

    fn document_path(&self, profile_id: &str, kind: DocumentKind) -> PathBuf {
        self.profile_dir(profile_id).join(format!("{}.json", kind.as_str()))
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_-]` so each profile id
/// maps to its own single path segment. The empty id becomes `%`.
fn encode_profile_id(profile_id: &str) -> String {
    if profile_id.is_empty() {
        return "%".to_string();
    }
    let mut encoded = String::with_capacity(profile_id.len());
    for byte in profile_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl DocumentStore for FileStore {
    fn load(&self, profile_id: &str, kind: DocumentKind) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.document_path(profile_id, kind);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn save(&self, profile_id: &str, kind: DocumentKind, bytes: &[u8]) -> Result<(), StoreError> {
        let dir = self.profile_dir(profile_id);
        std::fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        let path = self.document_path(profile_id, kind);

        // Write beside the target, then rename over it
        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| io_error(&dir, e))?;
        temp.write_all(bytes).map_err(|e| io_error(temp.path(), e))?;
        temp.as_file().sync_all().map_err(|e| io_error(temp.path(), e))?;
        temp.persist(&path).map_err(|source| StoreError::Persist {
            path: path.display().to_string(),
            source,
        })?;

        debug!(profile_id, document = kind.as_str(), bytes = bytes.len(), "Saved document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::{DIFFICULTY_DOC_VERSION, DifficultyState};
    use crate::subject::{DifficultyTier, Subject};
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        assert_eq!(store.load("kid-1", DocumentKind::Bank).unwrap(), None);
        store.save("kid-1", DocumentKind::Bank, b"{\"version\":1}").unwrap();
        store.save("kid-1", DocumentKind::Bank, b"{\"version\":1,\"x\":2}").unwrap();
        assert_eq!(
            store.load("kid-1", DocumentKind::Bank).unwrap().as_deref(),
            Some(&b"{\"version\":1,\"x\":2}"[..])
        );
        assert_eq!(store.load("kid-2", DocumentKind::Bank).unwrap(), None);

        // Only the document itself is left behind, no temp files
        let files = std::fs::read_dir(temp_dir.path().join("kid-1")).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_profile_id_stays_inside_root() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        store.save("../escape", DocumentKind::Quests, b"{}").unwrap();
        assert!(temp_dir.path().join("%2E%2E%2Fescape").join("quests.json").exists());
    }

    #[test]
    fn test_similar_profile_ids_do_not_share_documents() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        let ids = ["a.b", "a b", "a_b", "a%2Eb", ""];
        for (i, id) in ids.iter().enumerate() {
            store.save(id, DocumentKind::Bank, format!("{}", i).as_bytes()).unwrap();
        }
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(store.load(id, DocumentKind::Bank).unwrap(), Some(format!("{}", i).into_bytes()));
        }
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), ids.len());
        assert_eq!(encode_profile_id("kid-1_x"), "kid-1_x");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.save("p", DocumentKind::Difficulty, b"abc").unwrap();
        assert_eq!(store.load("p", DocumentKind::Difficulty).unwrap(), Some(b"abc".to_vec()));
        assert_eq!(store.load("p", DocumentKind::Quests).unwrap(), None);
    }

    #[test]
    fn test_corrupt_document_resets() {
        let state: DifficultyState = decode_or_default(DocumentKind::Difficulty, b"{not json", DIFFICULTY_DOC_VERSION);
        assert_eq!(state, DifficultyState::default());

        let future = format!("{{\"version\":{}}}", DIFFICULTY_DOC_VERSION + 1);
        let state: DifficultyState = decode_or_default(DocumentKind::Difficulty, future.as_bytes(), DIFFICULTY_DOC_VERSION);
        assert_eq!(state, DifficultyState::default());

        let wrong_shape = br#"{"version":1,"tiers":{"math":"impossible"}}"#;
        let state: DifficultyState = decode_or_default(DocumentKind::Difficulty, wrong_shape, DIFFICULTY_DOC_VERSION);
        assert_eq!(state, DifficultyState::default());
    }

    #[test]
    fn test_valid_document_decodes() {
        let json = br#"{"version":1,"tiers":{"reading":"medium"}}"#;
        let state: DifficultyState = decode_or_default(DocumentKind::Difficulty, json, DIFFICULTY_DOC_VERSION);
        assert_eq!(state.tiers.get(&Subject::Reading), Some(&DifficultyTier::Medium));
    }
}
