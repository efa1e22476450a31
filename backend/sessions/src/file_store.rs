//! JSON file store with atomic replace.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use proglot_core::{Conversation, ConversationStore, Language, Loaded, StorageError};

/// File name holding the history for `language` (alphanumeric code only).
pub fn history_file_name(language: Language) -> String {
    let safe: String = language
        .code()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!("history_{safe}.json")
}

/// File name used by the earlier app, which kept capitalised codes
/// (`history_It.json`, `history_Jp.json`).
pub fn legacy_history_file_name(language: Language) -> String {
    let code = match language {
        Language::Japanese => "Jp",
        Language::Italian => "It",
        Language::Spanish => "Es",
        Language::German => "De",
        Language::French => "Fr",
        Language::English => "En",
    };
    format!("history_{code}.json")
}

/// Stores each language's conversation in `<root>/history_<code>.json`.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, language: Language) -> PathBuf {
        self.root.join(history_file_name(language))
    }

    fn temp_path(path: &Path) -> PathBuf {
        path.with_extension("json.tmp")
    }

    pub fn legacy_path_for(&self, language: Language) -> PathBuf {
        self.root.join(legacy_history_file_name(language))
    }

    fn corrupt_path(path: &Path) -> PathBuf {
        path.with_extension("json.corrupt")
    }

    /// First of `.json.corrupt`, `.json.corrupt.1`, ... that does not exist yet.
    async fn free_corrupt_path(path: &Path) -> PathBuf {
        let base = Self::corrupt_path(path);
        let mut candidate = base.clone();
        let mut n = 1;
        while fs::try_exists(&candidate).await.unwrap_or(false) {
            let mut name = base.clone().into_os_string();
            name.push(format!(".{n}"));
            candidate = PathBuf::from(name);
            n += 1;
        }
        candidate
    }

    /// Move an unreadable record aside so a later save cannot clobber it.
    /// Earlier quarantined files are never replaced.
    async fn quarantine(path: &Path) -> Option<PathBuf> {
        let aside = Self::free_corrupt_path(path).await;
        match fs::rename(path, &aside).await {
            Ok(()) => Some(aside),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to move corrupt history aside");
                None
            }
        }
    }

    async fn corrupt(path: &Path, reason: &str) -> Loaded {
        let aside = Self::quarantine(path).await;
        let warning = match &aside {
            Some(aside) => format!(
                "history at {} is unreadable ({reason}); starting fresh, old file kept at {}",
                path.display(),
                aside.display()
            ),
            None => format!(
                "history at {} is unreadable ({reason}); starting fresh",
                path.display()
            ),
        };
        warn!(path = %path.display(), reason = %reason, "Corrupt history file");
        Loaded {
            conversation: Conversation::new(),
            warning: Some(warning),
        }
    }

    async fn read_failure(path: PathBuf, e: std::io::Error) -> Result<Loaded, StorageError> {
        if e.kind() == ErrorKind::InvalidData {
            return Ok(Self::corrupt(&path, "not valid UTF-8").await);
        }
        Err(StorageError::Read { path, source: e })
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

#[async_trait]
impl ConversationStore for JsonFileStore {
    async fn load(&self, language: Language) -> Result<Loaded, StorageError> {
        let mut path = self.path_for(language);

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let legacy = self.legacy_path_for(language);
                match fs::read_to_string(&legacy).await {
                    Ok(raw) => {
                        info!(path = %legacy.display(), "Reading history from legacy file name");
                        path = legacy;
                        raw
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        debug!(path = %path.display(), "No history yet; starting empty");
                        return Ok(Loaded::default());
                    }
                    Err(e) => return Self::read_failure(legacy, e).await,
                }
            }
            Err(e) => return Self::read_failure(path, e).await,
        };

        match serde_json::from_str::<Conversation>(&raw) {
            Ok(conversation) => {
                info!(
                    path = %path.display(),
                    turns = conversation.len(),
                    "Loaded history"
                );
                Ok(Loaded::clean(conversation))
            }
            Err(e) => Ok(Self::corrupt(&path, &e.to_string()).await),
        }
    }

    /// Write to a temp file in the same directory, sync it, then rename it
    /// over the target. On any failure the previous record is untouched.
    async fn save(
        &self,
        language: Language,
        conversation: &Conversation,
    ) -> Result<(), StorageError> {
        let path = self.path_for(language);

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::Write {
                path: self.root.clone(),
                source,
            })?;

        let json = serde_json::to_vec_pretty(conversation).map_err(|source| {
            StorageError::Serialize {
                path: path.clone(),
                source,
            }
        })?;

        let tmp_path = Self::temp_path(&path);
        if let Err(source) = write_synced(&tmp_path, &json).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Write {
                path: tmp_path,
                source,
            });
        }

        if let Err(source) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Write { path, source });
        }

        debug!(path = %path.display(), turns = conversation.len(), "Saved history");
        Ok(())
    }

    /// Remove the record, including one under the legacy file name, so a
    /// cleared history is not picked up again on the next load.
    async fn clear(&self, language: Language) -> Result<bool, StorageError> {
        let mut removed = false;
        for path in [self.path_for(language), self.legacy_path_for(language)] {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    info!(path = %path.display(), "Cleared history");
                    removed = true;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(StorageError::Remove { path, source }),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proglot_core::{Role, Turn};

    fn sample(n: usize) -> Conversation {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("question {i}"))
                } else {
                    Turn::assistant(format!("answer {i}"))
                }
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[tokio::test]
    async fn missing_record_loads_empty_without_warning() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let loaded = store.load(Language::Italian).await.unwrap();
        assert!(loaded.conversation.is_empty());
        assert!(loaded.warning.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        let mut convo = sample(5);
        convo.push(Turn::untimed(Role::User, "ünïcödé ✓ こんにちは"));

        store.save(Language::Japanese, &convo).await.unwrap();
        let loaded = store.load(Language::Japanese).await.unwrap();

        assert_eq!(loaded.conversation, convo);
        assert!(loaded.warning.is_none());
        assert!(!JsonFileStore::temp_path(&store.path_for(Language::Japanese)).exists());
    }

    #[tokio::test]
    async fn saving_one_language_leaves_others_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let german = sample(3);
        store.save(Language::German, &german).await.unwrap();
        let before = std::fs::read(store.path_for(Language::German)).unwrap();

        store.save(Language::French, &sample(8)).await.unwrap();
        store.save(Language::French, &sample(9)).await.unwrap();

        let after = std::fs::read(store.path_for(Language::German)).unwrap();
        assert_eq!(before, after);
        assert_ne!(
            store.path_for(Language::German),
            store.path_for(Language::French)
        );
        assert_eq!(store.load(Language::French).await.unwrap().conversation.len(), 9);
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let original = sample(4);
        store.save(Language::Spanish, &original).await.unwrap();

        // Block the temp path so the write fails before the rename.
        let tmp = JsonFileStore::temp_path(&store.path_for(Language::Spanish));
        std::fs::create_dir(&tmp).unwrap();

        let err = store.save(Language::Spanish, &sample(10)).await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));

        let loaded = store.load(Language::Spanish).await.unwrap();
        assert_eq!(loaded.conversation, original);
        assert!(loaded.warning.is_none());
    }

    #[tokio::test]
    async fn corrupt_record_loads_empty_with_warning_and_is_kept_aside() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let path = store.path_for(Language::English);
        std::fs::write(&path, b"[{\"role\": \"user\", \"text\": ").unwrap();

        let loaded = store.load(Language::English).await.unwrap();
        assert!(loaded.conversation.is_empty());
        assert!(loaded.warning.unwrap().contains("unreadable"));

        let aside = JsonFileStore::corrupt_path(&path);
        assert!(aside.exists());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn repeated_corruption_keeps_every_quarantined_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let path = store.path_for(Language::English);

        std::fs::write(&path, "FIRST-CORRUPT-HISTORY").unwrap();
        store.load(Language::English).await.unwrap();
        std::fs::write(&path, "SECOND-CORRUPT").unwrap();
        let second = store.load(Language::English).await.unwrap();

        let first_aside = JsonFileStore::corrupt_path(&path);
        let second_aside = dir.path().join("history_en.json.corrupt.1");
        assert_eq!(
            std::fs::read_to_string(&first_aside).unwrap(),
            "FIRST-CORRUPT-HISTORY"
        );
        assert_eq!(
            std::fs::read_to_string(&second_aside).unwrap(),
            "SECOND-CORRUPT"
        );
        assert!(second
            .warning
            .unwrap()
            .contains("history_en.json.corrupt.1"));
    }

    #[tokio::test]
    async fn reads_history_saved_under_legacy_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(
            store.legacy_path_for(Language::Japanese),
            r#"[{"role":"user","parts":["こんにちは"]},{"role":"model","parts":["こんにちは！"]}]"#,
        )
        .unwrap();

        let loaded = store.load(Language::Japanese).await.unwrap();
        assert!(loaded.warning.is_none());
        assert_eq!(loaded.conversation.len(), 2);
        assert_eq!(loaded.conversation.turns()[1].role(), Role::Assistant);

        let mut convo = loaded.conversation;
        convo.push(Turn::user("元気です"));
        store.save(Language::Japanese, &convo).await.unwrap();
        assert_eq!(store.load(Language::Japanese).await.unwrap().conversation.len(), 3);

        assert!(store.clear(Language::Japanese).await.unwrap());
        assert!(!store.legacy_path_for(Language::Japanese).exists());
        assert!(store.load(Language::Japanese).await.unwrap().conversation.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_only_that_language() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.save(Language::Italian, &sample(2)).await.unwrap();
        store.save(Language::German, &sample(2)).await.unwrap();

        assert!(store.clear(Language::Italian).await.unwrap());
        assert!(!store.clear(Language::Italian).await.unwrap());
        assert!(store.load(Language::Italian).await.unwrap().conversation.is_empty());
        assert_eq!(store.load(Language::German).await.unwrap().conversation.len(), 2);
    }

    #[test]
    fn file_names_follow_language_codes() {
        assert_eq!(history_file_name(Language::Italian), "history_it.json");
        assert_eq!(history_file_name(Language::Japanese), "history_ja.json");
        assert_eq!(legacy_history_file_name(Language::Japanese), "history_Jp.json");
        assert_eq!(legacy_history_file_name(Language::German), "history_De.json");
    }
}
