use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use proglot_core::{Conversation, ConversationStore, Language, Loaded, StorageError};

/// Process-local store. Nothing survives the process.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<Language, Conversation>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored record, if any.
    pub async fn get(&self, language: Language) -> Option<Conversation> {
        self.records.read().await.get(&language).cloned()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn load(&self, language: Language) -> Result<Loaded, StorageError> {
        let conversation = self.get(language).await.unwrap_or_default();
        Ok(Loaded::clean(conversation))
    }

    async fn save(
        &self,
        language: Language,
        conversation: &Conversation,
    ) -> Result<(), StorageError> {
        self.records
            .write()
            .await
            .insert(language, conversation.clone());
        Ok(())
    }

    async fn clear(&self, language: Language) -> Result<bool, StorageError> {
        Ok(self.records.write().await.remove(&language).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proglot_core::Turn;

    #[tokio::test]
    async fn stores_languages_independently() {
        let store = InMemoryStore::new();
        let mut convo = Conversation::new();
        convo.push(Turn::user("Hallo"));

        store.save(Language::German, &convo).await.unwrap();

        assert_eq!(store.load(Language::German).await.unwrap().conversation, convo);
        assert!(store.load(Language::French).await.unwrap().conversation.is_empty());
        assert!(store.clear(Language::German).await.unwrap());
        assert!(store.get(Language::German).await.is_none());
    }
}
