use async_trait::async_trait;
use aurora_kernel::storage::{JsonStore, StoreError, StoreResult, validate_key};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

/// Volatile store for tests and ephemeral deployments.
#[derive(Default)]
pub struct InMemoryJsonStore {
    documents: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryJsonStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JsonStore for InMemoryJsonStore {
    async fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        validate_key(key)?;
        Ok(self.documents.read().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &Value) -> StoreResult<()> {
        validate_key(key)?;
        self.documents.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn append(&self, key: &str, value: Value) -> StoreResult<usize> {
        validate_key(key)?;
        let mut documents = self.documents.write();
        let doc = documents
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match doc {
            Value::Array(items) => {
                items.push(value);
                Ok(items.len())
            }
            _ => Err(StoreError::NotAnArray(key.to_string())),
        }
    }

    async fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.documents.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn append_creates_then_grows() {
        let store = InMemoryJsonStore::new();
        assert_eq!(store.append("results", json!(1)).await.unwrap(), 1);
        assert_eq!(store.append("results", json!(2)).await.unwrap(), 2);
        assert_eq!(
            store.read("results").await.unwrap(),
            Some(json!([1, 2]))
        );
        assert_eq!(store.list().await.unwrap(), vec!["results"]);
    }
}
