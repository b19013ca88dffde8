use std::sync::Arc;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use shared::domain::{Client, Owner, Task};
use storage::LocalStore;
use tracing::warn;

use crate::error::ClientResult;

pub const CLIENTS_KEY: &str = "ventas_clients";
pub const TOKEN_KEY: &str = "token";

pub fn tasks_key(owner: Owner) -> String {
    format!("ventas_tasks_{owner}")
}

/// Typed view over the local store: one JSON collection per key, plus the
/// raw token. Reads never fail; missing or unreadable snapshots are empty.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn LocalStore>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub async fn clients(&self) -> Vec<Client> {
        self.read_collection(CLIENTS_KEY).await
    }

    pub async fn store_clients(&self, clients: &[Client]) -> ClientResult<()> {
        self.write_collection(CLIENTS_KEY, clients).await
    }

    pub async fn tasks(&self, owner: Owner) -> Vec<Task> {
        self.read_collection(&tasks_key(owner)).await
    }

    pub async fn store_tasks(&self, owner: Owner, tasks: &[Task]) -> ClientResult<()> {
        self.write_collection(&tasks_key(owner), tasks).await
    }

    pub async fn token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY).await {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to read persisted token");
                None
            }
        }
    }

    pub async fn store_token(&self, token: &str) -> ClientResult<()> {
        self.store.set(TOKEN_KEY, token).await?;
        Ok(())
    }

    pub async fn clear_token(&self) -> ClientResult<()> {
        self.store.remove(TOKEN_KEY).await?;
        Ok(())
    }

    async fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "failed to read local snapshot");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(key, error = %err, "discarding unreadable local snapshot");
            Vec::new()
        })
    }

    async fn write_collection<T: Serialize>(&self, key: &str, records: &[T]) -> ClientResult<()> {
        let raw = serde_json::to_string(records)
            .with_context(|| format!("failed to encode local snapshot '{key}'"))?;
        self.store.set(key, &raw).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
