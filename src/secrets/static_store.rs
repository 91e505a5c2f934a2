//! secrets::static_store
//!
//! In-memory credential source.
//!
//! Used by the CLI when the token comes from the environment, and by tests.
//! Every lookup is recorded so tests can assert which secrets were read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{CredentialSource, SecretError, SecretRef};

/// Credential source backed by a fixed map.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<(SecretRef, String), String>,
    lookups: Arc<Mutex<Vec<SecretRef>>>,
}

// Custom Debug so stored values never reach logs
impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self
            .values
            .keys()
            .map(|(secret, key)| format!("{}#{}", secret, key))
            .collect();
        keys.sort();
        f.debug_struct("StaticCredentials")
            .field("keys", &keys)
            .finish()
    }
}

impl StaticCredentials {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for `key` in `namespace/name`.
    pub fn with_secret(mut self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.values.insert(
            (SecretRef::new(namespace, name), key.to_string()),
            value.to_string(),
        );
        self
    }

    /// Secrets that have been looked up, in order.
    pub fn lookups(&self) -> Vec<SecretRef> {
        self.lookups
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn get(&self, secret: &SecretRef, key: &str) -> Result<Option<String>, SecretError> {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(secret.clone());
        }
        Ok(self
            .values
            .get(&(secret.clone(), key.to_string()))
            .cloned())
    }
}
