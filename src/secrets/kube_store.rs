//! secrets::kube_store
//!
//! Credential source reading Kubernetes `Secret` objects.
//!
//! Values are looked up in `data` (base64-decoded by the client) and then
//! in `stringData`. A secret that does not exist is `Ok(None)`, matching
//! the [`CredentialSource`] contract; API failures are errors.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};

use super::traits::{CredentialSource, SecretError, SecretRef};

/// Reads credentials from cluster secrets.
#[derive(Clone)]
pub struct KubeSecretSource {
    client: Client,
}

impl std::fmt::Debug for KubeSecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretSource").finish_non_exhaustive()
    }
}

impl KubeSecretSource {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient kubeconfig or in-cluster environment.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::ProviderNotAvailable` if no cluster
    /// configuration can be inferred.
    pub async fn try_default() -> Result<Self, SecretError> {
        let client = Client::try_default()
            .await
            .map_err(|e| SecretError::ProviderNotAvailable(e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl CredentialSource for KubeSecretSource {
    async fn get(&self, secret: &SecretRef, key: &str) -> Result<Option<String>, SecretError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &secret.namespace);
        let found = api.get_opt(&secret.name).await.map_err(|e| match e {
            kube::Error::Api(ref resp) if resp.code == 403 => {
                SecretError::PermissionDenied(format!("secret {}: {}", secret, resp.message))
            }
            other => SecretError::ReadError(format!("secret {}: {}", secret, other)),
        })?;

        let Some(found) = found else {
            tracing::debug!(%secret, "secret does not exist");
            return Ok(None);
        };

        if let Some(bytes) = found.data.as_ref().and_then(|d| d.get(key)) {
            let value = String::from_utf8(bytes.0.clone()).map_err(|_| {
                SecretError::ReadError(format!("key '{}' in secret {} is not UTF-8", key, secret))
            })?;
            return Ok(Some(value));
        }

        Ok(found
            .string_data
            .as_ref()
            .and_then(|d| d.get(key))
            .cloned())
    }
}
