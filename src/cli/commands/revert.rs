//! revert command - Move a template branch back one commit
//!
//! # Example
//!
//! ```bash
//! gitops-guard revert --uri https://github.com/acme/templates -n team-a --secret-ref gh-token
//! ```

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::args::RevertArgs;
use crate::core::config::Config;
use crate::core::types::GitOpsConfig;
use crate::forge::github::GitHubConnector;
use crate::revert::{RefResolver, RevertOptions};
use crate::secrets::{CredentialSource, KubeSecretSource, StaticCredentials};

/// Secret name used when the token comes from the environment.
fn env_secret_name(var: &str) -> String {
    format!("env-{}", var.to_ascii_lowercase().replace('_', "-"))
}

/// Run the revert command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn revert(config: &Config, args: RevertArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(revert_async(config, args))
}

async fn revert_async(config: &Config, args: RevertArgs) -> Result<()> {
    let mut options = RevertOptions::from_config(config);
    if args.branch.is_some() {
        options.branch = args.branch.clone();
    }
    options.verify_update |= args.verify;

    let (secret_ref, credentials): (Option<String>, Arc<dyn CredentialSource>) =
        match &args.token_env {
            Some(var) => {
                let name = env_secret_name(var);
                let mut creds = StaticCredentials::new();
                if let Ok(token) = std::env::var(var) {
                    creds = creds.with_secret(&args.namespace, &name, &options.token_key, &token);
                }
                (Some(name), Arc::new(creds))
            }
            None => {
                let source = KubeSecretSource::try_default()
                    .await
                    .context("cannot reach the cluster to read the credential secret")?;
                (args.secret_ref.clone(), Arc::new(source))
            }
        };

    let resource = GitOpsConfig::new(&args.name, &args.namespace, &args.uri, secret_ref);
    let resolver = RefResolver::new(Arc::new(GitHubConnector::from_config(config)), credentials)
        .with_options(options)
        .with_span(tracing::info_span!("revert", resource = %args.name));

    let outcome = resolver.revert_tip(&resource).await?;
    println!(
        "Reverted {} {} from {} to {}",
        outcome.repository,
        outcome.ref_name,
        outcome.from.short(7),
        outcome.to.short(7)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_secret_names_are_dns_like() {
        assert_eq!(env_secret_name("GITHUB_TOKEN"), "env-github-token");
    }
}
