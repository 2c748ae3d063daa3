/// `load_config` module: reads the YAML provider list and resolves each provider's credential.
///
/// This is the only place where untrusted YAML is parsed. Provider settings are
/// deserialised straight into [`ProviderConfig`]; the `credentials` block of each
/// entry says where the secret material lives.
///
/// # Credential sources
/// - `from: file`: a YAML mapping of secret key to string value.
/// - `from: env`: a mapping of secret key to the environment variable holding it.
///
/// A credential that cannot be resolved does not fail loading. It is carried as
/// [`CredentialLookup::Unavailable`] so validation reports it together with every
/// other problem of that provider.
use anyhow::Result;
use group_sync_core::config::ProviderConfig;
use group_sync_core::contract::Credential;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "from", rename_all = "lowercase")]
pub enum CredentialSource {
    File { path: PathBuf },
    Env { vars: BTreeMap<String, String> },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderEntry {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub credentials: Option<CredentialSource>,
}

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

#[derive(Debug)]
pub enum CredentialLookup {
    Found(Credential),
    Unavailable(String),
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    info!(config_path = ?path_ref, providers = config.providers.len(), "Parsed config YAML successfully");
    Ok(config)
}

/// Resolve the secret material of one provider entry.
pub fn load_credential(source: Option<&CredentialSource>) -> CredentialLookup {
    match source {
        None => CredentialLookup::Found(Credential::new()),
        Some(CredentialSource::File { path }) => credential_from_file(path),
        Some(CredentialSource::Env { vars }) => credential_from_env(vars),
    }
}

fn credential_from_file(path: &Path) -> CredentialLookup {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(credential_path = ?path, error = %e, "Failed to read credential file");
            return CredentialLookup::Unavailable(format!("cannot read {}: {e}", path.display()));
        }
    };
    match serde_yaml::from_str::<BTreeMap<String, String>>(&content) {
        Ok(values) => CredentialLookup::Found(values.into_iter().collect()),
        Err(e) => {
            warn!(credential_path = ?path, error = %e, "Failed to parse credential file");
            CredentialLookup::Unavailable(format!("cannot parse {}: {e}", path.display()))
        }
    }
}

fn credential_from_env(vars: &BTreeMap<String, String>) -> CredentialLookup {
    let mut credential = Credential::new();
    let mut missing = Vec::new();
    for (key, var) in vars {
        match std::env::var(var) {
            Ok(value) => credential.insert(key.clone(), value.into_bytes()),
            Err(_) => missing.push(var.as_str()),
        }
    }
    if missing.is_empty() {
        CredentialLookup::Found(credential)
    } else {
        warn!(missing = ?missing, "Credential environment variables not set");
        CredentialLookup::Unavailable(format!(
            "environment variables not set: {}",
            missing.join(", ")
        ))
    }
}
