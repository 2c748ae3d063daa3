//! Concrete provider families and the helpers they share.
//!
//! - [`keycloak`]: realm-based identity server with nested sub-groups.
//! - [`azure`]: Microsoft Graph directory with base-group scoped search.
//!
//! [`build_provider`] picks the implementation for a [`ProviderConfig`].

pub mod azure;
pub mod keycloak;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::{ProviderConfig, ProviderKind};
use crate::contract::Provider;
use crate::error::{AuthenticationError, TransportError, ValidationError};

pub use azure::AzureProvider;
pub use keycloak::KeycloakProvider;

pub fn build_provider(config: ProviderConfig) -> Box<dyn Provider> {
    config.trace_loaded();
    match config.kind {
        ProviderKind::Keycloak => Box::new(KeycloakProvider::new(config)),
        ProviderKind::Azure => Box::new(AzureProvider::new(config)),
    }
}

/// An absolute http(s) URL with a host, or a validation error describing why not.
pub(crate) fn check_url(raw: &str) -> Option<ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    match Url::parse(raw) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            Some(invalid(format!("unsupported scheme '{}'", url.scheme())))
        }
        Ok(url) if url.host_str().is_none() => Some(invalid("missing host".to_string())),
        Ok(_) => None,
        Err(e) => Some(invalid(e.to_string())),
    }
}

pub(crate) fn http_client(
    insecure: bool,
    ca_pem: Option<&[u8]>,
) -> Result<reqwest::Client, AuthenticationError> {
    let mut builder = reqwest::Client::builder();
    if insecure {
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(pem) = ca_pem {
        let certificate = reqwest::Certificate::from_pem(pem)
            .map_err(|e| AuthenticationError::Client(format!("invalid CA certificate: {e}")))?;
        builder = builder.add_root_certificate(certificate);
    }
    builder
        .build()
        .map_err(|e| AuthenticationError::Client(e.to_string()))
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Send a token request once and extract the access token.
pub(crate) async fn request_token(
    request: reqwest::RequestBuilder,
) -> Result<String, AuthenticationError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthenticationError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

/// Send a request and decode its JSON body, turning non-success statuses into errors.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, TransportError> {
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await?;
    if !status.is_success() {
        tracing::error!(url = %url, status = %status, "Directory API returned error");
        return Err(TransportError::Status {
            url,
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_url_accepts_https_with_host() {
        assert!(check_url("https://keycloak.example.com").is_none());
    }

    #[test]
    fn check_url_rejects_relative_and_odd_schemes() {
        assert!(matches!(
            check_url("keycloak.example.com"),
            Some(ValidationError::InvalidUrl { .. })
        ));
        assert!(matches!(
            check_url("ftp://keycloak.example.com"),
            Some(ValidationError::InvalidUrl { .. })
        ));
    }
}
