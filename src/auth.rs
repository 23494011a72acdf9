//! Authenticated HTTP client construction.
//!
//! Credential material arrives from the CLI (or environment) and is turned
//! into a preconfigured `reqwest::Client` here, once, at construction time.
//! Nothing downstream ever checks credential availability at runtime.

use crate::error::Result;
use anyhow::Context;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::time::Duration;

/// User agent sent on every request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Request timeout for registry listing and download calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Credential for the source registry.
#[derive(Debug, Clone)]
pub enum RegistryAuth {
    /// No credential; listing and download calls go out unauthenticated.
    Anonymous,
    /// Personal access token sent as Basic auth with an empty username.
    BasicPat(String),
    /// Bearer token.
    Bearer(String),
    /// Repository API key sent as the `X-JFrog-Art-Api` header.
    ApiKey(String),
}

impl RegistryAuth {
    /// Build a client with this credential baked into its default headers.
    pub fn client(&self) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        match self {
            RegistryAuth::Anonymous => {}
            RegistryAuth::BasicPat(pat) => {
                let token =
                    base64::engine::general_purpose::STANDARD.encode(format!(":{pat}"));
                let mut value = HeaderValue::from_str(&format!("Basic {token}"))
                    .context("registry PAT is not a valid header value")?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            RegistryAuth::Bearer(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("registry token is not a valid header value")?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            RegistryAuth::ApiKey(key) => {
                let mut value = HeaderValue::from_str(key)
                    .context("registry API key is not a valid header value")?;
                value.set_sensitive(true);
                headers.insert("X-JFrog-Art-Api", value);
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("could not build registry HTTP client")?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_client_builds() {
        assert!(RegistryAuth::Anonymous.client().is_ok());
    }

    #[test]
    fn pat_client_builds() {
        assert!(RegistryAuth::BasicPat("secret-pat".to_string()).client().is_ok());
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let auth = RegistryAuth::ApiKey("bad\nkey".to_string());
        assert!(auth.client().is_err());
    }
}
