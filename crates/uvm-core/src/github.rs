//! GitHub public key and profile lookup.

use crate::errors::UvmError;
use crate::settings::Settings;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GithubProfile {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubKey {
    key: String,
}

/// GitHub login rules: 1-39 ASCII letters, digits or single hyphens, not
/// starting or ending with a hyphen.
pub fn valid_github_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 39
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
}

fn check_username(username: &str) -> Result<()> {
    if valid_github_username(username) {
        Ok(())
    } else {
        Err(UvmError::ValidationFailed(format!("invalid GitHub username {:?}", username)).into())
    }
}

/// Source of GitHub data. Each lookup fails independently.
pub trait GithubFetch: Send + Sync {
    fn fetch_ssh_keys(&self, username: &str) -> Result<Vec<String>>;
    fn fetch_profile(&self, username: &str) -> Result<GithubProfile>;
}

pub struct GithubClient {
    client: Client,
    base_url: String,
}

impl GithubClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("uvm/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(&settings.github_api_url, settings.github_timeout_secs)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, username: &str, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .with_context(|| format!("GitHub request failed: {}", url))?;
        match resp.status() {
            StatusCode::NOT_FOUND => Err(UvmError::GithubUserNotFound(username.to_string()).into()),
            status if !status.is_success() => Err(UvmError::GithubStatus {
                status: status.as_u16(),
            }
            .into()),
            _ => resp
                .json::<T>()
                .with_context(|| format!("Unexpected GitHub response from {}", url)),
        }
    }
}

impl GithubFetch for GithubClient {
    fn fetch_ssh_keys(&self, username: &str) -> Result<Vec<String>> {
        check_username(username)?;
        let keys: Vec<GithubKey> = self.get_json(username, &format!("/users/{}/keys", username))?;
        Ok(keys.into_iter().map(|k| k.key.trim().to_string()).collect())
    }

    fn fetch_profile(&self, username: &str) -> Result<GithubProfile> {
        check_username(username)?;
        self.get_json(username, &format!("/users/{}", username))
    }
}

/// Outcome of looking up one GitHub user: whatever succeeded plus per-call errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GithubImport {
    pub username: String,
    pub keys: Vec<String>,
    pub profile: Option<GithubProfile>,
    pub keys_err: Option<String>,
    pub profile_err: Option<String>,
}

impl GithubImport {
    /// Warning line for the SSH phase, if anything failed.
    pub fn warning(&self) -> Option<String> {
        match (&self.keys_err, &self.profile_err) {
            (None, None) => None,
            (Some(k), None) => Some(format!("Could not import GitHub keys: {}", k)),
            (None, Some(p)) => Some(format!("Could not fetch GitHub profile: {}", p)),
            (Some(k), Some(_)) => Some(format!("GitHub lookup failed: {}", k)),
        }
    }
}

/// Fetch keys and profile for `username`, recording failures instead of returning them.
pub fn import_user(fetcher: &dyn GithubFetch, username: &str) -> GithubImport {
    let mut import = GithubImport {
        username: username.to_string(),
        ..Default::default()
    };
    match fetcher.fetch_ssh_keys(username) {
        Ok(keys) => import.keys = keys,
        Err(err) => {
            log::warn!("GitHub key import for {} failed: {:#}", username, err);
            import.keys_err = Some(err.to_string());
        }
    }
    match fetcher.fetch_profile(username) {
        Ok(profile) => import.profile = Some(profile),
        Err(err) => {
            log::warn!("GitHub profile fetch for {} failed: {:#}", username, err);
            import.profile_err = Some(err.to_string());
        }
    }
    import
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;

    #[test]
    fn fetches_keys_and_profile() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users/octo/keys");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{"id":1,"key":"ssh-ed25519 AAAAone"},{"id":2,"key":"ssh-rsa AAAAtwo "}]"#);
        });
        server.mock(|when, then| {
            when.method(GET).path("/users/octo");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"login":"octo","name":"Octo Cat","email":null}"#);
        });

        let client = GithubClient::new(&server.base_url(), 5).unwrap();
        let keys = client.fetch_ssh_keys("octo").unwrap();
        assert_eq!(keys, vec!["ssh-ed25519 AAAAone", "ssh-rsa AAAAtwo"]);

        let profile = client.fetch_profile("octo").unwrap();
        assert_eq!(profile.name.as_deref(), Some("Octo Cat"));
        assert_eq!(profile.email, None);
    }

    #[test]
    fn missing_user_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users/ghost/keys");
            then.status(404);
        });
        let client = GithubClient::new(&server.base_url(), 5).unwrap();
        let err = client.fetch_ssh_keys("ghost").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UvmError>(),
            Some(UvmError::GithubUserNotFound(user)) if user == "ghost"
        ));
    }

    #[test]
    fn usernames_follow_github_rules() {
        for ok in ["octocat", "a", "octo-cat", "A1-b2"] {
            assert!(valid_github_username(ok), "{}", ok);
        }
        let long = "a".repeat(40);
        for bad in ["", "a/b", "x?y", "-lead", "trail-", "dou--ble", "../admin", long.as_str()] {
            assert!(!valid_github_username(bad), "{}", bad);
        }
    }

    #[test]
    fn path_like_usernames_never_reach_the_api() {
        let server = MockServer::start();
        let any = server.mock(|when, then| {
            when.method(GET);
            then.status(200).body("[]");
        });
        let client = GithubClient::new(&server.base_url(), 5).unwrap();
        let err = client.fetch_ssh_keys("octo/../../orgs").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UvmError>(),
            Some(UvmError::ValidationFailed(_))
        ));
        assert!(client.fetch_profile("x?y").is_err());
        any.assert_hits(0);
    }

    struct KeysDown;

    impl GithubFetch for KeysDown {
        fn fetch_ssh_keys(&self, _username: &str) -> Result<Vec<String>> {
            anyhow::bail!("connection refused")
        }

        fn fetch_profile(&self, username: &str) -> Result<GithubProfile> {
            Ok(GithubProfile {
                login: username.to_string(),
                name: Some("Octo".to_string()),
                email: Some("octo@example.com".to_string()),
            })
        }
    }

    #[test]
    fn import_keeps_partial_results() {
        let import = import_user(&KeysDown, "octo");
        assert!(import.keys.is_empty());
        assert_eq!(import.keys_err.as_deref(), Some("connection refused"));
        assert!(import.profile.is_some());
        assert!(import.warning().unwrap().contains("keys"));
    }
}
