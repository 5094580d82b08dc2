//! CLI configuration: a TOML file plus environment overrides.
//!
//! ```toml
//! endpoint = "https://lrs.example.com/xapi/"
//! user = "tom"
//! password = "1234"
//!
//! [options]
//! strictCallbacks = true
//! version = "1.0.3"
//! ```
//!
//! `XAPI_ENDPOINT`, `XAPI_USER`, `XAPI_PASSWORD` and `XAPI_TOKEN` override the
//! corresponding file values. A token, when present, takes precedence over a
//! user/password pair.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use protocol::{ClientContext, ClientOptions, Credentials};
use serde::Deserialize;

/// Config file used when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = ".xapi/config.toml";

/// Raw CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Record-store endpoint URL.
    pub endpoint: Option<String>,
    /// Basic-auth user.
    pub user: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Complete `Authorization` header value.
    pub token: Option<String>,
    /// Named client options; unrecognised names are ignored.
    pub options: toml::Table,
}

impl CliConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        toml::from_str(source).context("invalid configuration file")
    }

    /// Loads the configuration file.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
    /// read if present and an empty configuration is used otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    tracing::debug!("no configuration file; using environment only");
                    return Ok(Self::default());
                }
                default
            }
        };
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read configuration file {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("in configuration file {}", path.display()))
    }

    /// Applies `XAPI_*` overrides read through `lookup`.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let overrides = [
            ("XAPI_ENDPOINT", &mut self.endpoint),
            ("XAPI_USER", &mut self.user),
            ("XAPI_PASSWORD", &mut self.password),
            ("XAPI_TOKEN", &mut self.token),
        ];
        for (name, slot) in overrides {
            if let Some(value) = lookup(name).filter(|value| !value.is_empty()) {
                *slot = Some(value);
            }
        }
        self
    }

    /// Resolves the credentials to use.
    pub fn credentials(&self) -> Credentials {
        match (&self.token, &self.user) {
            (Some(token), _) => Credentials::Token(token.clone()),
            (None, Some(user)) => Credentials::Basic {
                user: user.clone(),
                password: self.password.clone().unwrap_or_default(),
            },
            (None, None) => Credentials::Anonymous,
        }
    }

    /// Resolves the client options from the `[options]` table.
    pub fn client_options(&self) -> anyhow::Result<ClientOptions> {
        let named = self
            .options
            .iter()
            .map(|(name, value)| {
                serde_json::to_value(value)
                    .map(|value| (name.as_str(), value))
                    .with_context(|| format!("option {name} is not representable as JSON"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(ClientOptions::from_named(named))
    }

    /// Builds the client context.
    pub fn client_context(&self) -> anyhow::Result<ClientContext> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| anyhow!("no endpoint configured (set `endpoint` or XAPI_ENDPOINT)"))?;
        Ok(ClientContext::new(endpoint)?
            .with_credentials(self.credentials())
            .with_options(self.client_options()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
endpoint = "https://lrs.example.com/xapi"
user = "tom"
password = "1234"

[options]
strictCallbacks = true
version = "1.0.1"
colour = "blue"
"#;

    #[test]
    fn file_values_build_a_context() {
        let config = CliConfig::from_toml_str(SAMPLE).unwrap();
        let context = config.client_context().unwrap();

        assert_eq!(context.endpoint().as_str(), "https://lrs.example.com/xapi/");
        assert_eq!(
            context.credentials(),
            &Credentials::Basic {
                user: "tom".into(),
                password: "1234".into()
            }
        );
        assert!(context.options().strict_callbacks);
        assert_eq!(context.options().version, "1.0.1");
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("XAPI_ENDPOINT", "http://localhost:8080/xapi/"),
            ("XAPI_TOKEN", "Bearer abc"),
            ("XAPI_USER", ""),
        ]
        .into_iter()
        .collect();

        let config = CliConfig::from_toml_str(SAMPLE)
            .unwrap()
            .with_env_overrides(|name| env.get(name).map(|value| value.to_string()));

        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:8080/xapi/"));
        assert_eq!(config.user.as_deref(), Some("tom"));
        assert_eq!(config.credentials(), Credentials::Token("Bearer abc".into()));
    }

    #[test]
    fn missing_or_invalid_endpoint_is_an_error() {
        assert!(CliConfig::default().client_context().is_err());

        let config = CliConfig {
            endpoint: Some("not a url".into()),
            ..CliConfig::default()
        };
        assert!(config.client_context().is_err());
    }

    #[test]
    fn anonymous_without_user_or_token() {
        let config = CliConfig::from_toml_str(r#"endpoint = "http://lrs.test/""#).unwrap();
        assert_eq!(config.credentials(), Credentials::Anonymous);
        assert_eq!(config.client_options().unwrap(), ClientOptions::default());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = CliConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("cannot read configuration file"));
    }
}
