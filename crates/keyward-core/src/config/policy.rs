//! Name and provider policy
//!
//! A [`Policy`] is the allow-list of providers plus the naming pattern a new
//! key must satisfy. Validation is side-effect free and runs before any
//! filesystem mutation.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::Config;
use crate::error::ConfigError;
use crate::manifest::Provider;

/// Pattern applied when the config file does not set one
pub const DEFAULT_NAME_PATTERN: &str = "^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$";

static DEFAULT_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_NAME_PATTERN).unwrap());

/// A key name or provider was rejected by policy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("Provider '{provider}' is not allowed (allowed: {})", .allowed.join(", "))]
    ProviderNotAllowed {
        provider: Provider,
        allowed: Vec<String>,
    },

    #[error("Key name '{name}' does not match pattern '{pattern}'")]
    NameMismatch { name: String, pattern: String },

    /// Names are file stems; they can never address another directory
    #[error("Key name '{name}' must be a plain file name")]
    PathSeparator { name: String },
}

/// Validated policy: a non-empty provider allow-list and a compiled name pattern
#[derive(Debug, Clone)]
pub struct Policy {
    allowed_providers: BTreeSet<Provider>,
    name_pattern: String,
    name_regex: Regex,
}

impl Policy {
    /// Build a policy, checking that it can ever accept anything.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Policy`] when `allowed_providers` is empty or
    /// `name_pattern` is not a valid regular expression.
    pub fn new(
        allowed_providers: impl IntoIterator<Item = Provider>,
        name_pattern: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let allowed_providers: BTreeSet<Provider> = allowed_providers.into_iter().collect();
        if allowed_providers.is_empty() {
            return Err(ConfigError::Policy(
                "allowed_providers must not be empty".into(),
            ));
        }

        let name_pattern = name_pattern.into();
        // Compile the raw pattern first so error positions refer to what the user wrote
        Regex::new(&name_pattern)
            .map_err(|e| ConfigError::Policy(format!("invalid name_pattern regex: {e}")))?;
        let name_regex = Regex::new(&format!("^(?:{name_pattern})$"))
            .map_err(|e| ConfigError::Policy(format!("invalid name_pattern regex: {e}")))?;

        Ok(Self {
            allowed_providers,
            name_pattern,
            name_regex,
        })
    }

    pub fn allowed_providers(&self) -> &BTreeSet<Provider> {
        &self.allowed_providers
    }

    pub fn name_pattern(&self) -> &str {
        &self.name_pattern
    }

    pub fn is_allowed(&self, provider: Provider) -> bool {
        self.allowed_providers.contains(&provider)
    }

    pub fn validate_provider(&self, provider: Provider) -> Result<(), PolicyError> {
        if self.is_allowed(provider) {
            return Ok(());
        }
        Err(PolicyError::ProviderNotAllowed {
            provider,
            allowed: self
                .allowed_providers
                .iter()
                .map(|p| p.as_str().to_string())
                .collect(),
        })
    }

    /// Anchored full match; a pattern matching only part of `name` fails.
    pub fn validate_name(&self, name: &str) -> Result<(), PolicyError> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
        {
            return Err(PolicyError::PathSeparator {
                name: name.to_string(),
            });
        }
        if !self.name_regex.is_match(name) {
            return Err(PolicyError::NameMismatch {
                name: name.to_string(),
                pattern: self.name_pattern.clone(),
            });
        }
        Ok(())
    }

    /// Provider first, then name.
    pub fn validate(&self, name: &str, provider: Provider) -> Result<(), PolicyError> {
        self.validate_provider(provider)?;
        self.validate_name(name)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_providers: Provider::ALL.into_iter().collect(),
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
            name_regex: DEFAULT_NAME_REGEX.clone(),
        }
    }
}

impl PartialEq for Policy {
    fn eq(&self, other: &Self) -> bool {
        self.allowed_providers == other.allowed_providers && self.name_pattern == other.name_pattern
    }
}

impl Eq for Policy {}

/// Check `name` and `provider` against the policy held by `config`.
pub fn validate(name: &str, provider: Provider, config: &Config) -> Result<(), PolicyError> {
    config.policy.validate(name, provider)
}
