//! Configuration management

use std::{env, fmt, fs, path::Path, time::Duration};

use base64::Engine;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use jsonwebtoken::EncodingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::{Error, Result};

/// Environment variable prefix merged over the YAML file.
pub const ENV_PREFIX: &str = "TOKEN_GATEWAY_";

/// Main configuration, as read from YAML and the environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Credentials guarding the token endpoint
    pub auth: AuthConfig,
    /// Token signing configuration
    pub token: TokenConfig,
    /// Object-store profile configuration
    pub storage: StorageConfig,
    /// Identity registry (EGA user service)
    pub ega: RegistryConfig,
    /// Project registry (SUPR)
    pub supr: RegistryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            max_body_size: 64 * 1024,
        }
    }
}

/// Basic-auth credentials expected on `POST /token`.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected username (supports `env:VAR_NAME`)
    pub username: String,
    /// Expected password (supports `env:VAR_NAME`)
    pub password: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Issuer (`iss` claim)
    pub iss: String,
    /// Token lifetime in whole days
    pub expiration_days: u32,
    /// Path to the PEM encoded EC P-256 private key (PKCS#8)
    pub jwt_key: String,
    /// Key identifier placed in the token header; derived from the key file when unset
    pub key_id: Option<String>,
    /// Service account placed in the `pilot` claim; defaults to `auth.username`
    pub pilot: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            iss: String::new(),
            expiration_days: 14,
            jwt_key: String::new(),
            key_id: None,
            pilot: None,
        }
    }
}

/// Object-store profile configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Object-store endpoint, used as `host_base` and `host_bucket`
    pub s3_url: String,
    /// Path to the crypt4gh public key handed to clients for upstream encryption
    pub crypt4gh_key: String,
}

/// Connection settings for one external registry.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL
    pub url: String,
    /// Service username (supports `env:VAR_NAME`)
    pub username: String,
    /// Service password (supports `env:VAR_NAME`)
    pub password: String,
    /// Per-call timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.resolve_secrets();

        Ok(config)
    }

    /// Expand `env:VAR_NAME` references in credential fields.
    pub fn resolve_secrets(&mut self) {
        for value in [
            &mut self.auth.username,
            &mut self.auth.password,
            &mut self.ega.username,
            &mut self.ega.password,
            &mut self.supr.username,
            &mut self.supr.password,
        ] {
            *value = resolve_secret(value);
        }
    }

    /// Check that every value the token pipeline depends on is present.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.auth.username.is_empty() || self.auth.password.is_empty() {
            return Err(Error::config("auth.username and auth.password are required"));
        }
        if self.token.iss.is_empty() {
            return Err(Error::config("token.iss is required"));
        }
        if self.token.expiration_days == 0 {
            return Err(Error::config("token.expiration_days must be at least 1"));
        }
        if self.token.jwt_key.is_empty() {
            return Err(Error::config("token.jwt_key is required"));
        }
        if self.storage.s3_url.is_empty() {
            return Err(Error::config("storage.s3_url is required"));
        }
        if self.storage.crypt4gh_key.is_empty() {
            return Err(Error::config("storage.crypt4gh_key is required"));
        }
        validate_registry("ega", &self.ega)?;
        validate_registry("supr", &self.supr)?;

        // both registry calls must fit inside one request
        let registry_budget = self.ega.timeout + self.supr.timeout;
        if self.server.request_timeout <= registry_budget {
            return Err(Error::Config(format!(
                "server.request_timeout ({:?}) must exceed ega.timeout + supr.timeout ({registry_budget:?})",
                self.server.request_timeout
            )));
        }
        Ok(())
    }
}

fn validate_registry(name: &str, registry: &RegistryConfig) -> Result<()> {
    let url = Url::parse(&registry.url)
        .map_err(|e| Error::Config(format!("{name}.url is invalid ({}): {e}", registry.url)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "{name}.url must use http or https, got {}",
            url.scheme()
        )));
    }
    if registry.username.is_empty() || registry.password.is_empty() {
        return Err(Error::Config(format!(
            "{name}.username and {name}.password are required"
        )));
    }
    if registry.timeout.is_zero() {
        return Err(Error::Config(format!("{name}.timeout must be non-zero")));
    }
    Ok(())
}

/// Resolve a credential value: `env:VAR_NAME` reads the variable, anything
/// else is taken literally. An unset variable leaves the value unchanged.
#[must_use]
pub fn resolve_secret(value: &str) -> String {
    value.strip_prefix("env:").map_or_else(
        || value.to_string(),
        |var_name| env::var(var_name).unwrap_or_else(|_| value.to_string()),
    )
}

/// Immutable runtime configuration shared by every request.
///
/// Built once from [`Config`] after key material has been read and parsed.
#[derive(Clone)]
pub struct ServiceConfig {
    /// ES256 signing key
    pub signing_key: EncodingKey,
    /// Key identifier declared in the token header
    pub key_id: String,
    /// Token issuer
    pub issuer: String,
    /// Token lifetime in whole days
    pub expiration_days: u32,
    /// Operating service account (`pilot` claim)
    pub pilot: String,
    /// Object-store endpoint
    pub s3_url: String,
    /// Base64 encoded crypt4gh public key, passed through to clients
    pub crypt4gh_key: String,
    /// Identity registry connection
    pub ega: RegistryConfig,
    /// Project registry connection
    pub supr: RegistryConfig,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("expiration_days", &self.expiration_days)
            .field("pilot", &self.pilot)
            .field("s3_url", &self.s3_url)
            .field("ega", &self.ega)
            .field("supr", &self.supr)
            .finish_non_exhaustive()
    }
}

impl ServiceConfig {
    /// Validate `config` and read the signing and crypt4gh keys from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if validation fails or a key file cannot be
    /// read or parsed.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let key_pem = fs::read(&config.token.jwt_key).map_err(|e| {
            Error::Config(format!("failed to read token.jwt_key {}: {e}", config.token.jwt_key))
        })?;
        let crypt4gh = fs::read(&config.storage.crypt4gh_key).map_err(|e| {
            Error::Config(format!(
                "failed to read storage.crypt4gh_key {}: {e}",
                config.storage.crypt4gh_key
            ))
        })?;

        Self::from_key_material(config, &key_pem, &crypt4gh)
    }

    /// Build from already-loaded key bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `key_pem` is not an EC private key.
    pub fn from_key_material(config: &Config, key_pem: &[u8], crypt4gh_key: &[u8]) -> Result<Self> {
        let signing_key = EncodingKey::from_ec_pem(key_pem)
            .map_err(|e| Error::Config(format!("token.jwt_key is not an EC private key: {e}")))?;

        let key_id = config
            .token
            .key_id
            .clone()
            .unwrap_or_else(|| derive_key_id(key_pem));

        let pilot = config
            .token
            .pilot
            .clone()
            .unwrap_or_else(|| config.auth.username.clone());

        Ok(Self {
            signing_key,
            key_id,
            issuer: config.token.iss.clone(),
            expiration_days: config.token.expiration_days,
            pilot,
            s3_url: config.storage.s3_url.clone(),
            crypt4gh_key: base64::engine::general_purpose::STANDARD.encode(crypt4gh_key),
            ega: config.ega.clone(),
            supr: config.supr.clone(),
        })
    }
}

/// Key identifier derived from the key file: first 16 bytes of its SHA-256, hex.
#[must_use]
pub fn derive_key_id(key_pem: &[u8]) -> String {
    let digest = Sha256::digest(key_pem);
    hex::encode(&digest[..16])
}
