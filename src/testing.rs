//! Shared fixtures for unit tests.

use rcgen::KeyPair;

use crate::config::{
    AuthConfig, Config, RegistryConfig, ServiceConfig, StorageConfig, TokenConfig,
};

pub const CRYPT4GH_KEY: &str =
    "-----BEGIN CRYPT4GH PUBLIC KEY-----\nvSome+asd/apublicKey\n-----END CRYPT4GH PUBLIC KEY-----";

/// A freshly generated P-256 key pair in PEM form.
pub struct TestKeys {
    pub private_pem: String,
    pub public_pem: String,
}

impl TestKeys {
    pub fn generate() -> Self {
        let key_pair = KeyPair::generate().expect("key generation failed");
        Self {
            private_pem: key_pair.serialize_pem(),
            public_pem: key_pair.public_key_pem(),
        }
    }

    pub fn config(&self, ega_url: &str, supr_url: &str) -> Config {
        Config {
            auth: AuthConfig {
                username: "user".to_string(),
                password: "password".to_string(),
            },
            token: TokenConfig {
                iss: "https://some.url".to_string(),
                jwt_key: "unused".to_string(),
                ..TokenConfig::default()
            },
            storage: StorageConfig {
                s3_url: "some.s3.url".to_string(),
                crypt4gh_key: "unused".to_string(),
            },
            ega: registry(ega_url),
            supr: registry(supr_url),
            ..Config::default()
        }
    }

    pub fn service_config(&self, ega_url: &str, supr_url: &str) -> ServiceConfig {
        ServiceConfig::from_key_material(
            &self.config(ega_url, supr_url),
            self.private_pem.as_bytes(),
            CRYPT4GH_KEY.as_bytes(),
        )
        .expect("service config")
    }
}

fn registry(url: &str) -> RegistryConfig {
    RegistryConfig {
        url: url.to_string(),
        username: "some-user".to_string(),
        password: "some-pass".to_string(),
        ..RegistryConfig::default()
    }
}
