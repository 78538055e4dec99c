//! Shared fixtures for integration tests: mock registries, key pairs and a
//! running gateway on a loopback port.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION},
};
use base64::Engine;
use rcgen::KeyPair;
use tempfile::TempDir;
use tokio::net::TcpListener;

use token_gateway::config::{
    AuthConfig, Config, RegistryConfig, ServerConfig, StorageConfig, TokenConfig,
};
use token_gateway::gateway::Gateway;

pub const GATE_USER: &str = "user";
pub const GATE_PASSWORD: &str = "password";
pub const REGISTRY_USER: &str = "some-user";
pub const REGISTRY_PASSWORD: &str = "some-pass";
pub const ISSUER: &str = "https://some.url";
pub const S3_URL: &str = "some.s3.url";
pub const CRYPT4GH_KEY: &str =
    "-----BEGIN CRYPT4GH PUBLIC KEY-----\nvSome+asd/apublicKey\n-----END CRYPT4GH PUBLIC KEY-----";

pub const EGA_FOUND: &str = r#"{ "header": { "apiVersion": "v1", "code": 200, "service": "users", "developerMessage": null, "userMessage": "OK", "errorCode": 0, "docLink": "https://ega-archive.org" }, "response": { "numTotalResults": 1, "resultType": "LocalEgaUser", "result": [ { "username": "some.user@nbis.se", "sshPublicKey": null, "passwordHash": "somePasswordHash", "uid": 1234, "gecos": null } ] }}"#;

pub const EGA_EMPTY: &str = r#"{ "header": { "apiVersion": "v1", "code": 200 }, "response": { "numTotalResults": 0, "resultType": "LocalEgaUser", "result": [] }}"#;

pub const SUPR_PI_SOME_USER: &str = r#"{"matches": [{"id": 1234, "type": "Project", "name": "project-name", "title": "Test project", "ngi_project_name": "ngi-project-name", "managed_in_supr": true, "start_date": "2022-09-19", "end_date": "2022-12-31", "pi": {"id": 123, "first_name": "Name", "last_name": "Lastname", "email": "some.user@nbis.se"}, "members": [{"id": 175, "first_name": "Name", "last_name": "Lastname", "email": "some.user@nbis.se"}], "links_outgoing": [], "links_incoming": [], "resourceprojects": [{"id": 123, "allocated": 1000, "resource": {"id": 123, "name": "Grus", "capacity_unit": "GiB", "capacity_unit_2": "", "centre": {"id": 123, "name": "UPPMAX"}}, "decommissioning_state": "N/A", "allocations": [{"id": 123, "start_date": "2022-09-19", "end_date": "2022-12-31", "allocated": 1000}]}], "modified": "2022-09-19 14:50:39"}], "began": "2023-02-06 13:04:31"}"#;

pub const SUPR_PI_OTHER_USER: &str = r#"{"matches": [{"id": 1234, "type": "Project", "name": "project-name", "pi": {"id": 123, "first_name": "Name", "last_name": "Lastname", "email": "some.other.user@nbis.se"}, "members": [{"id": 175, "first_name": "Name", "last_name": "Lastname", "email": "some.user@nbis.se"}]}], "began": "2023-02-06 13:04:31"}"#;

pub const SUPR_NO_MATCHES: &str = r#"{"matches": [], "began": "2023-02-06 13:04:31"}"#;

/// One request as seen by a mock registry.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

/// A registry double answering every request with a fixed status and body.
pub struct MockRegistry {
    pub url: String,
    hits: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockRegistry {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: StatusCode, body: &'static str, delay: Duration) -> Self {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&hits);

        let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap| {
            let recorder = Arc::clone(&recorder);
            async move {
                recorder.lock().unwrap().push(RecordedRequest {
                    path: uri.path().to_string(),
                    query: uri.query().map(str::to_string),
                    authorization: headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                });
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                (status, body)
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/api"),
            hits,
        }
    }

    pub fn hits(&self) -> Vec<RecordedRequest> {
        self.hits.lock().unwrap().clone()
    }
}

/// A fresh P-256 key pair in PEM form.
pub struct TestKeys {
    pub private_pem: String,
    pub public_pem: String,
}

impl TestKeys {
    pub fn generate() -> Self {
        let key_pair = KeyPair::generate().unwrap();
        Self {
            private_pem: key_pair.serialize_pem(),
            public_pem: key_pair.public_key_pem(),
        }
    }
}

/// A gateway served on a loopback port.
pub struct TestGateway {
    pub url: String,
    pub keys: TestKeys,
    _dir: TempDir,
}

impl TestGateway {
    pub async fn start(ega_url: &str, supr_url: &str) -> Self {
        Self::start_with_timeout(ega_url, supr_url, Duration::from_secs(5)).await
    }

    pub async fn start_with_timeout(ega_url: &str, supr_url: &str, timeout: Duration) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let keys = TestKeys::generate();

        let key_path = dir.path().join("dummy.ec.pem");
        std::fs::write(&key_path, &keys.private_pem).unwrap();
        let c4gh_path = dir.path().join("c4gh.pub.pem");
        std::fs::write(&c4gh_path, CRYPT4GH_KEY).unwrap();

        let registry = |url: &str| RegistryConfig {
            url: url.to_string(),
            username: REGISTRY_USER.to_string(),
            password: REGISTRY_PASSWORD.to_string(),
            timeout,
        };

        let config = Config {
            server: ServerConfig::default(),
            auth: AuthConfig {
                username: GATE_USER.to_string(),
                password: GATE_PASSWORD.to_string(),
            },
            token: TokenConfig {
                iss: ISSUER.to_string(),
                jwt_key: key_path.display().to_string(),
                ..TokenConfig::default()
            },
            storage: StorageConfig {
                s3_url: S3_URL.to_string(),
                crypt4gh_key: c4gh_path.display().to_string(),
            },
            ega: registry(ega_url),
            supr: registry(supr_url),
        };

        let gateway = Gateway::new(config).unwrap();
        let app = gateway.router();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            keys,
            _dir: dir,
        }
    }

    /// POST `body` to `/token` with the given Basic credentials.
    pub async fn post_token(&self, user: &str, password: &str, body: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/token", self.url))
            .basic_auth(user, Some(password))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }
}

/// Base64 "user:pass" the way the registries should receive it.
pub fn expected_registry_auth() -> String {
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{REGISTRY_USER}:{REGISTRY_PASSWORD}"));
    format!("Basic {encoded}")
}

/// Decode a base64 storage profile into `key -> value` lines.
pub fn profile_value(s3config: &str, key: &str) -> Option<String> {
    let plain = base64::engine::general_purpose::STANDARD
        .decode(s3config)
        .unwrap();
    let plain = String::from_utf8(plain).unwrap();
    plain.lines().find_map(|line| {
        line.split_once(" = ")
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
}
