//! Firebase Realtime Database client over the REST API.
//!
//! Every location is addressed as `<database_url>/<path>.json`:
//! `PUT` replaces a value, `GET` reads it and `POST` appends a child under a
//! generated, chronologically ordered push id.

use super::auth::{Credentials, load_credentials};
use super::{FlagStore, FlagValue, SampleKey, SampleStore};
use crate::config::FirebaseConfig;
use crate::error::{BridgeError, Result};
use crate::sensors::SensorSample;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Response, Url};
use serde::Deserialize;

/// Body returned by a `POST` (push) request.
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// REST client bound to one database, one sample collection and one flag.
pub struct FirebaseClient {
    http: reqwest::Client,
    base: Url,
    credentials: Option<Credentials>,
    sample_path: String,
    trigger_path: String,
}

impl FirebaseClient {
    /// Create a client from configuration, loading the credential file if
    /// one is configured.
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        let credentials = match &config.credentials_path {
            Some(path) => Some(load_credentials(path)?),
            None => None,
        };
        Self::with_credentials(config, credentials)
    }

    /// Create a client with an explicit `?auth=` token (or none).
    pub fn with_auth(config: &FirebaseConfig, auth: Option<String>) -> Result<Self> {
        Self::with_credentials(config, auth.map(Credentials::Token))
    }

    pub fn with_credentials(
        config: &FirebaseConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        let mut base = Url::parse(config.database_url.trim()).map_err(|e| {
            BridgeError::InvalidDatabaseUrl(format!("{}: {e}", config.database_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(BridgeError::InvalidDatabaseUrl(config.database_url.clone()));
        }
        base.set_fragment(None);

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        info!(
            "[Firebase] Using {} (samples: {}, trigger: {}, auth: {})",
            base,
            config.sample_path,
            config.trigger_path,
            credentials.as_ref().map_or("none", Credentials::kind)
        );

        Ok(Self {
            http,
            base,
            credentials,
            sample_path: config.sample_path.clone(),
            trigger_path: config.trigger_path.clone(),
        })
    }

    /// Resolve a database path to its REST URL, keeping any query the
    /// database URL carries (e.g. the emulator's `?ns=`).
    fn locate(&self, path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|()| BridgeError::InvalidDatabaseUrl(self.base.to_string()))?;
            parts.pop_if_empty();
            match segments.split_last() {
                Some((last, parents)) => {
                    parts.extend(parents);
                    parts.push(&format!("{last}.json"));
                }
                None => {
                    parts.push(".json");
                }
            }
        }
        Ok(url)
    }

    /// REST URL for `path` with the credential attached.
    async fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.locate(path)?;
        if let Some(credentials) = &self.credentials {
            let (name, value) = credentials.query_pair(&self.http).await?;
            url.query_pairs_mut().append_pair(name, &value);
        }
        Ok(url)
    }

    /// Replace the value stored at `path`.
    pub async fn put<T: serde::Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<()> {
        let response = self.http.put(self.endpoint(path).await?).json(value).send().await?;
        check_status(path, &response)?;
        Ok(())
    }

    /// Read the value stored at `path`; JSON `null` means nothing is there.
    pub async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.http.get(self.endpoint(path).await?).send().await?;
        check_status(path, &response)?;
        Ok(response.json::<Option<T>>().await?)
    }

    /// Append `value` as a new child of `path`, returning its push id.
    pub async fn push<T: serde::Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<String> {
        let response = self.http.post(self.endpoint(path).await?).json(value).send().await?;
        check_status(path, &response)?;
        let body: PushResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::UnexpectedResponse(format!("push to {path}: {e}")))?;
        Ok(body.name)
    }
}

fn check_status(path: &str, response: &Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(BridgeError::HttpStatus {
            path: path.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl FlagStore for FirebaseClient {
    async fn set_flag(&self, value: &FlagValue) -> Result<()> {
        self.put(&self.trigger_path, value).await?;
        debug!("[Firebase] {} <- {}", self.trigger_path, value);
        Ok(())
    }

    async fn get_flag(&self) -> Result<Option<FlagValue>> {
        self.get(&self.trigger_path).await
    }
}

#[async_trait]
impl SampleStore for FirebaseClient {
    async fn push_sample(&self, sample: &SensorSample) -> Result<SampleKey> {
        let name = self.push(&self.sample_path, sample).await?;
        Ok(SampleKey(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn firebase_config(url: &str) -> FirebaseConfig {
        FirebaseConfig {
            database_url: url.to_string(),
            ..Config::default().firebase
        }
    }

    #[test]
    fn test_locate_joins_paths() {
        let client =
            FirebaseClient::with_auth(&firebase_config("https://db.example.app/"), None).unwrap();
        assert_eq!(
            client.locate("conversation_trigger").unwrap().as_str(),
            "https://db.example.app/conversation_trigger.json"
        );
        assert_eq!(
            client.locate("/devices/pir/").unwrap().as_str(),
            "https://db.example.app/devices/pir.json"
        );
    }

    #[test]
    fn test_locate_keeps_database_query() {
        let client = FirebaseClient::with_auth(
            &firebase_config("http://localhost:9000/?ns=demo-project"),
            None,
        )
        .unwrap();
        assert_eq!(
            client.locate("conversation_trigger").unwrap().as_str(),
            "http://localhost:9000/conversation_trigger.json?ns=demo-project"
        );
    }

    #[test]
    fn test_locate_under_base_path() {
        let client =
            FirebaseClient::with_auth(&firebase_config("http://localhost:9000/root/"), None)
                .unwrap();
        assert_eq!(
            client.locate("test").unwrap().as_str(),
            "http://localhost:9000/root/test.json"
        );
    }

    #[tokio::test]
    async fn test_endpoint_appends_auth() {
        let client = FirebaseClient::with_auth(
            &firebase_config("https://db.example.app"),
            Some("s3cr&t".to_string()),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("test").await.unwrap().as_str(),
            "https://db.example.app/test.json?auth=s3cr%26t"
        );
    }

    #[tokio::test]
    async fn test_endpoint_auth_follows_database_query() {
        let client = FirebaseClient::with_auth(
            &firebase_config("http://localhost:9000/?ns=demo-project"),
            Some("owner".to_string()),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("conversation_trigger").await.unwrap().as_str(),
            "http://localhost:9000/conversation_trigger.json?ns=demo-project&auth=owner"
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            FirebaseClient::with_auth(&firebase_config("not a url"), None),
            Err(BridgeError::InvalidDatabaseUrl(_))
        ));
        assert!(matches!(
            FirebaseClient::with_auth(&firebase_config("ftp://db.example.app"), None),
            Err(BridgeError::InvalidDatabaseUrl(_))
        ));
    }

    #[test]
    fn test_missing_credentials_file_is_fatal() {
        let mut config = firebase_config("https://db.example.app");
        config.credentials_path = Some(std::env::temp_dir().join("trigger-bridge-no-such-key"));
        assert!(matches!(
            FirebaseClient::new(&config),
            Err(BridgeError::CredentialsMissing(_))
        ));
    }
}
