//! FileMaker Data API client over HTTPS

use crate::config::{AgentConfig, AgentSettings, ServerSettings};
use crate::remote::traits::DataApi;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use sensehat_shared::{wire, SubmitResult, UploadRecord};
use std::path::PathBuf;
use tracing::{debug, info};

/// API version segment used for every request
const API_VERSION: &str = "vLatest";

/// Data API client bound to one file and layout
pub struct FmsClient {
    http: reqwest::Client,
    settings: ServerSettings,
    base: Url,
    /// Config file re-read on `reload`
    config_path: Option<PathBuf>,
}

impl FmsClient {
    /// Create a client from connection settings
    pub fn new(settings: ServerSettings, agent: &AgentSettings) -> Result<Self> {
        let http = build_http(agent)?;
        let base = base_url(&settings.fm_server_address)?;

        Ok(Self {
            http,
            settings,
            base,
            config_path: None,
        })
    }

    /// Re-read connection settings from this file whenever the session is rebuilt
    pub fn with_reload_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    fn data_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Server address cannot carry a path: {}", self.base))?
            .pop_if_empty()
            .extend(["fmi", "data", API_VERSION, "databases", self.settings.fm_file.as_str()])
            .extend(segments);
        Ok(url)
    }

    fn sessions_url(&self) -> Result<Url> {
        self.data_url(&["sessions"])
    }

    fn session_url(&self, token: &str) -> Result<Url> {
        self.data_url(&["sessions", token])
    }

    /// Session URL for logs, token masked
    fn redacted_session_url(&self) -> Result<String> {
        Ok(format!("{}/***", self.sessions_url()?))
    }

    fn records_url(&self) -> Result<Url> {
        self.data_url(&["layouts", self.settings.fm_layout.as_str(), "records"])
    }
}

fn build_http(agent: &AgentSettings) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(agent.request_timeout())
        .danger_accept_invalid_certs(agent.accept_invalid_certs)
        .build()
        .context("Failed to build HTTP client")
}

/// Accept bare host names as well as full URLs
fn base_url(address: &str) -> Result<Url> {
    let address = address.trim();
    let text = if address.contains("://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    };
    Url::parse(&text).with_context(|| format!("Invalid server address: {}", address))
}

#[async_trait]
impl DataApi for FmsClient {
    async fn authenticate(&self) -> Result<String> {
        let url = self.sessions_url()?;
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .basic_auth(&self.settings.fm_account, Some(&self.settings.fm_pw))
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Login request failed")?;

        let status = response.status();
        let body = response.bytes().await.context("Failed to read login response")?;

        wire::decode_session(&body).with_context(|| format!("Login rejected (HTTP {})", status))
    }

    async fn logout(&self, token: &str) -> Result<()> {
        let url = self.session_url(token)?;
        debug!("DELETE {}", self.redacted_session_url()?);

        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Logout request failed")?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to read logout response")?;

        wire::decode_logout(&body).with_context(|| format!("Logout rejected (HTTP {})", status))
    }

    async fn create_record(&self, token: &str, record: &UploadRecord) -> Result<SubmitResult> {
        let url = self.records_url()?;
        debug!("POST {} ({} fields)", url, record.fields().len());

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&wire::encode_record(record))
            .send()
            .await
            .context("Create record request failed")?;

        let body = response.bytes().await.context("Failed to read create record response")?;

        Ok(wire::decode_submit(&body))
    }

    async fn reload(&mut self) -> Result<()> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };

        let config = AgentConfig::load(path)?;
        self.http = build_http(&config.agent)?;
        self.base = base_url(&config.server.fm_server_address)?;
        self.settings = config.server;

        info!("[SESSION] Connection settings reloaded from {}", path.display());
        Ok(())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base.host_str().unwrap_or("?"),
            self.settings.fm_file
        )
    }
}
