use crate::{identity::Identity, Error, Result};
use paradrop_types::{
    api::{BalanceResponse, RegisterRequest, RegisterResponse, TablesResponse},
    GameType,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP endpoints of the game server.
#[derive(Clone)]
pub struct HttpApi {
    pub(crate) base_url: Url,
    http_client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        // Relative joins must append to the base path, not replace its last segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Realtime channel endpoint (`ws(s)://.../ws`).
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self.base_url.join("ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| Error::InvalidScheme(url.scheme().to_string()))?;
        Ok(url)
    }

    /// Register the local identity for a wallet. Never retried.
    pub async fn register(&self, identity: &Identity) -> Result<RegisterResponse> {
        let url = self.base_url.join("register")?;
        let request = RegisterRequest {
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
        };
        debug!(%url, user_id = %request.user_id, "registering wallet");
        let response = self.http_client.post(url).json(&request).send().await?;
        Self::decode(response).await
    }

    pub async fn balance(&self, user_id: &str) -> Result<BalanceResponse> {
        let url = self.base_url.join(&format!("balance/{user_id}"))?;
        self.get_json(url).await
    }

    pub async fn tables(&self, game: GameType) -> Result<TablesResponse> {
        let url = self.base_url.join(&format!("api/tables/{game}"))?;
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.http_client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::FailedWithBody { status, body });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
