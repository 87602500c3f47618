use rand_core::{OsRng, RngCore};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use netctl_routing::OspfState;
use netctl_types::{RemoteNodeInfo, RemotePeerInfo};

use crate::identity::SigningIdentity;
use crate::wire::{
    ConfigEnvelope, JoinRequest, JoinResponse, LinkTelemetry, LinkTelemetryRequest, PeersEnvelope,
    RemotePeerInfoRaw, RouterTelemetryRequest, SyncWireguardKeysRequest,
};
use crate::ControllerError;

/// Thin trait over the endpoints the reconciliation controller consumes, so
/// it can be driven against a recorded/fake transport in tests without a
/// live server.
#[allow(async_fn_in_trait)]
pub trait ControllerClient {
    /// `GET /api/v1/node/config`.
    async fn get_node_config(&self) -> Result<RemoteNodeInfo, ControllerError>;

    /// `GET /api/v1/node/peers`.
    async fn get_peers(&self) -> Result<Vec<RemotePeerInfo>, ControllerError>;

    /// `POST /api/v1/node/sync_wireguard_keys`.
    async fn sync_wireguard_keys(&self, public_keys: &[String]) -> Result<(), ControllerError>;

    /// `POST /api/v1/node/link_telemetry`.
    async fn link_telemetry(&self, links: &[LinkTelemetry]) -> Result<(), ControllerError>;

    /// `POST /api/v1/node/router_telemetry`.
    async fn router_telemetry(&self, state: &OspfState) -> Result<(), ControllerError>;

    /// `POST /api/v1/node/join`.
    async fn join(&self, request: &JoinRequest<'_>) -> Result<JoinResponse, ControllerError>;
}

/// Generates a random 8-byte nonce, hex-encoded, as required by every
/// signed call.
fn random_nonce_hex() -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Production [`ControllerClient`] built on `reqwest`, matching the
/// stack's existing async HTTP client choice for outbound calls to a
/// control plane.
pub struct HttpControllerClient {
    http: Client,
    base: Url,
    identity: SigningIdentity,
}

impl HttpControllerClient {
    /// Builds a client talking to `domain_prefix`, signing every request
    /// with `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Url`] if `domain_prefix` doesn't parse as
    /// a base URL.
    pub fn new(domain_prefix: &str, identity: SigningIdentity) -> Result<Self, ControllerError> {
        let base = Url::parse(domain_prefix)?;
        Ok(Self { http: Client::new(), base, identity })
    }

    /// Signs and sends a request to `path`, returning the decoded JSON
    /// body. Non-2xx responses are a hard failure with the body captured;
    /// the signing string is `"{path}\n{nonce}\n{qs_or_body}"`.
    async fn call<T>(&self, endpoint: &'static str, method: Method, path: &str, body: Option<&Value>) -> Result<T, ControllerError>
    where
        T: serde::de::DeserializeOwned,
    {
        let nonce = random_nonce_hex();
        let payload = body.map(Value::to_string).unwrap_or_default();
        let signing_string = format!("{path}\n{nonce}\n{payload}");
        let signature = self.identity.sign_hex(signing_string.as_bytes());

        let url = self.base.join(path)?;
        let mut request = self
            .http
            .request(method, url)
            .header("X-Client-Id", self.identity.client_id())
            .header("X-Client-Nonce", &nonce)
            .header("X-Client-Sign", &signature);
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(endpoint, "calling controller");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControllerError::NonSuccess { endpoint, status: status.as_u16(), body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| ControllerError::Decode { endpoint, source })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &'static str, path: &str) -> Result<T, ControllerError> {
        self.call(endpoint, Method::GET, path, None).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ControllerError> {
        let value = serde_json::to_value(body).map_err(|source| ControllerError::Decode { endpoint, source })?;
        self.call(endpoint, Method::POST, path, Some(&value)).await
    }
}

impl ControllerClient for HttpControllerClient {
    async fn get_node_config(&self) -> Result<RemoteNodeInfo, ControllerError> {
        let envelope: ConfigEnvelope = self.get("node/config", "/api/v1/node/config").await?;
        serde_json::from_str(&envelope.config)
            .map_err(|source| ControllerError::Decode { endpoint: "node/config", source })
    }

    async fn get_peers(&self) -> Result<Vec<RemotePeerInfo>, ControllerError> {
        let envelope: PeersEnvelope = self.get("node/peers", "/api/v1/node/peers").await?;
        Ok(envelope.peers.into_iter().map(RemotePeerInfoRaw::into_peer_info).collect())
    }

    async fn sync_wireguard_keys(&self, public_keys: &[String]) -> Result<(), ControllerError> {
        let request = SyncWireguardKeysRequest { keys: public_keys };
        let _: Value = self.post("node/sync_wireguard_keys", "/api/v1/node/sync_wireguard_keys", &request).await?;
        Ok(())
    }

    async fn link_telemetry(&self, links: &[LinkTelemetry]) -> Result<(), ControllerError> {
        let request = LinkTelemetryRequest::from_links(links);
        let _: Value = self.post("node/link_telemetry", "/api/v1/node/link_telemetry", &request).await?;
        Ok(())
    }

    async fn router_telemetry(&self, state: &OspfState) -> Result<(), ControllerError> {
        let request = RouterTelemetryRequest::from_state(state);
        let _: Value = self.post("node/router_telemetry", "/api/v1/node/router_telemetry", &request).await?;
        Ok(())
    }

    async fn join(&self, request: &JoinRequest<'_>) -> Result<JoinResponse, ControllerError> {
        self.post("node/join", "/api/v1/node/join", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_16_hex_chars() {
        assert_eq!(random_nonce_hex().len(), 16);
    }

    #[test]
    fn client_builds_with_a_valid_domain_prefix() {
        let identity = SigningIdentity::from_bytes(&[4u8; 32]);
        assert!(HttpControllerClient::new("https://controller.example", identity).is_ok());
    }

    #[test]
    fn client_rejects_an_unparseable_domain_prefix() {
        let identity = SigningIdentity::from_bytes(&[4u8; 32]);
        assert!(HttpControllerClient::new("not a url", identity).is_err());
    }
}
