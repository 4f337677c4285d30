//! QUIC client used by the node agent to reach the control plane.
//!
//! The connection is long-lived and owned by the endpoint; each RPC opens a
//! fresh bi-directional stream and carries its own bounded deadline, so a
//! stalled call can never pin the connection's lifetime.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quinn::crypto::rustls::QuicClientConfig;
use tracing::{debug, instrument};

use crate::client::ControlPlaneClient;
use crate::config::HOOK_SETTINGS;
use crate::error::HookError;
use crate::transport::message::VolumeRpc;
use crate::types::{ClaimVolumeRequest, ClaimVolumeResponse, UnpublishVolumeRequest};

/// Upper bound on a single response payload.
const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Production [`ControlPlaneClient`] that sends [`VolumeRpc`] requests over
/// a single QUIC connection.
pub struct QuicControlPlaneClient {
    connection: quinn::Connection,
    call_deadline: Duration,
}

impl QuicControlPlaneClient {
    /// Establish a new QUIC connection to the control plane at `addr`.
    ///
    /// * `addr` — socket address of the control-plane RPC endpoint
    /// * `server_name` — TLS SNI name that must match a SAN in the server's
    ///   certificate
    /// * `tls_config` — client TLS configuration
    ///
    /// The per-call deadline comes from [`HOOK_SETTINGS`].
    pub async fn connect(
        addr: SocketAddr,
        server_name: &str,
        tls_config: rustls::ClientConfig,
    ) -> Result<Self, HookError> {
        let quic_client_config = QuicClientConfig::try_from(tls_config)
            .map_err(|e| HookError::Transport(format!("invalid TLS config: {e}")))?;
        let client_config = quinn::ClientConfig::new(Arc::new(quic_client_config));

        let mut endpoint = quinn::Endpoint::client(
            "0.0.0.0:0".parse().map_err(HookError::internal)?,
        )
        .map_err(HookError::transport)?;
        endpoint.set_default_client_config(client_config);

        let connection = endpoint
            .connect(addr, server_name)
            .map_err(HookError::transport)?
            .await
            .map_err(HookError::transport)?;

        debug!(%addr, %server_name, "control-plane QUIC connection established");
        Ok(Self {
            connection,
            call_deadline: HOOK_SETTINGS.rpc_timeout,
        })
    }

    /// Send a request and wait for the corresponding response, bounded by
    /// the per-call deadline.
    ///
    /// Each call opens a new bi-directional stream, writes the
    /// JSON-serialized request, finishes the send side, then reads the full
    /// response and deserializes it.
    #[instrument(skip(self), fields(msg = %msg))]
    async fn request(&self, msg: &VolumeRpc) -> Result<VolumeRpc, HookError> {
        let call = async {
            let (mut send, mut recv) = self
                .connection
                .open_bi()
                .await
                .map_err(HookError::transport)?;

            let payload = serde_json::to_vec(msg).map_err(HookError::internal)?;
            send.write_all(&payload)
                .await
                .map_err(HookError::transport)?;
            send.finish().map_err(HookError::transport)?;

            let buf = recv
                .read_to_end(MAX_RESPONSE_BYTES)
                .await
                .map_err(HookError::transport)?;

            serde_json::from_slice::<VolumeRpc>(&buf).map_err(HookError::transport)
        };

        let response = tokio::time::timeout(self.call_deadline, call)
            .await
            .map_err(|_| {
                HookError::Transport(format!(
                    "call exceeded deadline of {:?}",
                    self.call_deadline
                ))
            })??;

        debug!(%response, "control-plane response received");
        Ok(response)
    }

    /// Close the underlying QUIC connection gracefully.
    pub fn close(&self) {
        self.connection
            .close(quinn::VarInt::from_u32(0), b"client shutdown");
    }
}

#[async_trait]
impl ControlPlaneClient for QuicControlPlaneClient {
    async fn claim_volume(
        &self,
        req: ClaimVolumeRequest,
    ) -> Result<ClaimVolumeResponse, HookError> {
        match self.request(&VolumeRpc::ClaimVolume(req)).await? {
            VolumeRpc::VolumeClaimed(resp) => Ok(resp),
            VolumeRpc::Error(e) => Err(e),
            other => Err(HookError::Transport(format!(
                "unexpected response to claim: {other}"
            ))),
        }
    }

    async fn unpublish_volume(&self, req: UnpublishVolumeRequest) -> Result<(), HookError> {
        match self.request(&VolumeRpc::UnpublishVolume(req)).await? {
            VolumeRpc::Ok => Ok(()),
            VolumeRpc::Error(e) => Err(e),
            other => Err(HookError::Transport(format!(
                "unexpected response to unpublish: {other}"
            ))),
        }
    }
}
