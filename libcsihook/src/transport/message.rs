//! Volume RPC messages transmitted over QUIC.
//!
//! [`VolumeRpc`] is the envelope for the two control-plane requests this
//! hook issues and their responses.  Each QUIC bi-stream carries exactly one
//! request followed by one response; the server replies with the matching
//! response variant or [`VolumeRpc::Error`].

use serde::{Deserialize, Serialize};

use crate::error::HookError;
use crate::types::{ClaimVolumeRequest, ClaimVolumeResponse, UnpublishVolumeRequest};

/// Top-level message envelope for volume RPCs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VolumeRpc {
    // ----- Requests --------------------------------------------------------
    /// Claim a volume for an allocation.
    ClaimVolume(ClaimVolumeRequest),
    /// Release a claim during teardown.
    UnpublishVolume(UnpublishVolumeRequest),

    // ----- Responses -------------------------------------------------------
    /// A claim succeeded; carries the resolved volume and publish context.
    VolumeClaimed(ClaimVolumeResponse),
    /// Generic success acknowledgement (no payload).
    Ok,
    /// An error occurred.
    Error(HookError),
}

impl std::fmt::Display for VolumeRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClaimVolume(req) => write!(f, "ClaimVolume({})", req.volume_id),
            Self::UnpublishVolume(req) => write!(f, "UnpublishVolume({})", req.volume_id),
            Self::VolumeClaimed(resp) => match &resp.volume {
                Some(vol) => write!(f, "VolumeClaimed({})", vol.id),
                None => f.write_str("VolumeClaimed(<none>)"),
            },
            Self::Ok => f.write_str("Ok"),
            Self::Error(e) => write!(f, "Error({e})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessMode, AttachmentMode, ClaimMode, RequestContext};

    fn claim_request() -> ClaimVolumeRequest {
        ClaimVolumeRequest {
            volume_id: "ebs-1-0".into(),
            allocation_id: "alloc-0".into(),
            node_id: "node-01".into(),
            mode: ClaimMode::Write,
            access_mode: AccessMode::ReadWriteOnce,
            attachment_mode: AttachmentMode::FileSystem,
            context: RequestContext {
                region: "global".into(),
                namespace: "default".into(),
                auth_token: "secret".into(),
            },
        }
    }

    #[test]
    fn message_serde_roundtrip() {
        let msg = VolumeRpc::ClaimVolume(claim_request());
        let json = serde_json::to_string(&msg).expect("serialize");
        let de: VolumeRpc = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(de, VolumeRpc::ClaimVolume(_)));
    }

    #[test]
    fn error_message_roundtrip() {
        let msg = VolumeRpc::Error(HookError::MissingVolume {
            source: "ebs-1".into(),
        });
        let json = serde_json::to_string(&msg).expect("serialize");
        let de: VolumeRpc = serde_json::from_str(&json).expect("deserialize");
        assert!(matches!(de, VolumeRpc::Error(HookError::MissingVolume { .. })));
    }

    #[test]
    fn display_formatting() {
        assert_eq!(VolumeRpc::Ok.to_string(), "Ok");
        assert_eq!(
            VolumeRpc::ClaimVolume(claim_request()).to_string(),
            "ClaimVolume(ebs-1-0)"
        );
    }
}
