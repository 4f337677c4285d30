//! QUIC transport for control-plane volume RPCs.
//!
//! [`message::VolumeRpc`] is the JSON envelope and [`client::QuicControlPlaneClient`]
//! the production [`ControlPlaneClient`](crate::client::ControlPlaneClient)
//! built on `quinn` bi-directional streams.

pub mod client;
pub mod message;
