//! ClipNet Core - LAN clipboard replication over UDP multicast
//!
//! Clipboard changes are framed into datagrams, optionally encrypted with a
//! shared secret, and sent to a multicast group; every other member applies
//! them to its own clipboard. Peers recognise their own looped-back packets
//! by a random per-process sender id, and an echo-debt counter keeps applied
//! clips from being re-broadcast.

pub mod clipboard;
pub mod config;
pub mod crypto;
pub mod net;
pub mod protocol;
pub mod session;

mod error;

pub use error::{Error, Result};

// Re-export key types for convenience
pub use config::Settings;
pub use crypto::{CipherContext, Secret};
pub use net::{Family, LoopbackNetwork, MulticastChannel, UdpConnector};
pub use protocol::{ClipContent, SenderId};
pub use session::{
    Collaborator, GroupConfig, IgnoreReason, InboundOutcome, JoinConfig, LocalOutcome,
    Membership, ReplicationSession,
};
