//! Centralized protocol constants
//!
//! Every peer on a group must agree on these values, so they live in one
//! place rather than next to the code that happens to use them.

use std::time::Duration;

/// Tag at the start of every packet: ASCII `NTCL`
pub const MAGIC: u32 = (b'N' as u32) << 24 | (b'T' as u32) << 16 | (b'C' as u32) << 8 | b'L' as u32;

/// Fixed header: magic, sender id, action, payload size (4 bytes each)
pub const HEADER_SIZE: usize = 16;

/// Largest payload accepted for a single datagram.
///
/// The protocol has no fragmentation, so anything above this is refused
/// before it reaches the socket.
pub const MAX_PAYLOAD_SIZE: usize = 60 * 1024;

/// Receive buffer size, large enough for any UDP datagram
pub const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Default UDP port shared by the group
pub const DEFAULT_PORT: u16 = 45454;

/// Default IPv4 multicast group (administratively scoped)
pub const DEFAULT_IPV4_GROUP: &str = "239.255.43.21";

/// Default IPv6 multicast group (transient, link-local scope)
pub const DEFAULT_IPV6_GROUP: &str = "ff12::2115";

/// Multicast TTL / hop limit; replication never leaves the subnet
pub const MULTICAST_TTL: u32 = 1;

/// Housekeeping tick period driving the auto-clear countdown
pub const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);

/// Local clipboard polling interval in milliseconds
pub const CLIPBOARD_POLL_INTERVAL_MS: u64 = 500;

/// Salt prepended to the secret before hashing it into a key
pub const KEY_SALT: &[u8] = b"d5yN+/?/)ejzO9Q";

/// Seed of the generator that produces the shared IV
pub const IV_SEED: u32 = 0x00C0_FFEE;
