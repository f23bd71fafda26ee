//! Multicast transport
//!
//! The session talks to the network through two small traits so that the
//! replication logic can run over real sockets ([`UdpConnector`]) or over the
//! in-process [`LoopbackNetwork`].

pub mod loopback;
mod multicast;

use std::fmt;
use std::io;
use std::net::IpAddr;

pub use loopback::LoopbackNetwork;
pub use multicast::{MulticastChannel, UdpConnector};

use crate::protocol::constants::MAX_DATAGRAM_SIZE;
use crate::Result;

/// IP family of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// A joined multicast endpoint for one IP family.
pub trait Channel {
    fn family(&self) -> Family;

    /// Fire-and-forget send to the group
    fn send(&self, datagram: &[u8]) -> io::Result<()>;

    /// Copy one pending datagram into `buf` without blocking; returns its
    /// length, or `None` when nothing is pending.
    fn try_recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>>;

    /// Leave the group and release the endpoint. Idempotent.
    fn leave(&mut self);

    /// Drain everything currently pending.
    ///
    /// The iterator stops at the first empty read; calling `poll` again later
    /// picks up whatever arrived since. One receive buffer serves the whole
    /// drain.
    fn poll(&self) -> Drain<'_, Self>
    where
        Self: Sized,
    {
        Drain {
            channel: self,
            buf: Vec::new(),
        }
    }
}

/// Opens channels; one call per enabled family on every join.
pub trait Connector {
    type Channel: Channel;

    fn open(&self, port: u16, group: IpAddr) -> Result<Self::Channel>;
}

/// Iterator returned by [`Channel::poll`]
pub struct Drain<'a, C> {
    channel: &'a C,
    buf: Vec<u8>,
}

impl<C: Channel> Iterator for Drain<'_, C> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            self.buf = vec![0u8; MAX_DATAGRAM_SIZE];
        }

        match self.channel.try_recv(&mut self.buf) {
            Ok(len) => len.map(|len| self.buf[..len].to_vec()),
            Err(e) => {
                tracing::debug!("{} receive error: {}", self.channel.family(), e);
                None
            }
        }
    }
}

/// Non-loopback addresses of this host, for diagnostics
pub fn local_ips() -> Vec<IpAddr> {
    let mut ips = Vec::new();

    if let Ok(interfaces) = get_if_addrs::get_if_addrs() {
        for iface in interfaces {
            if !iface.is_loopback() {
                ips.push(iface.ip());
            }
        }
    }

    ips
}
