//! UDP multicast channel
//!
//! Each channel owns one non-blocking socket bound to the group port on the
//! unspecified address of its family. Address (and, on Unix, port) reuse is
//! enabled so several instances on one host can share the port. Multicast
//! loopback stays on; our own packets come back and are discarded by sender
//! id further up.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;

use super::{Channel, Connector, Family};
use crate::protocol::constants::MULTICAST_TTL;
use crate::{Error, Result};

/// Opens real [`MulticastChannel`]s.
///
/// Must be used from inside a tokio runtime, since sockets are registered
/// with its reactor.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector;

impl Connector for UdpConnector {
    type Channel = MulticastChannel;

    fn open(&self, port: u16, group: IpAddr) -> Result<MulticastChannel> {
        MulticastChannel::join(port, group)
    }
}

/// Joined multicast socket for one family
#[derive(Debug)]
pub struct MulticastChannel {
    family: Family,
    group: IpAddr,
    port: u16,
    socket: Option<UdpSocket>,
}

impl MulticastChannel {
    /// Bind the group port and join `group`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if `group` is not a multicast address or the
    /// socket cannot be set up.
    pub fn join(port: u16, group: IpAddr) -> Result<Self> {
        if !group.is_multicast() {
            return Err(Error::Network(format!("{} is not a multicast address", group)));
        }

        let family = Family::of(&group);
        let socket = bind_socket(port, group)
            .map_err(|e| Error::Network(format!("cannot join {} group {}: {}", family, group, e)))?;

        let socket = UdpSocket::from_std(socket.into())?;

        tracing::info!("joined {} multicast group {} on port {}", family, group, port);

        Ok(Self {
            family,
            group,
            port,
            socket: Some(socket),
        })
    }

    pub fn group(&self) -> IpAddr {
        self.group
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait until a datagram is pending. Never resolves after [`Channel::leave`].
    pub async fn readable(&self) -> io::Result<()> {
        match &self.socket {
            Some(socket) => socket.readable().await,
            None => std::future::pending().await,
        }
    }
}

fn bind_socket(port: u16, group: IpAddr) -> io::Result<Socket> {
    let domain = match group {
        IpAddr::V4(_) => Domain::IPV4,
        IpAddr::V6(_) => Domain::IPV6,
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true)?;

    match group {
        IpAddr::V4(group) => {
            let local = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
            socket.bind(&SockAddr::from(local))?;
            socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
            socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
        }
        IpAddr::V6(group) => {
            socket.set_only_v6(true)?;
            let local = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
            socket.bind(&SockAddr::from(local))?;
            socket.join_multicast_v6(&group, 0)?;
            socket.set_multicast_hops_v6(MULTICAST_TTL)?;
        }
    }

    socket.set_nonblocking(true)?;
    Ok(socket)
}

impl Channel for MulticastChannel {
    fn family(&self) -> Family {
        self.family
    }

    fn send(&self, datagram: &[u8]) -> io::Result<()> {
        let Some(socket) = &self.socket else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "channel has left the group"));
        };

        match socket.try_send_to(datagram, SocketAddr::new(self.group, self.port)) {
            Ok(_) => Ok(()),
            // Multicast is lossy anyway; a full send buffer is just another drop.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tracing::debug!("{} send buffer full, datagram dropped", self.family);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn try_recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        let Some(socket) = &self.socket else {
            return Ok(None);
        };

        match socket.try_recv_from(buf) {
            Ok((len, _src)) => Ok(Some(len)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn leave(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };

        let result = match self.group {
            IpAddr::V4(group) => socket.leave_multicast_v4(group, Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(group) => socket.leave_multicast_v6(&group, 0),
        };
        if let Err(e) = result {
            tracing::debug!("leaving {} group {}: {}", self.family, self.group, e);
        }

        tracing::info!("left {} multicast group {}", self.family, self.group);
    }
}

impl Drop for MulticastChannel {
    fn drop(&mut self) {
        self.leave();
    }
}
