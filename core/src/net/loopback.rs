//! In-process multicast bus.
//!
//! Behaves like a LAN segment where every datagram sent to a group/port is
//! delivered to every channel joined to that group/port, the sender
//! included. Lets tests (and embedders without a network) run several
//! sessions against each other deterministically.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Channel, Connector, Family};
use crate::{Error, Result};

#[derive(Default)]
struct Bus {
    next_id: u64,
    members: HashMap<u64, Member>,
    refused: HashSet<Family>,
}

struct Member {
    group: IpAddr,
    port: u16,
    inbox: VecDeque<Vec<u8>>,
}

/// Shared handle to the bus; clones refer to the same segment.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    bus: Arc<Mutex<Bus>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn bus(&self) -> MutexGuard<'_, Bus> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every later `open` for `family` fail, as on a host without it.
    pub fn refuse(&self, family: Family) {
        self.bus().refused.insert(family);
    }

    /// Deliver raw bytes to a group as if some other host had sent them.
    pub fn inject(&self, port: u16, group: IpAddr, datagram: &[u8]) {
        deliver(&mut self.bus(), port, group, datagram);
    }

    /// Number of channels currently joined to `group` on `port`
    pub fn members(&self, port: u16, group: IpAddr) -> usize {
        self.bus()
            .members
            .values()
            .filter(|m| m.port == port && m.group == group)
            .count()
    }
}

fn deliver(bus: &mut Bus, port: u16, group: IpAddr, datagram: &[u8]) {
    for member in bus.members.values_mut() {
        if member.port == port && member.group == group {
            member.inbox.push_back(datagram.to_vec());
        }
    }
}

impl Connector for LoopbackNetwork {
    type Channel = LoopbackChannel;

    fn open(&self, port: u16, group: IpAddr) -> Result<LoopbackChannel> {
        if !group.is_multicast() {
            return Err(Error::Network(format!("{} is not a multicast address", group)));
        }

        let family = Family::of(&group);
        let mut bus = self.bus();
        if bus.refused.contains(&family) {
            return Err(Error::Network(format!("{} is unavailable", family)));
        }

        let id = bus.next_id;
        bus.next_id += 1;
        bus.members.insert(
            id,
            Member {
                group,
                port,
                inbox: VecDeque::new(),
            },
        );

        Ok(LoopbackChannel {
            id,
            family,
            group,
            port,
            network: self.clone(),
            joined: true,
        })
    }
}

/// A channel on a [`LoopbackNetwork`]
pub struct LoopbackChannel {
    id: u64,
    family: Family,
    group: IpAddr,
    port: u16,
    network: LoopbackNetwork,
    joined: bool,
}

impl Channel for LoopbackChannel {
    fn family(&self) -> Family {
        self.family
    }

    fn send(&self, datagram: &[u8]) -> io::Result<()> {
        if !self.joined {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "channel has left the group"));
        }
        deliver(&mut self.network.bus(), self.port, self.group, datagram);
        Ok(())
    }

    fn try_recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        let datagram = self
            .network
            .bus()
            .members
            .get_mut(&self.id)
            .and_then(|m| m.inbox.pop_front());

        Ok(datagram.map(|datagram| {
            // Truncate like a UDP socket does
            let len = datagram.len().min(buf.len());
            buf[..len].copy_from_slice(&datagram[..len]);
            len
        }))
    }

    fn leave(&mut self) {
        if self.joined {
            self.network.bus().members.remove(&self.id);
            self.joined = false;
        }
    }
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> IpAddr {
        "239.1.2.3".parse().unwrap()
    }

    #[test]
    fn test_delivery_to_all_members() {
        let net = LoopbackNetwork::new();
        let a = net.open(9000, group()).unwrap();
        let b = net.open(9000, group()).unwrap();
        let other_port = net.open(9001, group()).unwrap();

        a.send(b"ping").unwrap();

        assert_eq!(b.poll().collect::<Vec<_>>(), vec![b"ping".to_vec()]);
        // The sender hears its own datagram, like IP_MULTICAST_LOOP.
        assert_eq!(a.poll().count(), 1);
        assert_eq!(other_port.poll().count(), 0);
    }

    #[test]
    fn test_poll_is_restartable() {
        let net = LoopbackNetwork::new();
        let a = net.open(9000, group()).unwrap();

        net.inject(9000, group(), b"one");
        assert_eq!(a.poll().count(), 1);
        assert_eq!(a.poll().count(), 0);

        net.inject(9000, group(), b"two");
        net.inject(9000, group(), b"three");
        assert_eq!(a.poll().collect::<Vec<_>>(), vec![b"two".to_vec(), b"three".to_vec()]);
    }

    #[test]
    fn test_drain_reuses_buffer_without_stale_bytes() {
        let net = LoopbackNetwork::new();
        let a = net.open(9000, group()).unwrap();

        let big = vec![0xAB; 1000];
        net.inject(9000, group(), &big);
        net.inject(9000, group(), b"abc");
        assert_eq!(a.poll().collect::<Vec<_>>(), vec![big, b"abc".to_vec()]);

        let mut tiny = [0u8; 2];
        net.inject(9000, group(), b"truncated");
        assert_eq!(a.try_recv(&mut tiny).unwrap(), Some(2));
        assert_eq!(&tiny, b"tr");
        assert_eq!(a.try_recv(&mut tiny).unwrap(), None);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let net = LoopbackNetwork::new();
        let mut a = net.open(9000, group()).unwrap();
        assert_eq!(net.members(9000, group()), 1);

        a.leave();
        a.leave();
        assert_eq!(net.members(9000, group()), 0);
        assert!(a.send(b"x").is_err());
    }

    #[test]
    fn test_refused_family() {
        let net = LoopbackNetwork::new();
        net.refuse(Family::V6);

        assert!(net.open(9000, "ff12::1".parse().unwrap()).is_err());
        assert!(net.open(9000, group()).is_ok());
    }

    #[test]
    fn test_non_multicast_rejected() {
        let net = LoopbackNetwork::new();
        assert!(net.open(9000, "10.0.0.1".parse().unwrap()).is_err());
    }
}
