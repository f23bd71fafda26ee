//! Replication session: the state machine between the local clipboard and
//! the multicast group.
//!
//! All entry points take `&mut self` and are expected to be driven from one
//! task: local clipboard notifications, inbound datagrams and the one-second
//! housekeeping tick.

use std::net::IpAddr;
use std::time::SystemTime;

use crate::crypto::{CipherContext, Secret};
use crate::net::{Channel, Connector, Family, MulticastChannel, UdpConnector};
use crate::protocol::{self, Action, ClipContent, SenderId};
use crate::{Error, Result};

/// Calls the session makes into the surrounding application.
pub trait Collaborator {
    /// Put a received clip on the real clipboard
    fn write_clipboard(&mut self, text: &str, html: &str);

    /// Auto-clear fired
    fn clear_clipboard(&mut self);

    fn notify_audio_cue(&mut self) {}

    fn notify_visual_cue(&mut self, _display_text: &str) {}

    /// User-facing event log (not diagnostics; those go through `tracing`)
    fn log(&mut self, _timestamp: SystemTime, _message: &str) {}
}

/// Membership state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    NotJoined,
    Joined,
}

/// One family's group setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    pub enabled: bool,
    pub address: String,
}

impl GroupConfig {
    pub fn enabled(address: impl Into<String>) -> Self {
        Self {
            enabled: true,
            address: address.into(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            address: String::new(),
        }
    }
}

/// Everything `join` needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    pub port: u16,
    pub ipv4: GroupConfig,
    pub ipv6: GroupConfig,
    /// Encrypt payloads when set
    pub secret: Option<Secret>,
}

/// Result of a local clipboard change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOutcome {
    /// Change was the echo of a clip we just applied
    Suppressed,
    NotJoined,
    /// Clip had neither text nor html
    Empty,
    /// Broadcast; `datagram` is exactly what went on the wire
    Sent { datagram: Vec<u8>, channels: usize },
}

/// Result of handling one inbound datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    Applied { host: String },
    Ignored(IgnoreReason),
}

/// Why a datagram was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotJoined,
    Malformed,
    OwnPacket,
    UnsupportedAction,
    Undecryptable,
    BadContent,
    EmptyClip,
}

struct Joined<Ch> {
    channels: Vec<Ch>,
    cipher: Option<CipherContext>,
}

/// Clipboard replication state for one process.
pub struct ReplicationSession<K: Connector, C: Collaborator> {
    connector: K,
    collaborator: C,
    sender_id: SenderId,
    joined: Option<Joined<K::Channel>>,
    echo_debt: u32,
    clear_after_secs: Option<u32>,
    clear_countdown: Option<u32>,
}

impl<K: Connector, C: Collaborator> ReplicationSession<K, C> {
    /// Create with a freshly drawn sender id
    pub fn new(connector: K, collaborator: C) -> Self {
        Self::with_sender_id(connector, collaborator, SenderId::random())
    }

    pub fn with_sender_id(connector: K, collaborator: C, sender_id: SenderId) -> Self {
        Self {
            connector,
            collaborator,
            sender_id,
            joined: None,
            echo_debt: 0,
            clear_after_secs: None,
            clear_countdown: None,
        }
    }

    pub fn sender_id(&self) -> SenderId {
        self.sender_id
    }

    pub fn membership(&self) -> Membership {
        if self.joined.is_some() {
            Membership::Joined
        } else {
            Membership::NotJoined
        }
    }

    /// Families with a live channel
    pub fn families(&self) -> Vec<Family> {
        self.joined
            .as_ref()
            .map(|j| j.channels.iter().map(Channel::family).collect())
            .unwrap_or_default()
    }

    pub fn is_encrypted(&self) -> bool {
        self.joined.as_ref().is_some_and(|j| j.cipher.is_some())
    }

    pub fn echo_debt(&self) -> u32 {
        self.echo_debt
    }

    /// Seconds left before the auto-clear fires, if armed
    pub fn clear_countdown(&self) -> Option<u32> {
        self.clear_countdown
    }

    /// Enable (`Some(n)`, n > 0) or disable auto-clear for future remote clips.
    pub fn set_clear_after(&mut self, seconds: Option<u32>) {
        self.clear_after_secs = seconds.filter(|&s| s > 0);
        if self.clear_after_secs.is_none() {
            self.clear_countdown = None;
        }
    }

    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    pub fn collaborator_mut(&mut self) -> &mut C {
        &mut self.collaborator
    }

    /// Join the group on every enabled family.
    ///
    /// A family that fails to come up is skipped with a warning; the join
    /// only fails when no family is usable. Joining while joined rebuilds
    /// everything from `config`; if that fails the existing membership is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for a zero port, no configured group, or a
    ///   secret that cannot be loaded
    /// - [`Error::NoUsableFamily`] when every configured family failed
    pub fn join(&mut self, config: &JoinConfig) -> Result<()> {
        if config.port == 0 {
            return Err(Error::Config("group port is not set".to_string()));
        }

        let requested: Vec<(Family, &str)> = [
            (Family::V4, &config.ipv4),
            (Family::V6, &config.ipv6),
        ]
        .into_iter()
        .filter(|(_, group)| group.enabled && !group.address.trim().is_empty())
        .map(|(family, group)| (family, group.address.trim()))
        .collect();

        if requested.is_empty() {
            return Err(Error::Config("no multicast group configured".to_string()));
        }

        let cipher = config
            .secret
            .as_ref()
            .map(CipherContext::from_secret)
            .transpose()
            .map_err(|e| Error::Config(e.to_string()))?;

        let mut channels = Vec::new();
        for (family, address) in requested {
            match self.open_channel(family, config.port, address) {
                Ok(channel) => channels.push(channel),
                Err(e) => tracing::warn!("{} disabled: {}", family, e),
            }
        }

        if channels.is_empty() {
            tracing::warn!("no multicast family could be joined");
            return Err(Error::NoUsableFamily);
        }

        self.leave();

        tracing::info!(
            "joined as sender {} on {} channel(s), encryption {}",
            self.sender_id,
            channels.len(),
            if cipher.is_some() { "on" } else { "off" }
        );

        self.joined = Some(Joined { channels, cipher });
        Ok(())
    }

    fn open_channel(&self, family: Family, port: u16, address: &str) -> Result<K::Channel> {
        let group: IpAddr = address
            .parse()
            .map_err(|_| Error::Config(format!("invalid {} group address: {}", family, address)))?;

        if Family::of(&group) != family {
            return Err(Error::Config(format!("{} is not an {} address", group, family)));
        }

        self.connector.open(port, group)
    }

    /// Leave the group. No-op when not joined.
    pub fn leave(&mut self) {
        if let Some(mut joined) = self.joined.take() {
            for channel in &mut joined.channels {
                channel.leave();
            }
            tracing::info!("left multicast group");
        }
    }

    /// Handle a change of the local clipboard.
    ///
    /// Each applied remote clip leaves one unit of echo debt, and the write it
    /// causes comes back here as a local change; that change pays the debt
    /// instead of being broadcast.
    ///
    /// # Errors
    ///
    /// Returns an error if the clip cannot be serialized, encrypted or framed
    /// (e.g. it is too large for one datagram).
    pub fn on_local_clipboard_changed(&mut self, content: &ClipContent) -> Result<LocalOutcome> {
        if self.echo_debt > 0 {
            self.echo_debt -= 1;
            return Ok(LocalOutcome::Suppressed);
        }

        let Some(joined) = &self.joined else {
            return Ok(LocalOutcome::NotJoined);
        };

        if content.is_empty() {
            return Ok(LocalOutcome::Empty);
        }

        let plaintext = content.to_bytes()?;
        let payload = match &joined.cipher {
            Some(cipher) => cipher.encrypt(&plaintext)?,
            None => plaintext,
        };
        let datagram = protocol::encode(Action::ClipData, self.sender_id, &payload)?;

        let mut sent = 0;
        for channel in &joined.channels {
            match channel.send(&datagram) {
                Ok(()) => sent += 1,
                Err(e) => tracing::warn!("{} send failed: {}", channel.family(), e),
            }
        }

        self.collaborator
            .log(SystemTime::now(), "Sending clipboard data to multicast group");
        self.collaborator.notify_audio_cue();
        let display = if content.text.is_empty() { &content.html } else { &content.text };
        self.collaborator.notify_visual_cue(display);

        Ok(LocalOutcome::Sent {
            datagram,
            channels: sent,
        })
    }

    /// Handle one datagram from the group.
    pub fn on_datagram_received(&mut self, bytes: &[u8]) -> InboundOutcome {
        let Some(joined) = &self.joined else {
            return InboundOutcome::Ignored(IgnoreReason::NotJoined);
        };

        let packet = match protocol::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!("dropping datagram: {}", e);
                return InboundOutcome::Ignored(IgnoreReason::Malformed);
            }
        };

        if packet.sender_id == self.sender_id {
            return InboundOutcome::Ignored(IgnoreReason::OwnPacket);
        }

        if packet.action != Action::ClipData {
            return InboundOutcome::Ignored(IgnoreReason::UnsupportedAction);
        }

        let plaintext = match &joined.cipher {
            Some(cipher) => match cipher.decrypt(packet.payload) {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    tracing::debug!("dropping datagram from {}: {}", packet.sender_id, e);
                    return InboundOutcome::Ignored(IgnoreReason::Undecryptable);
                }
            },
            None => packet.payload.to_vec(),
        };

        let content = match ClipContent::from_bytes(&plaintext) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("unreadable clip from {}: {}", packet.sender_id, e);
                return InboundOutcome::Ignored(IgnoreReason::BadContent);
            }
        };

        if content.is_empty() {
            return InboundOutcome::Ignored(IgnoreReason::EmptyClip);
        }

        self.apply(content)
    }

    fn apply(&mut self, content: ClipContent) -> InboundOutcome {
        self.echo_debt = self.echo_debt.saturating_add(1);
        self.collaborator.write_clipboard(&content.text, &content.html);

        if let Some(seconds) = self.clear_after_secs {
            self.clear_countdown = Some(seconds);
        }

        self.collaborator
            .log(SystemTime::now(), &format!("Peer {}: Clipboard event", content.host));
        self.collaborator.notify_audio_cue();
        let display = if content.text.is_empty() { &content.html } else { &content.text };
        self.collaborator.notify_visual_cue(display);

        InboundOutcome::Applied { host: content.host }
    }

    /// Drain every channel and handle what arrived. Returns how many clips
    /// were applied.
    pub fn poll_inbound(&mut self) -> usize {
        let datagrams: Vec<Vec<u8>> = match &self.joined {
            Some(joined) => joined.channels.iter().flat_map(|c| c.poll()).collect(),
            None => return 0,
        };

        datagrams
            .iter()
            .filter(|d| matches!(self.on_datagram_received(d), InboundOutcome::Applied { .. }))
            .count()
    }

    /// Once-a-second tick driving the auto-clear countdown.
    pub fn tick_housekeeping(&mut self) {
        let Some(remaining) = self.clear_countdown else {
            return;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.clear_countdown = None;
            self.collaborator.clear_clipboard();
            tracing::debug!("auto-clear fired");
        } else {
            self.clear_countdown = Some(remaining);
        }
    }
}

impl<C: Collaborator> ReplicationSession<UdpConnector, C> {
    /// Wait until any joined socket has a pending datagram.
    ///
    /// Pends forever while not joined, so it can sit in a `select!` next to
    /// the other event sources.
    pub async fn readable(&self) {
        let channels: &[MulticastChannel] = match &self.joined {
            Some(joined) => &joined.channels,
            None => &[],
        };

        match channels {
            [] => std::future::pending().await,
            [only] => {
                let _ = only.readable().await;
            }
            [first, second, ..] => {
                tokio::select! {
                    _ = first.readable() => {}
                    _ = second.readable() => {}
                }
            }
        }
    }
}
