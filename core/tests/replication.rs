//! End-to-end replication between sessions sharing one segment.

use std::time::SystemTime;

use clipnet_core::clipboard::{ClipboardManager, ClipboardSnapshot};
use clipnet_core::{
    ClipContent, Collaborator, Error, GroupConfig, InboundOutcome, JoinConfig, LocalOutcome,
    LoopbackNetwork, ReplicationSession, Secret, SenderId, UdpConnector,
};

const PORT: u16 = 45454;
const GROUP: &str = "239.255.43.21";

#[derive(Default)]
struct Desk {
    clipboard: Option<(String, String)>,
    clears: usize,
}

impl Collaborator for Desk {
    fn write_clipboard(&mut self, text: &str, html: &str) {
        self.clipboard = Some((text.to_string(), html.to_string()));
    }

    fn clear_clipboard(&mut self) {
        self.clipboard = None;
        self.clears += 1;
    }

    fn log(&mut self, _timestamp: SystemTime, _message: &str) {}
}

fn join_config(passphrase: Option<&str>) -> JoinConfig {
    JoinConfig {
        port: PORT,
        ipv4: GroupConfig::enabled(GROUP),
        ipv6: GroupConfig::disabled(),
        secret: passphrase.map(|p| Secret::Passphrase(p.to_string())),
    }
}

fn peer(net: &LoopbackNetwork, id: u32, passphrase: Option<&str>) -> ReplicationSession<LoopbackNetwork, Desk> {
    let mut session = ReplicationSession::with_sender_id(net.clone(), Desk::default(), SenderId::new(id));
    session.join(&join_config(passphrase)).unwrap();
    session
}

fn hello() -> ClipContent {
    ClipContent::new("A", "hello", "")
}

#[test]
fn plaintext_clip_reaches_peer() {
    let net = LoopbackNetwork::new();
    let mut a = peer(&net, 111, None);
    let mut b = peer(&net, 222, None);

    let LocalOutcome::Sent { datagram, channels } = a.on_local_clipboard_changed(&hello()).unwrap() else {
        panic!("A did not send");
    };
    assert_eq!(channels, 1);

    assert_eq!(b.on_datagram_received(&datagram), InboundOutcome::Applied { host: "A".to_string() });
    assert_eq!(b.collaborator().clipboard, Some(("hello".to_string(), String::new())));
}

#[test]
fn encrypted_clip_reaches_only_matching_secret() {
    let net = LoopbackNetwork::new();
    let mut a = peer(&net, 111, Some("secret"));
    let mut b = peer(&net, 222, Some("secret"));
    let mut c = peer(&net, 333, Some("wrong"));

    a.on_local_clipboard_changed(&hello()).unwrap();

    assert_eq!(b.poll_inbound(), 1);
    assert_eq!(b.collaborator().clipboard, Some(("hello".to_string(), String::new())));

    assert_eq!(c.poll_inbound(), 0);
    assert_eq!(c.collaborator().clipboard, None);
    assert_eq!(c.echo_debt(), 0);
}

#[test]
fn applied_clip_is_not_bounced_back() {
    let net = LoopbackNetwork::new();
    let mut a = peer(&net, 111, None);
    let mut b = peer(&net, 222, None);

    a.on_local_clipboard_changed(&hello()).unwrap();
    assert_eq!(b.poll_inbound(), 1);

    // B's clipboard watcher now reports the write it just made.
    let echoed = ClipContent::new("B", "hello", "");
    assert_eq!(b.on_local_clipboard_changed(&echoed).unwrap(), LocalOutcome::Suppressed);
    assert_eq!(a.poll_inbound(), 0);

    // A real edit on B does travel back to A.
    let edit = ClipContent::new("B", "hello, world", "");
    assert!(matches!(b.on_local_clipboard_changed(&edit).unwrap(), LocalOutcome::Sent { .. }));
    assert_eq!(a.poll_inbound(), 1);
    assert_eq!(a.collaborator().clipboard, Some(("hello, world".to_string(), String::new())));
}

#[test]
fn auto_clear_after_five_ticks() {
    let net = LoopbackNetwork::new();
    let mut a = peer(&net, 111, None);
    let mut b = peer(&net, 222, None);
    b.set_clear_after(Some(5));

    a.on_local_clipboard_changed(&hello()).unwrap();
    b.poll_inbound();

    for tick in 1..=5 {
        b.tick_housekeeping();
        let expected = if tick == 5 { 1 } else { 0 };
        assert_eq!(b.collaborator().clears, expected, "after tick {}", tick);
    }
    assert_eq!(b.collaborator().clipboard, None);
}

#[test]
fn join_fails_with_only_a_bad_ipv6_group() {
    let config = JoinConfig {
        port: PORT,
        ipv4: GroupConfig::disabled(),
        ipv6: GroupConfig::enabled("ff12::zz"),
        secret: None,
    };

    let mut session = ReplicationSession::new(UdpConnector, Desk::default());
    assert!(matches!(session.join(&config), Err(Error::NoUsableFamily)));

    let mut session = ReplicationSession::new(LoopbackNetwork::new(), Desk::default());
    assert!(matches!(session.join(&config), Err(Error::NoUsableFamily)));
}

#[test]
fn join_fails_with_unicast_ipv6_group() {
    let config = JoinConfig {
        port: PORT,
        ipv4: GroupConfig::disabled(),
        ipv6: GroupConfig::enabled("::1"),
        secret: None,
    };

    let mut session = ReplicationSession::new(UdpConnector, Desk::default());
    assert!(matches!(session.join(&config), Err(Error::NoUsableFamily)));
}

/// A desk whose clipboard is only seen through periodic polls, the way the
/// desktop front end sees it.
struct PolledDesk {
    board: Option<ClipboardSnapshot>,
    manager: ClipboardManager,
    /// Models a platform that cannot read html back
    html_readable: bool,
}

impl PolledDesk {
    fn new(html_readable: bool) -> Self {
        Self {
            board: None,
            manager: ClipboardManager::new(),
            html_readable,
        }
    }

    fn read(&self) -> Option<ClipboardSnapshot> {
        let board = self.board.clone()?;
        let html = if self.html_readable { board.html } else { String::new() };
        (!board.text.is_empty() || !html.is_empty()).then_some(ClipboardSnapshot { text: board.text, html })
    }
}

impl Collaborator for PolledDesk {
    fn write_clipboard(&mut self, text: &str, html: &str) {
        self.board = Some(ClipboardSnapshot {
            text: text.to_string(),
            html: html.to_string(),
        });
        self.manager.expect_echo();
    }

    fn clear_clipboard(&mut self) {
        self.board = None;
    }
}

fn polled_peer(net: &LoopbackNetwork, id: u32, html_readable: bool) -> ReplicationSession<LoopbackNetwork, PolledDesk> {
    let mut session =
        ReplicationSession::with_sender_id(net.clone(), PolledDesk::new(html_readable), SenderId::new(id));
    session.join(&join_config(None)).unwrap();
    session
}

fn poll_clipboard(session: &mut ReplicationSession<LoopbackNetwork, PolledDesk>) -> Vec<LocalOutcome> {
    let snapshot = session.collaborator().read();
    let changes = session.collaborator_mut().manager.observe(snapshot);
    changes
        .into_iter()
        .map(|change| session.on_local_clipboard_changed(&change.into_content("B")).unwrap())
        .collect()
}

fn user_copy(session: &mut ReplicationSession<LoopbackNetwork, PolledDesk>, text: &str) {
    session.collaborator_mut().board = Some(ClipboardSnapshot {
        text: text.to_string(),
        html: String::new(),
    });
}

#[test]
fn two_clips_between_polls_settle_the_echo_debt() {
    let net = LoopbackNetwork::new();
    let mut a = peer(&net, 111, None);
    let mut b = polled_peer(&net, 222, true);

    a.on_local_clipboard_changed(&ClipContent::new("A", "one", "")).unwrap();
    a.on_local_clipboard_changed(&ClipContent::new("A", "two", "")).unwrap();
    assert_eq!(b.poll_inbound(), 2);
    assert_eq!(b.echo_debt(), 2);

    assert_eq!(poll_clipboard(&mut b), vec![LocalOutcome::Suppressed, LocalOutcome::Suppressed]);
    assert_eq!(b.echo_debt(), 0);

    user_copy(&mut b, "typed on B");
    assert!(matches!(poll_clipboard(&mut b).as_slice(), [LocalOutcome::Sent { .. }]));
    assert_eq!(a.poll_inbound(), 1);
    assert_eq!(a.collaborator().clipboard, Some(("typed on B".to_string(), String::new())));
}

#[test]
fn unreadable_html_clip_settles_the_echo_debt() {
    let net = LoopbackNetwork::new();
    let mut a = peer(&net, 111, None);
    let mut b = polled_peer(&net, 222, false);

    a.on_local_clipboard_changed(&ClipContent::new("A", "", "<b>bold</b>")).unwrap();
    assert_eq!(b.poll_inbound(), 1);

    assert_eq!(poll_clipboard(&mut b), vec![LocalOutcome::Suppressed]);
    assert_eq!(b.echo_debt(), 0);

    user_copy(&mut b, "typed on B");
    assert!(matches!(poll_clipboard(&mut b).as_slice(), [LocalOutcome::Sent { .. }]));
    assert_eq!(a.poll_inbound(), 1);
}
