//! Run command implementation.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use clipnet_core::protocol::constants::{CLIPBOARD_POLL_INTERVAL_MS, HOUSEKEEPING_INTERVAL};
use clipnet_core::{LocalOutcome, Membership, ReplicationSession, Settings, UdpConnector};
use tokio::sync::mpsc;

use crate::desktop::DesktopClipboard;
use crate::ui::print_banner;

type Session = ReplicationSession<UdpConnector, DesktopClipboard>;

/// Per-run overrides of the settings file
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Join immediately instead of waiting for `join`
    #[arg(long)]
    join: bool,
    /// Group port
    #[arg(short, long)]
    port: Option<u16>,
    /// IPv4 group address (enables IPv4)
    #[arg(long)]
    ipv4: Option<String>,
    /// IPv6 group address (enables IPv6)
    #[arg(long)]
    ipv6: Option<String>,
    /// Do not use IPv4
    #[arg(long)]
    no_ipv4: bool,
    /// Encrypt with this passphrase
    #[arg(long)]
    passphrase: Option<String>,
    /// Encrypt with the contents of this file
    #[arg(long)]
    key_file: Option<PathBuf>,
    /// Clear the clipboard this many seconds after a remote update
    #[arg(long)]
    clear_after: Option<u32>,
    /// Ring the terminal bell on clipboard events
    #[arg(long)]
    audio_cue: bool,
    /// Print a preview of clipboard events
    #[arg(long)]
    visual_cue: bool,
    /// Name shown to peers
    #[arg(short, long)]
    name: Option<String>,
}

impl RunArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(port) = self.port {
            settings.group_port = port;
        }
        if let Some(address) = self.ipv4 {
            settings.ipv4.enabled = true;
            settings.ipv4.address = address;
        }
        if self.no_ipv4 {
            settings.ipv4.enabled = false;
        }
        if let Some(address) = self.ipv6 {
            settings.ipv6.enabled = true;
            settings.ipv6.address = address;
        }
        if self.passphrase.is_some() {
            settings.passphrase = self.passphrase;
        }
        if self.key_file.is_some() {
            settings.key_file = self.key_file;
        }
        if self.clear_after.is_some() {
            settings.clear_after_secs = self.clear_after;
        }
        settings.audio_cue |= self.audio_cue;
        settings.visual_cue |= self.visual_cue;
        if self.name.is_some() {
            settings.host_name = self.name;
        }
        settings.auto_rejoin |= self.join;
    }
}

/// Run the clipboard sync until Ctrl+C or `quit`.
pub async fn run_service(path: &Path, args: RunArgs) -> anyhow::Result<()> {
    let mut settings = Settings::load(path)?;
    args.apply(&mut settings);

    print_banner();

    let mut session = ReplicationSession::new(UdpConnector, DesktopClipboard::new(&settings));
    session.set_clear_after(settings.clear_after_secs);

    println!("\x1b[1mName:\x1b[0m   {}", session.collaborator().host());
    println!("\x1b[1mSender:\x1b[0m {}", session.sender_id());

    if settings.auto_rejoin {
        join(&mut session, &settings);
    } else {
        println!("\n\x1b[1;33mType `join` to join the group.\x1b[0m");
    }
    println!("\x1b[2mCommands: join, leave, status, quit. Ctrl+C also stops.\x1b[0m\n");

    // Handle Ctrl+C gracefully
    let (tx, mut shutdown) = mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = tx.blocking_send(());
    })?;

    let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);
    let mut clipboard_poll = tokio::time::interval(Duration::from_millis(CLIPBOARD_POLL_INTERVAL_MS));
    let mut commands = spawn_stdin_reader();

    loop {
        tokio::select! {
            _ = session.readable() => {
                session.poll_inbound();
            }
            _ = housekeeping.tick() => {
                session.tick_housekeeping();
            }
            _ = clipboard_poll.tick() => {
                for content in session.collaborator_mut().poll_local() {
                    match session.on_local_clipboard_changed(&content) {
                        Ok(LocalOutcome::Sent { channels, .. }) => {
                            tracing::debug!("clip sent on {} channel(s)", channels);
                        }
                        Ok(_) => {}
                        Err(e) => eprintln!("\x1b[1;31m✗\x1b[0m Clipboard not sent: {}", e),
                    }
                }
            }
            Some(line) = commands.recv() => {
                if !handle_command(line.trim(), &mut session, &settings) {
                    break;
                }
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }

    println!("\n\x1b[1;33mShutting down...\x1b[0m");
    session.leave();
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    spawn_line_reader(BufReader::new(std::io::stdin()))
}

/// Forward lines from `input` read on a plain thread.
///
/// A blocked read there does not hold up runtime shutdown; the thread dies
/// with the process. The channel closes at end of input.
fn spawn_line_reader<R: BufRead + Send + 'static>(input: R) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn join(session: &mut Session, settings: &Settings) {
    match session.join(&settings.join_config()) {
        Ok(()) => {
            let families: Vec<String> = session.families().iter().map(|f| f.to_string()).collect();
            println!(
                "\x1b[1;32m✓\x1b[0m Joined on port {} ({}){}",
                settings.group_port,
                families.join(", "),
                if session.is_encrypted() { ", encrypted" } else { "" }
            );
        }
        Err(e) => eprintln!("\x1b[1;31m✗\x1b[0m Join failed: {}", e),
    }
}

/// Returns false when the loop should stop.
fn handle_command(command: &str, session: &mut Session, settings: &Settings) -> bool {
    match command {
        "" => {}
        "join" => join(session, settings),
        "leave" => {
            session.leave();
            println!("Left the group.");
        }
        "status" => {
            match session.membership() {
                Membership::Joined => {
                    let families: Vec<String> =
                        session.families().iter().map(|f| f.to_string()).collect();
                    println!("Joined ({})", families.join(", "));
                }
                Membership::NotJoined => println!("Not joined"),
            }
            if let Some(secs) = session.clear_countdown() {
                println!("Clipboard clears in {}s", secs);
            }
        }
        "quit" | "exit" => return false,
        other => println!("Unknown command `{}` (join, leave, status, quit)", other),
    }
    true
}
