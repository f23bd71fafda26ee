//! Persistent settings.
//!
//! Stored as JSON at `<config dir>/clipnet/settings.json`. Every field has a
//! default, so a missing file or a file written by an older version still
//! loads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::Secret;
use crate::protocol::constants::{DEFAULT_IPV4_GROUP, DEFAULT_IPV6_GROUP, DEFAULT_PORT};
use crate::session::{GroupConfig, JoinConfig};
use crate::{Error, Result};

/// Multicast group for one family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub enabled: bool,
    pub address: String,
}

/// User settings consumed by the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub group_port: u16,
    pub ipv4: GroupSettings,
    pub ipv6: GroupSettings,
    /// Join as soon as the program starts
    pub auto_rejoin: bool,
    pub passphrase: Option<String>,
    /// Takes precedence over `passphrase`
    pub key_file: Option<PathBuf>,
    /// Clear the clipboard this many seconds after a remote update
    pub clear_after_secs: Option<u32>,
    pub audio_cue: bool,
    pub visual_cue: bool,
    /// Name shown to peers; the host name when unset
    pub host_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            group_port: DEFAULT_PORT,
            ipv4: GroupSettings {
                enabled: true,
                address: DEFAULT_IPV4_GROUP.to_string(),
            },
            ipv6: GroupSettings {
                enabled: false,
                address: DEFAULT_IPV6_GROUP.to_string(),
            },
            auto_rejoin: false,
            passphrase: None,
            key_file: None,
            clear_after_secs: None,
            audio_cue: false,
            visual_cue: false,
            host_name: None,
        }
    }
}

impl Settings {
    /// `<config dir>/clipnet/settings.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clipnet")
            .join("settings.json")
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Config(format!("cannot parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Name to stamp on outgoing clips
    pub fn display_name(&self) -> String {
        self.host_name.clone().unwrap_or_else(local_host_name)
    }

    pub fn secret(&self) -> Option<Secret> {
        match (&self.key_file, &self.passphrase) {
            (Some(path), _) => Some(Secret::KeyFile(path.clone())),
            (None, Some(passphrase)) if !passphrase.is_empty() => Some(Secret::Passphrase(passphrase.clone())),
            _ => None,
        }
    }

    pub fn join_config(&self) -> JoinConfig {
        JoinConfig {
            port: self.group_port,
            ipv4: GroupConfig {
                enabled: self.ipv4.enabled,
                address: self.ipv4.address.clone(),
            },
            ipv6: GroupConfig {
                enabled: self.ipv6.enabled,
                address: self.ipv6.address.clone(),
            },
            secret: self.secret(),
        }
    }
}

/// This machine's host name
pub fn local_host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "clipnet".to_string())
}
