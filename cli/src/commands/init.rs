//! Init command implementation.

use std::path::Path;

use anyhow::bail;
use clipnet_core::protocol::group::{random_ipv4_group, random_ipv6_group};
use clipnet_core::Settings;

/// Write a settings file, optionally with randomized groups.
pub fn init_settings(path: &Path, randomize: bool, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let mut settings = Settings::default();
    if randomize {
        settings.ipv4.address = random_ipv4_group().to_string();
        settings.ipv6.address = random_ipv6_group().to_string();
    }
    settings.save(path)?;

    println!("Wrote {}", path.display());
    println!("  IPv4 group: {}", settings.ipv4.address);
    println!("  IPv6 group: {}", settings.ipv6.address);
    if randomize {
        println!("\n\x1b[1;33mEvery machine in the group must use these same addresses.\x1b[0m");
    }
    Ok(())
}
