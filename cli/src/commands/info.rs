//! Info command implementation.

use std::path::Path;

use clipnet_core::{net, Settings};

/// Display settings and local network information.
pub fn show_info(path: &Path) -> anyhow::Result<()> {
    let settings = Settings::load(path)?;

    println!("\n\x1b[1mClipNet Info\x1b[0m");
    println!("═══════════════════════════════════════");
    println!("\x1b[1mSettings:\x1b[0m    {}", path.display());
    println!("\x1b[1mName:\x1b[0m        {}", settings.display_name());
    println!("\x1b[1mPort:\x1b[0m        {}", settings.group_port);
    println!("\x1b[1mIPv4 group:\x1b[0m  {}", describe(settings.ipv4.enabled, &settings.ipv4.address));
    println!("\x1b[1mIPv6 group:\x1b[0m  {}", describe(settings.ipv6.enabled, &settings.ipv6.address));
    println!(
        "\x1b[1mEncryption:\x1b[0m  {}",
        if settings.secret().is_some() { "on" } else { "off" }
    );
    match settings.clear_after_secs {
        Some(secs) if secs > 0 => println!("\x1b[1mAuto-clear:\x1b[0m  {}s", secs),
        _ => println!("\x1b[1mAuto-clear:\x1b[0m  off"),
    }

    println!("\n\x1b[1mLocal IPs:\x1b[0m");
    for ip in net::local_ips() {
        println!("  • {}", ip);
    }
    println!();
    Ok(())
}

fn describe(enabled: bool, address: &str) -> String {
    if enabled {
        address.to_string()
    } else {
        format!("{} (disabled)", address)
    }
}
