//! Banner and line formatting.

use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Print the application banner.
pub fn print_banner() {
    println!("\n\x1b[1;36m╔══════════════════════════════════════╗\x1b[0m");
    println!("\x1b[1;36m║\x1b[0m              \x1b[1mClipNet\x1b[0m                 \x1b[1;36m║\x1b[0m");
    println!("\x1b[1;36m║\x1b[0m    LAN clipboard sync (multicast)    \x1b[1;36m║\x1b[0m");
    println!("\x1b[1;36m╚══════════════════════════════════════╝\x1b[0m\n");
}

/// Format clipboard text for a one-line preview.
pub fn format_preview(text: &str) -> String {
    const MAX_PREVIEW_CHARS: usize = 50;

    let flat: String = text.chars().map(|c| if c.is_control() { ' ' } else { c }).collect();
    if flat.chars().count() > MAX_PREVIEW_CHARS {
        let cut: String = flat.chars().take(MAX_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

/// Local `HH:MM:SS` for the event log.
pub fn format_time(timestamp: SystemTime) -> String {
    DateTime::<Local>::from(timestamp).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(80);
        let preview = format_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 53);
    }

    #[test]
    fn test_preview_flattens_newlines() {
        assert_eq!(format_preview("a\nb"), "a b");
    }

    #[test]
    fn test_format_time_uses_local_clock() {
        let wall = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(13, 7, 9)
            .unwrap();
        let local = Local.from_local_datetime(&wall).earliest().unwrap();
        assert_eq!(format_time(SystemTime::from(local)), "13:07:09");
    }
}
