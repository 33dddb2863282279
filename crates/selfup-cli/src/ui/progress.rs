//! Download progress formatting

/// Human-readable byte count: `512 B`, `1.5 KB`, `12.0 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// `received / total (pct%)`, or just `received` without a content length.
pub fn format_download_progress(current: u64, total: Option<u64>) -> String {
    match total.filter(|&t| t > 0) {
        Some(t) => {
            let pct = (current.min(t) * 100) / t;
            format!("{} / {} ({pct}%)", format_size(current), format_size(t))
        }
        None => format_size(current),
    }
}

/// Whether a progress line is worth printing: the first and last update,
/// and every tenth of the total in between.
pub fn is_milestone(previous: u64, current: u64, total: Option<u64>) -> bool {
    match total.filter(|&t| t > 0) {
        Some(t) => current == 0 || current >= t || previous * 10 / t != current * 10 / t,
        None => current == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_progress_with_total() {
        assert_eq!(format_download_progress(512, Some(1024)), "512 B / 1.0 KB (50%)");
        assert_eq!(format_download_progress(2048, None), "2.0 KB");
    }

    #[test]
    fn test_milestones() {
        assert!(is_milestone(0, 0, Some(1000)));
        assert!(!is_milestone(10, 20, Some(1000)));
        assert!(is_milestone(90, 110, Some(1000)));
        assert!(is_milestone(990, 1000, Some(1000)));
        assert!(!is_milestone(100, 200, None));
    }
}
