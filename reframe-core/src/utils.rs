//! Formatting helpers shared by log lines and the CLI summaries.

use std::path::Path;

/// Formats seconds as HH:MM:SS.mmm (e.g., 3725.5 -> "01:02:05.500"). Returns "??:??:??" for invalid inputs.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??".to_string();
    }

    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

/// Formats bytes with appropriate binary units (B, KiB, MiB, GiB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats media ticks as a duration, e.g. `format_ticks(90000, 90000)` -> "00:00:01.000".
#[must_use]
pub fn format_ticks(ticks: u64, timescale: u32) -> String {
    if timescale == 0 {
        return "??:??:??".to_string();
    }
    format_duration(ticks as f64 / timescale as f64)
}

/// File name of `path` for display, falling back to the full path.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "00:00:00.000");
        assert_eq!(format_duration(59.9), "00:00:59.900");
        assert_eq!(format_duration(3661.0), "01:01:01.000");
        assert_eq!(format_duration(90061.25), "25:01:01.250");

        assert_eq!(format_duration(-1.0), "??:??:??");
        assert_eq!(format_duration(f64::NAN), "??:??:??");
        assert_eq!(format_duration(f64::INFINITY), "??:??:??");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(4 * 1024 * 1024), "4.00 MiB");
        assert_eq!(format_bytes(1024 * 1024 * 1024 * 2), "2.00 GiB");
    }

    #[test]
    fn test_format_ticks() {
        assert_eq!(format_ticks(48048, 24000), "00:00:02.002");
        assert_eq!(format_ticks(10, 0), "??:??:??");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/tmp/movie.json")), "movie.json");
        assert_eq!(display_name(Path::new("/")), "/");
    }
}
