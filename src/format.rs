//! Human-readable byte sizes

use bytesize::{GIB, KIB, MIB};

const UNITS: [(&str, u64); 4] = [("Bytes", 1), ("KB", KIB), ("MB", MIB), ("GB", GIB)];

/// Format a byte count using binary units (`Bytes`, `KB`, `MB`, `GB`)
///
/// The scaled value is rounded to two decimals and trailing zeros are
/// dropped, so `1536` becomes `"1.5 KB"`. Sizes beyond the GB range stay
/// in GB.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let (unit, divisor) = UNITS
        .iter()
        .rev()
        .find(|(_, divisor)| bytes >= *divisor)
        .copied()
        .unwrap_or(UNITS[0]);

    // Ties round away from zero: 1.125 KB is "1.13 KB"
    let rounded = (bytes as f64 / divisor as f64 * 100.0).round() / 100.0;

    format!("{} {}", rounded, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(format_file_size(0), "0 Bytes");
    }

    #[test]
    fn test_exact_units() {
        assert_eq!(format_file_size(1), "1 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1_048_576), "1 MB");
        assert_eq!(format_file_size(1_073_741_824), "1 GB");
    }

    #[test]
    fn test_fractional_values() {
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_500_000), "1.43 MB");
        assert_eq!(format_file_size(100 * 1024 * 1024), "100 MB");
    }

    #[test]
    fn test_ties_round_up() {
        assert_eq!(format_file_size(1152), "1.13 KB");
        assert_eq!(format_file_size(3200), "3.13 KB");
        assert_eq!(format_file_size(1_179_648), "1.13 MB");
    }

    #[test]
    fn test_rounding_carries_whole_number() {
        // 1023.999 KB rounds up to 1024 KB rather than switching units
        assert_eq!(format_file_size(1_048_575), "1024 KB");
    }

    #[test]
    fn test_terabytes_stay_in_gigabytes() {
        assert_eq!(format_file_size(1024 * GIB), "1024 GB");
    }
}
