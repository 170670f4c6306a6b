use super::types::FileRecord;

const UNIT_SIZE: f64 = 1024.0;

/// Storage quota shown against total usage
pub const STORAGE_LIMIT_BYTES: u64 = 5 * 1024 * 1024 * 1024 * 1024;

/// Parses the backend's "1.5 MB" strings. Unknown units count as bytes, garbage as 0.
pub fn parse_size(size: &str) -> u64 {
    let mut parts = size.split_whitespace();
    let Some(value) = parts.next().and_then(|v| v.parse::<f64>().ok()) else {
        return 0;
    };

    let multiplier = match parts.next() {
        Some("KB") => UNIT_SIZE,
        Some("MB") => UNIT_SIZE.powi(2),
        Some("GB") => UNIT_SIZE.powi(3),
        Some("TB") => UNIT_SIZE.powi(4),
        _ => 1.0,
    };

    (value * multiplier).max(0.0) as u64
}

/// Formats a byte count with at most two decimals, trailing zeros dropped.
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= UNIT_SIZE && unit_index < UNITS.len() - 1 {
        size /= UNIT_SIZE;
        unit_index += 1;
    }

    let rounded = format!("{:.2}", size);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');

    format!("{} {}", trimmed, UNITS[unit_index])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub limit_bytes: u64,
}

impl StorageUsage {
    pub fn from_files(files: &[FileRecord]) -> Self {
        let used_bytes = files
            .iter()
            .filter_map(|file| file.size.as_deref())
            .map(parse_size)
            .sum();

        Self {
            used_bytes,
            limit_bytes: STORAGE_LIMIT_BYTES,
        }
    }

    /// Capped at 100.
    pub fn percent(&self) -> f64 {
        if self.limit_bytes == 0 {
            return 100.0;
        }

        (self.used_bytes as f64 / self.limit_bytes as f64 * 100.0).min(100.0)
    }
}

impl std::fmt::Display for StorageUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} used", format_size(self.used_bytes), format_size(self.limit_bytes))
    }
}
