//! Size conversions. GB and MB are decimal; KiB is binary because that is
//! what the partitioning tools' `K` suffix means.

pub const BYTES_PER_KIB: u64 = 1024;
pub const BYTES_PER_MB: u64 = 1000 * 1000;
pub const BYTES_PER_GB: u64 = 1000 * 1000 * 1000;

/// Whole kibibytes in `bytes`, truncated toward zero.
pub fn bytes_to_kib(bytes: u64) -> u64 {
    bytes / BYTES_PER_KIB
}

pub fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(BYTES_PER_MB)
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB as f64
}

/// Human label used in drive menus, e.g. `500.11GB`.
pub fn format_gb(bytes: u64) -> String {
    format!("{:.2}GB", bytes_to_gb(bytes))
}
