use crate::model::Ms;

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_CONTENT_LEN: usize = 64 * 1024;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_ROSTER_SIZE: usize = 64;

/// 1970-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;
/// 2200-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 7_258_118_400_000;

/// Longest booking a field accepts (31 days).
pub const MAX_SPAN_DURATION_MS: Ms = 31 * 24 * 3_600_000;

/// Highest field number; 0 is the general, non-bookable slot.
pub const FIELD_COUNT: u8 = 4;
