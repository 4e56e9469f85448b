//! Presentation helpers for image records

use crate::types::DisplaySize;

/// Display-size names from largest to smallest
pub const DISPLAY_PRIORITY: [&str; 4] = ["comp", "comp_webp", "preview", "thumb"];

const MICROS_PER_DOLLAR: u64 = 1_000_000;

/// URI of the largest known preview, else the first one listed
pub fn highest_resolution_uri(sizes: &[DisplaySize]) -> Option<&str> {
    DISPLAY_PRIORITY
        .iter()
        .find_map(|name| sizes.iter().find(|size| size.name == *name))
        .or_else(|| sizes.first())
        .map(|size| size.uri.as_str())
}

/// Rough price in dollars for a rendition of the given pixel dimensions
pub fn estimated_price(width: u32, height: u32) -> f64 {
    f64::from(width) * f64::from(height) / 10_000_000.0
}

/// Render a micro-dollar amount as dollars, e.g. `1000` as `$0.001`
///
/// At least two decimals are shown; trailing zeros beyond that are dropped.
pub fn format_amount(micros: u64) -> String {
    let whole = micros / MICROS_PER_DOLLAR;
    let fraction = format!("{:06}", micros % MICROS_PER_DOLLAR);
    let trimmed = fraction.trim_end_matches('0');

    if trimmed.len() < 2 {
        format!("${whole}.{trimmed:0<2}")
    } else {
        format!("${whole}.{trimmed}")
    }
}
