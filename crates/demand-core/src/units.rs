//! Unit wrapper for demand quantities.
//!
//! Model outputs and demand history are expressed in megawatts. Wrapping the
//! raw `f64` keeps demand values from being mixed up with calendar features
//! or importance scores, which are plain numbers.
//!
//! ```
//! use demand_core::units::Megawatts;
//!
//! let demand = Megawatts(40123.45);
//! assert_eq!(demand.to_string(), "40,123.45 MW");
//! ```

use serde::{Deserialize, Serialize};

/// Active power in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl Megawatts {
    /// Get the raw numeric value
    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }
}

/// Renders with two decimals and thousands separators, e.g. `35,500.00 MW`.
impl std::fmt::Display for Megawatts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} MW", group_thousands(self.0, 2))
    }
}

/// Format `value` with `decimals` fractional digits and `,` between groups
/// of three integer digits.
pub fn group_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + int_part.len() / 3 + 1);
    if value.is_sign_negative() && formatted.chars().any(|c| c != '0' && c != '.') {
        grouped.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Megawatts(40123.45).to_string(), "40,123.45 MW");
        assert_eq!(Megawatts(1234567.0).to_string(), "1,234,567.00 MW");
        assert_eq!(Megawatts(999.999).to_string(), "1,000.00 MW");
        assert_eq!(Megawatts(12.5).to_string(), "12.50 MW");
        assert_eq!(Megawatts(-1500.0).to_string(), "-1,500.00 MW");
        assert_eq!(Megawatts(0.0).to_string(), "0.00 MW");
    }

    #[test]
    fn test_group_thousands_without_decimals() {
        assert_eq!(group_thousands(100000.0, 0), "100,000");
        assert_eq!(group_thousands(-0.001, 2), "0.00");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&Megawatts(35000.5)).unwrap();
        assert_eq!(json, "35000.5");
        let back: Megawatts = serde_json::from_str("36000").unwrap();
        assert_eq!(back, Megawatts(36000.0));
    }
}
