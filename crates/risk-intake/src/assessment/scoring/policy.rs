use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of the LOW band on the 0..=10 index.
pub const LOW_BAND_MAX: f64 = 3.58;
/// Upper bound (inclusive) of the MODERATE band on the 0..=10 index.
pub const MODERATE_BAND_MAX: f64 = 6.79;

/// Provisional classification of the composite index, shown before the prediction returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    pub fn from_index(index: f64) -> Self {
        if index <= LOW_BAND_MAX {
            RiskBand::Low
        } else if index <= MODERATE_BAND_MAX {
            RiskBand::Moderate
        } else {
            RiskBand::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskBand::Low => "LOW",
            RiskBand::Moderate => "MODERATE",
            RiskBand::High => "HIGH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_inclusive() {
        assert_eq!(RiskBand::from_index(0.0), RiskBand::Low);
        assert_eq!(RiskBand::from_index(3.58), RiskBand::Low);
        assert_eq!(RiskBand::from_index(3.581), RiskBand::Moderate);
        assert_eq!(RiskBand::from_index(3.59), RiskBand::Moderate);
        assert_eq!(RiskBand::from_index(6.79), RiskBand::Moderate);
        assert_eq!(RiskBand::from_index(6.8), RiskBand::High);
        assert_eq!(RiskBand::from_index(10.0).label(), "HIGH");
    }
}
