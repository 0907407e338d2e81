//! Risk bucketing for the `impact` dimension (SPEC_FULL supplement,
//! pinned against spec §4.7 row 9: "risk bucket low/medium/high").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl RiskBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBucket::Low => "low",
            RiskBucket::Medium => "medium",
            RiskBucket::High => "high",
        }
    }
}

/// `low` fan-out < 5, `medium` 5..20, `high` >= 20 or touches a hub symbol.
pub fn bucket(fan_out: u32, touches_hub: bool) -> RiskBucket {
    if touches_hub || fan_out >= 20 {
        RiskBucket::High
    } else if fan_out >= 5 {
        RiskBucket::Medium
    } else {
        RiskBucket::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_fan_out_is_low_risk() {
        assert_eq!(bucket(2, false), RiskBucket::Low);
    }

    #[test]
    fn mid_fan_out_is_medium() {
        assert_eq!(bucket(12, false), RiskBucket::Medium);
    }

    #[test]
    fn high_fan_out_or_hub_is_high() {
        assert_eq!(bucket(25, false), RiskBucket::High);
        assert_eq!(bucket(1, true), RiskBucket::High);
    }
}
