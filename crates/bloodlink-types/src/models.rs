//! Shared domain vocabulary. The wire representation of each enum is also
//! what the database stores, so `as_str`/`parse` round-trip through both.

use serde::{Deserialize, Serialize};

/// The eight ABO/Rh blood groups, in the clinical notation clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A+" => Some(Self::APositive),
            "A-" => Some(Self::ANegative),
            "B+" => Some(Self::BPositive),
            "B-" => Some(Self::BNegative),
            "AB+" => Some(Self::AbPositive),
            "AB-" => Some(Self::AbNegative),
            "O+" => Some(Self::OPositive),
            "O-" => Some(Self::ONegative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            _ => None,
        }
    }
}

/// Fulfillment state of a donation request.
///
/// `open → selected → (confirmed | reopened)`; a reopened request is
/// matchable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Open,
    Selected,
    Confirmed,
    Reopened,
}

impl DonationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Selected => "selected",
            Self::Confirmed => "confirmed",
            Self::Reopened => "reopened",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "selected" => Some(Self::Selected),
            "confirmed" => Some(Self::Confirmed),
            "reopened" => Some(Self::Reopened),
            _ => None,
        }
    }

    /// Whether the matching engine may still offer this request.
    pub fn is_matchable(self) -> bool {
        matches!(self, Self::Open | Self::Reopened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blood_type_wire_format() {
        let bt: BloodType = serde_json::from_str("\"AB-\"").unwrap();
        assert_eq!(bt, BloodType::AbNegative);
        assert_eq!(serde_json::to_string(&bt).unwrap(), "\"AB-\"");
    }

    #[test]
    fn blood_type_rejects_unknown_group() {
        assert!(serde_json::from_str::<BloodType>("\"X+\"").is_err());
        assert!(BloodType::parse("X+").is_none());
    }

    #[test]
    fn enums_round_trip_through_db_text() {
        for bt in [
            BloodType::APositive,
            BloodType::ANegative,
            BloodType::BPositive,
            BloodType::BNegative,
            BloodType::AbPositive,
            BloodType::AbNegative,
            BloodType::OPositive,
            BloodType::ONegative,
        ] {
            assert_eq!(BloodType::parse(bt.as_str()), Some(bt));
        }
        for sex in [Sex::Male, Sex::Female] {
            assert_eq!(Sex::parse(sex.as_str()), Some(sex));
        }
        for status in [
            DonationStatus::Open,
            DonationStatus::Selected,
            DonationStatus::Confirmed,
            DonationStatus::Reopened,
        ] {
            assert_eq!(DonationStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn matchable_states() {
        assert!(DonationStatus::Open.is_matchable());
        assert!(DonationStatus::Reopened.is_matchable());
        assert!(!DonationStatus::Selected.is_matchable());
        assert!(!DonationStatus::Confirmed.is_matchable());
    }
}
