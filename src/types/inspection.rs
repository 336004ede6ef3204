//! Inspection types: Measurement, Shift, InspectionStatus, Inspection, Reaction

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Parameter;

/// A parameter plus the value observed during one inspection.
///
/// Serializes flat: `{"name", "min", "max", "value"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(flatten)]
    pub parameter: Parameter,
    pub value: f64,
}

impl Measurement {
    pub const fn new(parameter: Parameter, value: f64) -> Self {
        Self { parameter, value }
    }

    pub fn name(&self) -> &str {
        self.parameter.name()
    }

    pub const fn min(&self) -> f64 {
        self.parameter.min()
    }

    pub const fn max(&self) -> f64 {
        self.parameter.max()
    }
}

/// Production shift an inspection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shift {
    Morning,
    Afternoon,
    Night,
}

impl Shift {
    pub const ALL: [Self; 3] = [Self::Morning, Self::Afternoon, Self::Night];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Night => "Night",
        }
    }
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Shift {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|shift| shift.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Overall outcome of an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InspectionStatus {
    Pass,
    Fail,
}

impl InspectionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
        }
    }

    pub const fn is_fail(self) -> bool {
        matches!(self, Self::Fail)
    }
}

impl std::fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InspectionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pass" => Ok(Self::Pass),
            "Fail" => Ok(Self::Fail),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A stored string column did not match any enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

/// Fields needed to persist a new inspection.
#[derive(Debug, Clone)]
pub struct NewInspection {
    pub user_id: i64,
    pub machine_id: i64,
    pub shift: Shift,
    pub date: NaiveDate,
    pub measurements: Vec<Measurement>,
    pub status: InspectionStatus,
}

/// A persisted inspection. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: i64,
    pub user_id: i64,
    pub machine_id: i64,
    pub shift: Shift,
    pub date: NaiveDate,
    pub measurements: Vec<Measurement>,
    pub status: InspectionStatus,
}

/// Operator commentary attached to a failed inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub inspection_id: i64,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_serializes_flat() {
        let m = Measurement::new(Parameter::new("Temperature", 20.0, 30.0).unwrap(), 29.0);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["name"], "Temperature");
        assert_eq!(v["min"], 20.0);
        assert_eq!(v["max"], 30.0);
        assert_eq!(v["value"], 29.0);
        assert!(v.get("parameter").is_none());
    }

    #[test]
    fn test_measurement_rejects_invalid_range_on_load() {
        let raw = r#"{"name":"Temperature","min":30,"max":20,"value":25}"#;
        assert!(serde_json::from_str::<Measurement>(raw).is_err());
    }

    #[test]
    fn test_shift_parse() {
        assert_eq!("Night".parse::<Shift>().unwrap(), Shift::Night);
        assert!("Evening".parse::<Shift>().is_err());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(InspectionStatus::Fail.to_string(), "Fail");
        assert_eq!("Pass".parse::<InspectionStatus>().unwrap(), InspectionStatus::Pass);
        assert!(InspectionStatus::Fail.is_fail());
    }
}
