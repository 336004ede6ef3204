//! Machine catalog types: Parameter, Machine

use serde::{Deserialize, Serialize};

/// Reasons a specification range is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("parameter name must not be empty")]
    EmptyName,
    #[error("parameter '{name}': bounds must be finite (min={min}, max={max})")]
    NonFinite { name: String, min: f64, max: f64 },
    #[error("parameter '{name}': min ({min}) must be <= max ({max})")]
    InvertedRange { name: String, min: f64, max: f64 },
}

/// A named numeric specification range a machine is inspected against.
///
/// Fields are private so every instance has passed [`Parameter::new`];
/// deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameter")]
pub struct Parameter {
    name: String,
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RawParameter {
    name: String,
    min: f64,
    max: f64,
}

impl TryFrom<RawParameter> for Parameter {
    type Error = ParameterError;

    fn try_from(raw: RawParameter) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.min, raw.max)
    }
}

impl Parameter {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Result<Self, ParameterError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ParameterError::EmptyName);
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(ParameterError::NonFinite { name, min, max });
        }
        if min > max {
            return Err(ParameterError::InvertedRange { name, min, max });
        }
        Ok(Self { name, min, max })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn min(&self) -> f64 {
        self.min
    }

    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Form label shown next to the input, e.g. `Temperature (Spec: 20-30)`.
    pub fn label(&self) -> String {
        format!("{} (Spec: {}-{})", self.name, self.min, self.max)
    }
}

/// A machine and its ordered list of measurable parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: i64,
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// The sample machine seeded into an empty catalog.
pub fn sample_machine_parameters() -> Result<Vec<Parameter>, ParameterError> {
    Ok(vec![
        Parameter::new("Temperature", 20.0, 30.0)?,
        Parameter::new("Pressure", 100.0, 200.0)?,
        Parameter::new("Vibration", 0.0, 5.0)?,
    ])
}
