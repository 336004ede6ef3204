//! Inspection Evaluator
//!
//! Classifies each measurement against its specification range and derives
//! the overall inspection status.
//!
//! ## Classification
//!
//! | Class          | Condition                                                        | Color  |
//! |----------------|------------------------------------------------------------------|--------|
//! | `InSpec`       | `min <= value <= max`                                            | green  |
//! | `NearBoundary` | `min - 0.1*|min| <= value < min` or `max < value <= max + 0.1*|max|` | yellow |
//! | `OutOfSpec`    | anything else                                                    | red    |
//!
//! The tolerance band scales with the magnitude of the bound, not with the
//! width of the range. A bound of zero therefore has no band on that side.
//!
//! ## Overall status
//!
//! `Fail` as soon as one measurement is not `InSpec`. `NearBoundary` is a
//! warning color in the report but still fails the inspection.

use serde::Serialize;

use crate::config::defaults::NEAR_BOUNDARY_TOLERANCE;
use crate::types::{InspectionStatus, Machine, Measurement};

/// Traffic-light classification of a single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Classification {
    InSpec,
    NearBoundary,
    OutOfSpec,
}

impl Classification {
    /// RGB fill used for this classification in rendered reports.
    pub const fn color(self) -> (u8, u8, u8) {
        match self {
            Self::InSpec => (0, 255, 0),
            Self::NearBoundary => (255, 255, 0),
            Self::OutOfSpec => (255, 0, 0),
        }
    }

    pub const fn color_name(self) -> &'static str {
        match self {
            Self::InSpec => "green",
            Self::NearBoundary => "yellow",
            Self::OutOfSpec => "red",
        }
    }

    pub const fn is_in_spec(self) -> bool {
        matches!(self, Self::InSpec)
    }
}

/// Classify a value against `[min, max]` with the magnitude-relative band.
pub fn classify_value(value: f64, min: f64, max: f64) -> Classification {
    if min <= value && value <= max {
        return Classification::InSpec;
    }

    let lower_band = min - NEAR_BOUNDARY_TOLERANCE * min.abs();
    let upper_band = max + NEAR_BOUNDARY_TOLERANCE * max.abs();

    if (lower_band <= value && value < min) || (max < value && value <= upper_band) {
        Classification::NearBoundary
    } else {
        Classification::OutOfSpec
    }
}

pub fn classify(measurement: &Measurement) -> Classification {
    classify_value(measurement.value, measurement.min(), measurement.max())
}

/// `Pass` only when every measurement is within its inclusive range.
pub fn overall_status(measurements: &[Measurement]) -> InspectionStatus {
    status_of(measurements.iter().map(classify))
}

fn status_of(mut classifications: impl Iterator<Item = Classification>) -> InspectionStatus {
    if classifications.all(Classification::is_in_spec) {
        InspectionStatus::Pass
    } else {
        InspectionStatus::Fail
    }
}

/// Why a form could not be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("no measurements entered")]
    NoMeasurements,
    #[error("machine '{machine}' has {expected} parameters but {actual} values were supplied")]
    ValueCountMismatch {
        machine: String,
        expected: usize,
        actual: usize,
    },
    #[error("value for '{parameter}' is not a finite number")]
    NonFiniteValue { parameter: String },
}

/// One classified line of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedMeasurement {
    #[serde(flatten)]
    pub measurement: Measurement,
    pub classification: Classification,
}

/// Result of evaluating one inspection form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub machine_id: i64,
    pub machine_name: String,
    pub lines: Vec<ClassifiedMeasurement>,
    pub status: InspectionStatus,
}

impl Evaluation {
    pub fn measurements(&self) -> Vec<Measurement> {
        self.lines.iter().map(|l| l.measurement.clone()).collect()
    }

    pub fn count(&self, class: Classification) -> usize {
        self.lines.iter().filter(|l| l.classification == class).count()
    }
}

/// Pair a machine's parameters, in order, with the submitted values.
pub fn evaluate(machine: &Machine, values: &[f64]) -> Result<Evaluation, EvaluationError> {
    if values.is_empty() || machine.parameters.is_empty() {
        return Err(EvaluationError::NoMeasurements);
    }
    if values.len() != machine.parameters.len() {
        return Err(EvaluationError::ValueCountMismatch {
            machine: machine.name.clone(),
            expected: machine.parameters.len(),
            actual: values.len(),
        });
    }

    let mut lines = Vec::with_capacity(values.len());
    for (parameter, &value) in machine.parameters.iter().zip(values) {
        if !value.is_finite() {
            return Err(EvaluationError::NonFiniteValue {
                parameter: parameter.name().to_string(),
            });
        }
        let measurement = Measurement::new(parameter.clone(), value);
        let classification = classify(&measurement);
        lines.push(ClassifiedMeasurement {
            measurement,
            classification,
        });
    }

    let status = status_of(lines.iter().map(|l| l.classification));

    tracing::debug!(
        machine = %machine.name,
        status = %status,
        near_boundary = lines.iter().filter(|l| l.classification == Classification::NearBoundary).count(),
        "Evaluated inspection form"
    );

    Ok(Evaluation {
        machine_id: machine.id,
        machine_name: machine.name.clone(),
        lines,
        status,
    })
}
