//! Inspection report rendering
//!
//! [`layout`] turns an [`InspectionReport`] into an ordered list of
//! [`ReportLine`]s; a [`ReportRenderer`] draws those lines into a file.
//! Keeping the layout separate lets it be checked without parsing PDFs.

mod pdf;

pub use pdf::PdfReportRenderer;

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::defaults;
use crate::evaluator::{classify, ClassifiedMeasurement, Evaluation};
use crate::types::{Inspection, InspectionStatus, Shift};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Report I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("Render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Everything printed on one report.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionReport {
    pub inspection_id: i64,
    pub machine_name: String,
    pub shift: Shift,
    pub date: NaiveDate,
    pub status: InspectionStatus,
    pub lines: Vec<ClassifiedMeasurement>,
    pub suggestions: Option<String>,
}

impl InspectionReport {
    pub fn from_evaluation(
        inspection_id: i64,
        evaluation: &Evaluation,
        shift: Shift,
        date: NaiveDate,
        suggestions: Option<String>,
    ) -> Self {
        Self {
            inspection_id,
            machine_name: evaluation.machine_name.clone(),
            shift,
            date,
            status: evaluation.status,
            lines: evaluation.lines.clone(),
            suggestions,
        }
    }

    /// Rebuild a report from a stored inspection. Classifications are
    /// recomputed from the stored measurements.
    pub fn from_inspection(
        inspection: &Inspection,
        machine_name: impl Into<String>,
        suggestions: Option<String>,
    ) -> Self {
        let lines = inspection
            .measurements
            .iter()
            .map(|m| ClassifiedMeasurement {
                measurement: m.clone(),
                classification: classify(m),
            })
            .collect();
        Self {
            inspection_id: inspection.id,
            machine_name: machine_name.into(),
            shift: inspection.shift,
            date: inspection.date,
            status: inspection.status,
            lines,
            suggestions,
        }
    }
}

/// One printed line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportLine {
    Title(String),
    Field(String),
    /// Measurement text preceded by a filled square of `color`.
    Measurement { text: String, color: (u8, u8, u8) },
    Heading(String),
    Text(String),
}

/// Output of a successful render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedReport {
    pub path: PathBuf,
    pub size_bytes: usize,
    pub pages: usize,
}

/// Draws a report to persistent storage.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &InspectionReport) -> Result<RenderedReport, ReportError>;

    /// Where the report for `inspection_id` is (or would be) written.
    fn report_path(&self, inspection_id: i64) -> PathBuf;
}

pub fn report_file_name(inspection_id: i64) -> String {
    format!("report_{inspection_id}.pdf")
}

/// Order and wording of every line on the report.
pub fn layout(report: &InspectionReport) -> Vec<ReportLine> {
    let mut lines = vec![
        ReportLine::Title(defaults::REPORT_TITLE.to_string()),
        ReportLine::Field(format!("Machine: {}", report.machine_name)),
        ReportLine::Field(format!("Shift: {}", report.shift)),
        ReportLine::Field(format!("Date: {}", report.date)),
        ReportLine::Field(format!("Status: {}", report.status)),
    ];

    for line in &report.lines {
        let m = &line.measurement;
        lines.push(ReportLine::Measurement {
            text: format!("{}: {} (Spec: {}-{})", m.name(), m.value, m.min(), m.max()),
            color: line.classification.color(),
        });
    }

    lines.push(ReportLine::Heading("AI Inspection Suggestions:".to_string()));
    let suggestions = report
        .suggestions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match suggestions {
        Some(text) => lines.extend(
            text.lines()
                .map(str::trim_end)
                .filter(|l| !l.trim().is_empty())
                .map(|l| ReportLine::Text(l.to_string())),
        ),
        None => lines.push(ReportLine::Text(defaults::NO_SUGGESTIONS_TEXT.to_string())),
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate;
    use crate::types::{sample_machine_parameters, Machine};

    pub(crate) fn sample_report(suggestions: Option<&str>) -> InspectionReport {
        let machine = Machine {
            id: 1,
            name: "Machine A".to_string(),
            parameters: sample_machine_parameters().unwrap(),
        };
        let eval = evaluate(&machine, &[29.0, 205.0, 6.0]).unwrap();
        InspectionReport::from_evaluation(
            12,
            &eval,
            Shift::Afternoon,
            NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            suggestions.map(str::to_string),
        )
    }

    #[test]
    fn test_file_name() {
        assert_eq!(report_file_name(12), "report_12.pdf");
    }

    #[test]
    fn test_layout_order_and_colors() {
        let lines = layout(&sample_report(Some("Check the pressure regulator.\n\nRe-balance the spindle.")));
        assert_eq!(lines[0], ReportLine::Title("Machinery QA Inspection Report".to_string()));
        assert_eq!(lines[1], ReportLine::Field("Machine: Machine A".to_string()));
        assert_eq!(lines[2], ReportLine::Field("Shift: Afternoon".to_string()));
        assert_eq!(lines[3], ReportLine::Field("Date: 2026-05-02".to_string()));
        assert_eq!(lines[4], ReportLine::Field("Status: Fail".to_string()));
        assert_eq!(
            lines[5],
            ReportLine::Measurement {
                text: "Temperature: 29 (Spec: 20-30)".to_string(),
                color: (0, 255, 0),
            }
        );
        assert!(matches!(&lines[6], ReportLine::Measurement { color: (255, 255, 0), .. }));
        assert!(matches!(&lines[7], ReportLine::Measurement { color: (255, 0, 0), .. }));
        assert_eq!(lines[8], ReportLine::Heading("AI Inspection Suggestions:".to_string()));
        assert_eq!(lines[9], ReportLine::Text("Check the pressure regulator.".to_string()));
        assert_eq!(lines[10], ReportLine::Text("Re-balance the spindle.".to_string()));
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn test_missing_suggestions_placeholder() {
        for suggestions in [None, Some("   ")] {
            let lines = layout(&sample_report(suggestions));
            assert_eq!(
                lines.last(),
                Some(&ReportLine::Text("(No suggestions available)".to_string()))
            );
        }
    }

    #[test]
    fn test_rebuild_from_inspection_matches_evaluation() {
        let report = sample_report(None);
        let inspection = Inspection {
            id: report.inspection_id,
            user_id: 1,
            machine_id: 1,
            shift: report.shift,
            date: report.date,
            measurements: report.lines.iter().map(|l| l.measurement.clone()).collect(),
            status: report.status,
        };
        let rebuilt = InspectionReport::from_inspection(&inspection, "Machine A", None);
        assert_eq!(layout(&rebuilt), layout(&report));
    }
}
