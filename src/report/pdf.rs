//! A4 PDF rendering with the built-in Helvetica fonts

use std::path::{Path, PathBuf};

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point, Polygon, Rgb,
};
use tracing::info;

use super::{layout, report_file_name, InspectionReport, RenderedReport, ReportError, ReportLine, ReportRenderer};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 20.0;
const LINE_HEIGHT: f32 = 8.0;
const SQUARE_SIZE: f32 = 4.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
/// Helvetica at body size fits roughly this many characters per line.
const WRAP_COLUMNS: usize = 90;

/// Writes `report_{id}.pdf` files into a directory.
#[derive(Debug, Clone)]
pub struct PdfReportRenderer {
    output_dir: PathBuf,
}

impl PdfReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn pdf_err(err: impl std::fmt::Debug) -> ReportError {
    ReportError::Pdf(format!("{err:?}"))
}

/// Cursor over the pages of one document.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN_TOP,
            pages: 1,
        })
    }

    /// Start a new page when the next line would cross the bottom margin.
    fn advance(&mut self) {
        if self.y - LINE_HEIGHT < MARGIN_BOTTOM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Layer {}", self.pages + 1));
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.pages += 1;
            self.y = PAGE_HEIGHT - MARGIN_TOP;
        } else {
            self.y -= LINE_HEIGHT;
        }
    }

    fn text(&mut self, text: &str, size: f32, bold: bool, x: f32) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
        self.advance();
    }

    fn square(&self, (r, g, b): (u8, u8, u8)) {
        let x = MARGIN_LEFT;
        let y = self.y - 0.5;
        let ring = vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + SQUARE_SIZE), Mm(y)), false),
            (Point::new(Mm(x + SQUARE_SIZE), Mm(y + SQUARE_SIZE)), false),
            (Point::new(Mm(x), Mm(y + SQUARE_SIZE)), false),
        ];
        self.layer.set_fill_color(Color::Rgb(Rgb::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            None,
        )));
        self.layer.add_polygon(Polygon {
            rings: vec![ring],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
        self.layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }

    /// Serialized document and its page count.
    fn finish(self) -> Result<(Vec<u8>, usize), ReportError> {
        let pages = self.pages;
        let bytes = self.doc.save_to_bytes().map_err(pdf_err)?;
        Ok((bytes, pages))
    }
}

/// Greedy word wrap on whitespace; words longer than `width` stay whole.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn render_bytes(report: &InspectionReport) -> Result<(Vec<u8>, usize), ReportError> {
    let mut writer = PageWriter::new(&format!("Inspection {}", report.inspection_id))?;

    for line in layout(report) {
        match line {
            ReportLine::Title(text) => writer.text(&text, TITLE_SIZE, true, MARGIN_LEFT),
            ReportLine::Field(text) => writer.text(&text, BODY_SIZE, false, MARGIN_LEFT),
            ReportLine::Measurement { text, color } => {
                writer.square(color);
                writer.text(&text, BODY_SIZE, false, MARGIN_LEFT + SQUARE_SIZE + 3.0);
            }
            ReportLine::Heading(text) => {
                writer.advance();
                writer.text(&text, BODY_SIZE + 1.0, true, MARGIN_LEFT);
            }
            ReportLine::Text(text) => {
                for chunk in wrap(&text, WRAP_COLUMNS) {
                    writer.text(&chunk, BODY_SIZE, false, MARGIN_LEFT);
                }
            }
        }
    }

    writer.finish()
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, report: &InspectionReport) -> Result<RenderedReport, ReportError> {
        let (bytes, pages) = render_bytes(report)?;
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.report_path(report.inspection_id);
        std::fs::write(&path, &bytes)?;

        info!(
            inspection_id = report.inspection_id,
            path = %path.display(),
            size_bytes = bytes.len(),
            pages,
            "Report written"
        );
        Ok(RenderedReport {
            path,
            size_bytes: bytes.len(),
            pages,
        })
    }

    fn report_path(&self, inspection_id: i64) -> PathBuf {
        self.output_dir.join(report_file_name(inspection_id))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_report;
    use super::*;

    #[test]
    fn test_renders_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PdfReportRenderer::new(dir.path().join("reports"));
        let rendered = renderer.render(&sample_report(Some("Tighten the mounts."))).unwrap();

        assert_eq!(rendered.path, dir.path().join("reports").join("report_12.pdf"));
        let bytes = std::fs::read(&rendered.path).unwrap();
        assert_eq!(bytes.len(), rendered.size_bytes);
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(rendered.pages, 1);
    }

    #[test]
    fn test_long_suggestions_span_pages() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PdfReportRenderer::new(dir.path());
        let many: Vec<String> = (1..=60).map(|i| format!("{i}. Recalibrate sensor block {i}.")).collect();
        let rendered = renderer.render(&sample_report(Some(&many.join("\n")))).unwrap();
        assert!(rendered.pages > 1, "expected a page break, got {} page(s)", rendered.pages);

        let (_, short_pages) = render_bytes(&sample_report(None)).unwrap();
        assert!(rendered.pages > short_pages);
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("a bb ccc dddd", 6), vec!["a bb", "ccc", "dddd"]);
        assert_eq!(wrap("supercalifragilistic", 5), vec!["supercalifragilistic"]);
        assert!(wrap("   ", 10).is_empty());
    }
}
