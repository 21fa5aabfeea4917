// src/report_pdf.rs
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Rect, Rgb,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::AppError;
use crate::report::{format_hours, PayPeriodReport, ReportRenderer, REPORT_HEADERS};

// --- Page Geometry (mm) ---

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 10.0;
const COLUMN_WIDTHS: [f32; 6] = [35.0, 30.0, 30.0, 30.0, 30.0, 40.0];
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a share of the font size.
const GLYPH_WIDTH: f32 = 0.5;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 12.0;

fn title_color() -> Color {
    Color::Rgb(Rgb::new(33.0 / 255.0, 59.0 / 255.0, 151.0 / 255.0, None))
}

fn text_color() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn weekend_shade() -> Color {
    Color::Rgb(Rgb::new(200.0 / 255.0, 200.0 / 255.0, 200.0 / 255.0, None))
}

fn pdf_error(err: impl std::fmt::Display) -> AppError {
    AppError::ExternalToolError(format!("Could not write PDF report: {}", err))
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH * PT_TO_MM
}

/// Writes the report as an A4 PDF at exactly `path`.
#[derive(Debug, Clone)]
pub struct PdfReportRenderer {
    pub title: String,
}

impl PdfReportRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Cursor over the pages being drawn. Starts a new page when a line no
/// longer fits.
struct PageCursor {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageCursor {
    fn new(title: &str) -> Result<Self, AppError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        layer.set_outline_thickness(0.5);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.layer.set_outline_thickness(0.5);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn skip(&mut self, height: f32) {
        self.y -= height;
    }

    fn centered(&mut self, text: &str, size: f32, bold: bool, color: Color) {
        self.ensure_room(LINE_HEIGHT);
        self.y -= LINE_HEIGHT;
        let x = ((PAGE_WIDTH - text_width(text, size)) / 2.0).max(MARGIN);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(color);
        self.layer.use_text(text, size, Mm(x), Mm(self.y + 3.0), font);
    }

    /// One bordered table row; `shaded` fills every cell grey and leaves it
    /// empty.
    fn row(&mut self, cells: &[String; 6], size: f32, bold: bool, shaded: bool) {
        self.ensure_room(LINE_HEIGHT);
        let top = self.y;
        self.y -= LINE_HEIGHT;
        let table_width: f32 = COLUMN_WIDTHS.iter().sum();
        let mut x = (PAGE_WIDTH - table_width) / 2.0;

        for (width, cell) in COLUMN_WIDTHS.iter().zip(cells.iter()) {
            let mode = if shaded {
                self.layer.set_fill_color(weekend_shade());
                PaintMode::FillStroke
            } else {
                PaintMode::Stroke
            };
            self.layer.add_rect(
                Rect::new(Mm(x), Mm(self.y), Mm(x + width), Mm(top)).with_mode(mode),
            );
            if !cell.is_empty() {
                let font = if bold { &self.bold } else { &self.regular };
                let text_x = x + (width - text_width(cell, size)) / 2.0;
                self.layer.set_fill_color(text_color());
                self.layer
                    .use_text(cell.as_str(), size, Mm(text_x), Mm(self.y + 3.5), font);
            }
            x += width;
        }
    }

    fn save(self, path: &Path) -> Result<(), AppError> {
        let file = File::create(path).map_err(pdf_error)?;
        self.doc
            .save(&mut BufWriter::new(file))
            .map_err(pdf_error)
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, report: &PayPeriodReport, path: &Path) -> Result<PathBuf, AppError> {
        if let Some(folder) = path.parent() {
            fs::create_dir_all(folder).map_err(|e| {
                AppError::ExternalToolError(format!(
                    "Could not create report folder {}: {}",
                    folder.display(),
                    e
                ))
            })?;
        }

        let mut page = PageCursor::new(&self.title)?;
        page.centered(&self.title, TITLE_SIZE, true, title_color());
        page.skip(5.0);
        page.centered(
            &format!("Employee: {}", report.employee),
            HEADING_SIZE,
            false,
            text_color(),
        );
        page.centered(
            &format!("Pay Period: {} to {}", report.start_date, report.end_date),
            HEADING_SIZE,
            false,
            text_color(),
        );
        page.skip(5.0);

        page.row(&REPORT_HEADERS.map(String::from), HEADING_SIZE, true, false);
        for row in &report.rows {
            page.row(&row.cells(), BODY_SIZE, false, row.is_weekend());
        }

        page.skip(5.0);
        page.centered("Weekly Hours Summary:", HEADING_SIZE, true, text_color());
        for week in &report.weekly {
            page.centered(
                &format!("Week {}: {} hours", week.iso_week, format_hours(week.hours)),
                BODY_SIZE,
                false,
                text_color(),
            );
        }
        page.skip(5.0);
        page.centered(
            &format!("Total Pay Period Hours: {}", format_hours(report.total_hours)),
            HEADING_SIZE,
            true,
            text_color(),
        );

        page.save(path)?;
        info!("PDF report written to {}", path.display());
        Ok(path.to_path_buf())
    }
}
