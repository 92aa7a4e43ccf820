use plotters::coord::Shift;
use plotters::prelude::*;
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef,
    Mm, PdfDocument, PdfDocumentReference, Px,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::ReportError;
use crate::services::pages::Page;
use crate::services::profile::{Histogram, NumericSummary};

pub const REPORT_TITLE: &str = "Auto-Generated Data Report";

// Page sizes in millimetres. Chart pages match the bitmap they embed:
// 800x600 px at 100 dpi is 8x6 in.
const A4_PORTRAIT: (f64, f64) = (210.0, 297.0);
const A4_LANDSCAPE: (f64, f64) = (297.0, 210.0);
const CHART_PAGE: (f64, f64) = (203.2, 152.4);
const CHART_SIZE_PX: (u32, u32) = (800, 600);
const CHART_DPI: f64 = 100.0;

const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

fn render_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::RenderError(err.to_string())
}

/// Write-once paginated PDF assembly. Text and table pages use the builtin
/// Helvetica faces; chart pages render through a plotters bitmap surface
/// scoped to the page and embedded as an image.
pub struct ReportDocument {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
}

impl ReportDocument {
    pub fn new(title: &str) -> Result<Self, ReportError> {
        let doc = PdfDocument::empty(title);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_err)?;
        Ok(Self { doc, font, bold })
    }

    pub fn render_page(&mut self, page: &Page) -> Result<(), ReportError> {
        match page {
            Page::Overview {
                source,
                rows,
                columns,
                column_types,
            } => {
                let mut lines = vec![
                    REPORT_TITLE.to_string(),
                    String::new(),
                    format!("Source file: {}", source),
                    format!("Rows: {}", rows),
                    format!("Columns: {}", columns),
                    String::new(),
                    "Column Types:".to_string(),
                ];
                for (name, dtype) in column_types {
                    lines.push(format!("  - {}: {}", name, dtype));
                }
                self.add_text_page(&lines);
                Ok(())
            }
            Page::Sample { headers, rows } => {
                self.add_table_page("Sample Data (first rows)", headers, rows);
                Ok(())
            }
            Page::NumericSummary { stats } => {
                let headers = [
                    "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max",
                ]
                .map(str::to_string)
                .to_vec();
                let rows: Vec<Vec<String>> = stats.iter().map(summary_row).collect();
                self.add_table_page("Numeric Columns - Summary Statistics", &headers, &rows);
                Ok(())
            }
            Page::Missing { .. } | Page::Histogram { .. } | Page::CategoricalFreq { .. } => {
                self.add_chart_page(page)
            }
        }
    }

    pub fn save(self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path)?;
        self.doc.save(&mut BufWriter::new(file)).map_err(render_err)?;
        Ok(())
    }

    fn add_text_page(&self, lines: &[String]) {
        let (width, height) = A4_PORTRAIT;
        let (page, layer) = self.doc.add_page(Mm(width), Mm(height), "content");
        let layer = self.doc.get_page(page).get_layer(layer);

        let mut y = height - 20.0;
        for (idx, line) in lines.iter().enumerate() {
            let (font, size, step) = if idx == 0 {
                (&self.bold, 16.0, 10.0)
            } else {
                (&self.font, 10.0, 5.5)
            };
            if !line.is_empty() {
                layer.use_text(line.clone(), size, Mm(15.0), Mm(y), font);
            }
            y -= step;
            if y < 15.0 {
                // page full; remaining lines are clipped like the overlong
                // text block in the original layout
                break;
            }
        }
    }

    fn add_table_page(&self, title: &str, headers: &[String], rows: &[Vec<String>]) {
        let (width, height) = A4_LANDSCAPE;
        let (page, layer) = self.doc.add_page(Mm(width), Mm(height), "content");
        let layer = self.doc.get_page(page).get_layer(layer);

        layer.use_text(title.to_string(), 14.0, Mm(15.0), Mm(height - 18.0), &self.bold);

        let left = 12.0;
        let top = height - 32.0;
        let col_width = (width - 2.0 * left) / headers.len().max(1) as f64;
        let row_height = 7.0;
        let max_chars = ((col_width / 1.8) as usize).max(4);

        for (col, header) in headers.iter().enumerate() {
            layer.use_text(
                truncate(header, max_chars),
                8.0,
                Mm(left + col as f64 * col_width),
                Mm(top),
                &self.bold,
            );
        }
        for (row_idx, row) in rows.iter().enumerate() {
            let y = top - (row_idx as f64 + 1.0) * row_height;
            if y < 12.0 {
                break;
            }
            for (col, cell) in row.iter().enumerate() {
                layer.use_text(
                    truncate(cell, max_chars),
                    8.0,
                    Mm(left + col as f64 * col_width),
                    Mm(y),
                    &self.font,
                );
            }
        }
    }

    /// Acquires an RGB surface for exactly one page: buffer and backend live
    /// inside this call and are released on every exit path, including a
    /// failed draw.
    fn add_chart_page(&self, page: &Page) -> Result<(), ReportError> {
        let (w_px, h_px) = CHART_SIZE_PX;
        let mut buf = vec![0u8; (w_px * h_px * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (w_px, h_px)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;
            draw_chart(&root, page)?;
            root.present().map_err(render_err)?;
        }

        let (pdf_page, layer) = self.doc.add_page(Mm(CHART_PAGE.0), Mm(CHART_PAGE.1), "content");
        let layer = self.doc.get_page(pdf_page).get_layer(layer);
        let image = Image::from(ImageXObject {
            width: Px(w_px as usize),
            height: Px(h_px as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: buf,
            image_filter: None,
            clipping_bbox: None,
        });
        image.add_to_layer(
            layer,
            ImageTransform {
                dpi: Some(CHART_DPI),
                ..Default::default()
            },
        );
        Ok(())
    }
}

fn summary_row(stats: &NumericSummary) -> Vec<String> {
    vec![
        stats.name.clone(),
        stats.count.to_string(),
        fmt3(stats.mean),
        fmt3(stats.std),
        fmt3(stats.min),
        fmt3(stats.q25),
        fmt3(stats.median),
        fmt3(stats.q75),
        fmt3(stats.max),
    ]
}

/// Statistics render at a fixed 3-decimal precision.
fn fmt3(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.3}", value)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

fn draw_chart(
    root: &DrawingArea<BitMapBackend, Shift>,
    page: &Page,
) -> Result<(), ReportError> {
    match page {
        Page::Missing { counts } => draw_missing_chart(root, counts),
        Page::Histogram { column, histogram } => draw_histogram(root, column, histogram),
        Page::CategoricalFreq { column, counts } => draw_top_values(root, column, counts),
        _ => Ok(()),
    }
}

/// Vertical bars, one per column with missing values, already in descending
/// count order.
fn draw_missing_chart(
    root: &DrawingArea<BitMapBackend, Shift>,
    counts: &[(String, usize)],
) -> Result<(), ReportError> {
    let labels: Vec<String> = counts.iter().map(|(name, _)| name.clone()).collect();
    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption("Missing Values per Column", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0..counts.len()).into_segmented(), 0.0..max * 1.05)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Column")
        .y_desc("Count")
        .x_label_formatter(&|seg| segment_label(seg, &labels))
        .y_label_formatter(&|v: &f64| format!("{:.0}", v))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(idx, (_, count))| {
            Rectangle::new(
                [
                    (SegmentValue::Exact(idx), 0.0),
                    (SegmentValue::Exact(idx + 1), *count as f64),
                ],
                BAR_COLOR.filled(),
            )
        }))
        .map_err(render_err)?;
    Ok(())
}

fn draw_histogram(
    root: &DrawingArea<BitMapBackend, Shift>,
    column: &str,
    histogram: &Histogram,
) -> Result<(), ReportError> {
    let max = histogram.counts.iter().max().copied().unwrap_or(1) as f64;
    let lo = histogram.edges.first().copied().unwrap_or(0.0);
    let hi = histogram.edges.last().copied().unwrap_or(1.0);

    let mut chart = ChartBuilder::on(root)
        .caption(format!("Distribution of {}", column), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0.0..max * 1.05)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("Frequency")
        .y_label_formatter(&|v: &f64| format!("{:.0}", v))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            histogram
                .counts
                .iter()
                .enumerate()
                .filter(|(_, count)| **count > 0)
                .map(|(idx, count)| {
                    Rectangle::new(
                        [
                            (histogram.edges[idx], 0.0),
                            (histogram.edges[idx + 1], *count as f64),
                        ],
                        BAR_COLOR.filled(),
                    )
                }),
        )
        .map_err(render_err)?;
    Ok(())
}

/// Horizontal bars, ascending by count bottom-to-top.
fn draw_top_values(
    root: &DrawingArea<BitMapBackend, Shift>,
    column: &str,
    counts: &[(String, usize)],
) -> Result<(), ReportError> {
    let labels: Vec<String> = counts
        .iter()
        .map(|(value, _)| truncate(value, 24))
        .collect();
    let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(format!("Top Values for {}", column), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(140)
        .build_cartesian_2d(0.0..max * 1.05, (0..counts.len()).into_segmented())
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Count")
        .x_label_formatter(&|v: &f64| format!("{:.0}", v))
        .y_label_formatter(&|seg| segment_label(seg, &labels))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(idx, (_, count))| {
            Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(idx)),
                    (*count as f64, SegmentValue::Exact(idx + 1)),
                ],
                BAR_COLOR.filled(),
            )
        }))
        .map_err(render_err)?;
    Ok(())
}

fn segment_label(segment: &SegmentValue<usize>, labels: &[String]) -> String {
    match segment {
        SegmentValue::CenterOf(idx) => labels.get(*idx).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt3_rounds_to_three_decimals() {
        assert_eq!(fmt3(1.23456), "1.235");
        assert_eq!(fmt3(2.0), "2.000");
        assert_eq!(fmt3(f64::NAN), "NaN");
    }

    #[test]
    fn truncate_preserves_short_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a_rather_long_header", 10), "a_rathe...");
    }
}
