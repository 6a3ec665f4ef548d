use crate::bounds::Bounds;
use crate::document::PlotDocument;
use crate::options::transform::{fill_placeholders, location_code};
use crate::options::Options;
use crate::scalar::Scalar;
use crate::series::{build_series, Series};
use crate::settings::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Marker shapes understood in format strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Point,
    Circle,
    Triangle,
    Square,
    Cross,
}

/// Parsed format string such as `r^-`
#[derive(Debug, Clone, Copy)]
pub struct SeriesStyle {
    pub color: RGBColor,
    pub marker: Option<Marker>,
    pub line: bool,
}

/// Parse a matplotlib-like format string: one color letter, one marker
/// character and a line token, in any order. Unknown characters are ignored;
/// a string with neither marker nor line draws a line.
pub fn parse_style(fmt: &str) -> SeriesStyle {
    let mut style = SeriesStyle {
        color: BLUE,
        marker: None,
        line: false,
    };

    for c in fmt.chars() {
        match c {
            'b' => style.color = BLUE,
            'g' => style.color = GREEN,
            'r' => style.color = RED,
            'c' => style.color = CYAN,
            'm' => style.color = MAGENTA,
            'y' => style.color = YELLOW,
            'k' => style.color = BLACK,
            'w' => style.color = WHITE,
            '.' => style.marker = Some(Marker::Point),
            'o' => style.marker = Some(Marker::Circle),
            '^' | 'v' | '<' | '>' => style.marker = Some(Marker::Triangle),
            's' | 'd' | 'D' => style.marker = Some(Marker::Square),
            'x' | '+' | '*' => style.marker = Some(Marker::Cross),
            '-' | ':' => style.line = true,
            _ => {}
        }
    }

    if style.marker.is_none() {
        style.line = true;
    }
    style
}

/// Horizontal and vertical placement (0 start, 1 middle, 2 end) for a
/// location code. "best" is treated as upper right.
pub fn placement(code: i64) -> (u8, u8) {
    match code {
        2 => (0, 0),
        3 => (0, 2),
        4 => (2, 2),
        5 | 7 => (2, 1),
        6 => (0, 1),
        8 => (1, 2),
        9 => (1, 0),
        10 => (1, 1),
        _ => (2, 0),
    }
}

pub fn legend_position(code: i64) -> SeriesLabelPosition {
    match placement(code) {
        (0, 0) => SeriesLabelPosition::UpperLeft,
        (0, 1) => SeriesLabelPosition::MiddleLeft,
        (0, _) => SeriesLabelPosition::LowerLeft,
        (1, 0) => SeriesLabelPosition::UpperMiddle,
        (1, 1) => SeriesLabelPosition::MiddleMiddle,
        (1, _) => SeriesLabelPosition::LowerMiddle,
        (_, 0) => SeriesLabelPosition::UpperRight,
        (_, 1) => SeriesLabelPosition::MiddleRight,
        _ => SeriesLabelPosition::LowerRight,
    }
}

/// Lines of the parameter box. The option is a template with `{param}`
/// and `{nl}` placeholders; `"all"` lists every parameter as `name: value`.
pub fn parameter_lines(spec: Option<&Scalar>, doc: &PlotDocument) -> Vec<String> {
    let params = doc.parameters();
    let template = match spec {
        None => return Vec::new(),
        Some(Scalar::Str(s)) if s == "all" => params
            .keys()
            .map(|k| format!("{k}: {{{k}}}"))
            .collect::<Vec<_>>()
            .join("{nl}"),
        Some(other) => other.to_string(),
    };
    fill_placeholders(&template, params)
        .split('\n')
        .map(String::from)
        .collect()
}

/// Axis title: the first entry of `key` when set, otherwise the label of
/// the first column selected by `column`.
pub fn axis_title(config: &Options, doc: &PlotDocument, key: &str, column: &str) -> Option<String> {
    let first = |v: &Scalar| v.items().into_iter().next();
    match config.get(key) {
        Some(v) => first(v).map(|t| t.to_string()),
        None => config
            .get(column)
            .and_then(first)
            .and_then(|c| c.as_i64())
            .and_then(|c| usize::try_from(c).ok())
            .and_then(|c| doc.labels().get(c).cloned()),
    }
}

/// Output size in pixels: `size_inch` times the dpi, or the configured
/// width and height.
pub fn pixel_size(config: &Options, render: &RenderOptions) -> (u32, u32) {
    let inches = config
        .get("size_inch")
        .and_then(Scalar::as_list)
        .and_then(|l| Some((l.first()?.as_f64()?, l.get(1)?.as_f64()?)));
    match inches {
        Some((w, h)) if w > 0.0 && h > 0.0 => (
            (w * render.dpi as f64).round() as u32,
            (h * render.dpi as f64).round() as u32,
        ),
        _ => (render.width, render.height),
    }
}

fn font(size: f64) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size, FontStyle::Normal)
}

/// Draw the whole chart onto `root`.
pub fn draw<DB>(
    root: DrawingArea<DB, Shift>,
    config: &Options,
    doc: &PlotDocument,
    series: &[Series],
    bounds: &Bounds,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let fontsize = config.get("fontsize").and_then(Scalar::as_f64).unwrap_or(12.0);
    let alpha = config.get("alpha").and_then(Scalar::as_f64).unwrap_or(1.0);
    let (x_range, y_range) = bounds.ranges(config.get("border"));
    debug!(?x_range, ?y_range, "chart ranges");

    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(15)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 45);
    if let Some(title) = config.get("title") {
        let title = fill_placeholders(&title.to_string(), doc.parameters());
        builder.caption(title, font(fontsize * 1.4));
    }
    let mut chart = builder.build_cartesian_2d(x_range, y_range)?;

    {
        let mut mesh = chart.configure_mesh();
        mesh.label_style(font(fontsize));
        if let Some(title) = axis_title(config, doc, "xlabel", "x") {
            mesh.x_desc(title);
        }
        let y_title = if series.len() == 1 {
            axis_title(config, doc, "ylabel", "y")
        } else {
            config
                .get("ylabel2")
                .and_then(|v| v.items().into_iter().next())
                .map(|t| t.to_string())
        };
        if let Some(title) = y_title {
            mesh.y_desc(title);
        }
        if let Some(n) = config.get("xticks").and_then(Scalar::as_i64).filter(|n| *n > 0) {
            mesh.x_labels(n as usize);
        }
        if let Some(n) = config.get("yticks").and_then(Scalar::as_i64).filter(|n| *n > 0) {
            mesh.y_labels(n as usize);
        }
        mesh.draw()?;
    }

    for s in series {
        let style = parse_style(&s.style);
        let color = style.color.mix(alpha);
        let size = s.markersize.max(1.0).round() as i32;
        let points: Vec<(f64, f64)> = s.x.iter().copied().zip(s.y.iter().copied()).collect();

        if let Some(yerr) = &s.yerr {
            chart.draw_series(
                points
                    .iter()
                    .zip(yerr)
                    .map(|(&(x, y), &e)| ErrorBar::new_vertical(x, y - e, y, y + e, color.filled(), 6)),
            )?;
        }
        if let Some(xerr) = &s.xerr {
            chart.draw_series(
                points
                    .iter()
                    .zip(xerr)
                    .map(|(&(x, y), &e)| ErrorBar::new_horizontal(y, x - e, x, x + e, color.filled(), 6)),
            )?;
        }

        if style.line {
            chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
        }
        match style.marker {
            Some(Marker::Point) => {
                chart.draw_series(points.iter().map(|&p| Circle::new(p, 2, color.filled())))?;
            }
            Some(Marker::Circle) => {
                chart.draw_series(points.iter().map(|&p| Circle::new(p, size, color.filled())))?;
            }
            Some(Marker::Triangle) => {
                chart.draw_series(points.iter().map(|&p| TriangleMarker::new(p, size, color.filled())))?;
            }
            Some(Marker::Square) => {
                chart.draw_series(points.iter().map(|&p| {
                    EmptyElement::at(p) + Rectangle::new([(-size, -size), (size, size)], color.filled())
                }))?;
            }
            Some(Marker::Cross) => {
                chart.draw_series(points.iter().map(|&p| Cross::new(p, size, color)))?;
            }
            None => {}
        }

        let anno = chart.draw_series(LineSeries::new(std::iter::empty::<(f64, f64)>(), color))?;
        anno.label(s.label.as_str());
        if style.line {
            anno.legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        } else {
            anno.legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
        }

        if let Some(fit) = &s.fit {
            let fit_color = parse_style(&fit.style).color.mix(alpha);
            chart.draw_series(LineSeries::new(
                fit.x.iter().map(|&x| (x, fit.slope * x + fit.intercept)),
                fit_color.stroke_width(1),
            ))?;
        }
    }

    if series.len() > 1 {
        let code = config.get("legend_loc").and_then(location_code).unwrap_or(0);
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK.mix(0.3))
            .label_font(font(fontsize))
            .position(legend_position(code))
            .draw()?;
    }

    let lines = parameter_lines(config.get("parameter"), doc);
    if !lines.is_empty() {
        let area = chart.plotting_area().strip_coord_spec();
        let (w, h) = area.dim_in_pixel();
        let line_height = (fontsize * 1.3).round() as i32;
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let box_w = (widest as f64 * fontsize * 0.6).round() as i32;
        let box_h = line_height * lines.len() as i32;
        let code = config.get("parameter_loc").and_then(location_code).unwrap_or(2);
        let (hpos, vpos) = placement(code);
        let pad = 8;
        let x0 = match hpos {
            0 => pad,
            1 => (w as i32 - box_w) / 2,
            _ => w as i32 - box_w - pad,
        };
        let y0 = match vpos {
            0 => pad,
            1 => (h as i32 - box_h) / 2,
            _ => h as i32 - box_h - pad,
        };
        for (i, line) in lines.iter().enumerate() {
            area.draw(&Text::new(
                line.clone(),
                (x0, y0 + i as i32 * line_height),
                font(fontsize).color(&BLACK),
            ))?;
        }
    }

    root.present()?;
    Ok(())
}

/// Draw into an RGB buffer and encode it as PNG.
pub fn render_png(
    config: &Options,
    doc: &PlotDocument,
    series: &[Series],
    bounds: &Bounds,
    (width, height): (u32, u32),
) -> Result<Vec<u8>> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .with_context(|| format!("Chart size {}x{} is too large", width, height))?;
    let mut buffer = vec![0u8; len];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw(root, config, doc, series, bounds)?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

/// Build the series for a resolved configuration and write the chart to
/// its `o` path. Returns the written path.
pub fn render(config: &Options, doc: &PlotDocument, options: &RenderOptions) -> Result<PathBuf> {
    let out = config
        .get("o")
        .and_then(Scalar::as_str)
        .map(PathBuf::from)
        .context("No output path configured")?;

    let mut bounds = Bounds::new();
    let series = build_series(config, doc, &mut bounds)?;
    bounds.apply_limits(config.get("xlim"), config.get("ylim"));
    let size = pixel_size(config, options);

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    match options.format.for_path(&out) {
        OutputFormat::Png => {
            let bytes = render_png(config, doc, &series, &bounds, size)?;
            fs::write(&out, bytes).with_context(|| format!("Failed to write {}", out.display()))?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(&out, size).into_drawing_area();
            draw(root, config, doc, &series, &bounds)?;
        }
    }

    info!(path = %out.display(), series = series.len(), "rendered chart");
    Ok(out)
}
