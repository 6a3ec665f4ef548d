// Series data handed to the renderer, built from a resolved configuration

use crate::bounds::Bounds;
use crate::document::PlotDocument;
use crate::options::Options;
use crate::scalar::Scalar;
use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

/// One y-series ready for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub xerr: Option<Vec<f64>>,
    pub yerr: Option<Vec<f64>>,
    /// Format string such as `r^-`
    pub style: String,
    pub markersize: f64,
    pub fit: Option<Fit>,
}

/// Least-squares line drawn alongside a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Fit {
    pub slope: f64,
    pub intercept: f64,
    pub x: Vec<f64>,
    pub style: String,
}

/// Cycles through the configured styles, one per drawn line.
struct StyleCycle {
    styles: Vec<String>,
    next: usize,
}

impl StyleCycle {
    fn new(config: &Options) -> Self {
        let styles: Vec<String> = config
            .get("style")
            .map(Scalar::items)
            .unwrap_or_default()
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self { styles, next: 0 }
    }

    fn take(&mut self) -> String {
        if self.styles.is_empty() {
            return "b-".to_string();
        }
        let style = self.styles[self.next % self.styles.len()].clone();
        self.next += 1;
        style
    }
}

/// Per-series entry of an expanded option.
fn entry<'a>(config: &'a Options, key: &str, idx: usize) -> Option<&'a Scalar> {
    config.get(key).and_then(Scalar::as_list).and_then(|l| l.get(idx))
}

fn numeric_column(doc: &PlotDocument, idx: i64) -> Result<Vec<f64>> {
    let col = usize::try_from(idx)
        .ok()
        .and_then(|i| doc.column(i))
        .ok_or_else(|| anyhow!("column {} does not exist ({} columns)", idx, doc.labels().len()))?;
    col.iter()
        .enumerate()
        .map(|(row, v)| {
            v.as_f64().ok_or_else(|| {
                anyhow!(
                    "non-numeric value '{}' in column '{}' at row {}",
                    v,
                    doc.labels()[idx as usize],
                    row
                )
            })
        })
        .collect()
}

fn column_index(config: &Options, key: &str, idx: usize) -> Result<Option<i64>> {
    match entry(config, key, idx) {
        None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| anyhow!("option '{}' entry {} is not a column index: {}", key, idx, v)),
    }
}

/// Row indices picked by a `[begin, step]` or `[begin, end, step]` selection.
pub fn selection(len: usize, sel: &Scalar) -> Result<Vec<usize>> {
    let parts: Vec<i64> = sel
        .items()
        .iter()
        .map(|v| v.as_i64().ok_or_else(|| anyhow!("selection entry {} is not an integer", v)))
        .collect::<Result<_>>()?;
    let (begin, end, step) = match parts.as_slice() {
        [b, s] => (*b, len as i64, *s),
        [b, e, s] => (*b, *e, *s),
        _ => bail!("selection {} needs [begin, step] or [begin, end, step]", sel),
    };
    if step <= 0 {
        bail!("selection step must be positive, got {}", step);
    }
    let begin = begin.clamp(0, len as i64) as usize;
    let end = end.clamp(0, len as i64) as usize;
    Ok((begin..end).step_by(step as usize).collect())
}

fn pick(values: &[f64], rows: &[usize]) -> Vec<f64> {
    rows.iter().map(|&r| values[r]).collect()
}

/// Running sum; for errors the running root of summed squares.
pub fn accumulate(values: &[f64], error: bool) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .map(|v| {
            if error {
                total += v * v;
                total.sqrt()
            } else {
                total += v;
                total
            }
        })
        .collect()
}

/// Smooth with a triangular kernel of half-width `n` (weights n+1 .. 1),
/// renormalized at the edges.
pub fn triangular_convolution(values: &[f64], n: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(n);
            let hi = (i + n).min(values.len() - 1);
            let (mut sum, mut norm) = (0.0, 0.0);
            for (j, v) in values.iter().enumerate().take(hi + 1).skip(lo) {
                let w = (n + 1 - i.abs_diff(j)) as f64;
                sum += v * w;
                norm += w;
            }
            sum / norm
        })
        .collect()
}

/// Least-squares slope and intercept, `None` with fewer than two distinct x.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len()) as f64;
    if n < 2.0 {
        return None;
    }
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Build every y-series from the resolved configuration, widening `bounds`
/// by each plotted series.
pub fn build_series(config: &Options, doc: &PlotDocument, bounds: &mut Bounds) -> Result<Vec<Series>> {
    let ys = config
        .get("y")
        .map(Scalar::items)
        .ok_or_else(|| anyhow!("no y column selected"))?;
    let mut styles = StyleCycle::new(config);
    let mut out = Vec::with_capacity(ys.len());

    for (i, y_idx) in ys.iter().enumerate() {
        let y_idx = y_idx
            .as_i64()
            .ok_or_else(|| anyhow!("y entry {} is not a column index", y_idx))?;
        let x_idx = column_index(config, "x", i)?.unwrap_or(0);

        let mut x = numeric_column(doc, x_idx).context("x column")?;
        let mut y = numeric_column(doc, y_idx).context("y column")?;
        let mut xerr = match column_index(config, "xerr", i)? {
            Some(c) if c >= 0 => Some(numeric_column(doc, c).context("xerr column")?),
            _ => None,
        };
        let mut yerr = match column_index(config, "yerr", i)? {
            Some(c) if c >= 0 => Some(numeric_column(doc, c).context("yerr column")?),
            _ => None,
        };

        let select = |key: &str,
                          x: &mut Vec<f64>,
                          y: &mut Vec<f64>,
                          xerr: &mut Option<Vec<f64>>,
                          yerr: &mut Option<Vec<f64>>|
         -> Result<()> {
            if let Some(sel) = entry(config, key, i) {
                let rows = selection(x.len(), sel).with_context(|| format!("option '{}'", key))?;
                *x = pick(x, &rows);
                *y = pick(y, &rows);
                if let Some(e) = xerr.as_mut() {
                    *e = pick(e, &rows);
                }
                if let Some(e) = yerr.as_mut() {
                    *e = pick(e, &rows);
                }
            }
            Ok(())
        };

        select("dsel", &mut x, &mut y, &mut xerr, &mut yerr)?;

        if entry(config, "acc", i).and_then(Scalar::as_i64) == Some(1) {
            y = accumulate(&y, false);
            yerr = yerr.map(|e| accumulate(&e, true));
        }
        if let Some(n) = entry(config, "triconv", i).and_then(Scalar::as_i64).filter(|n| *n > 0) {
            y = triangular_convolution(&y, n as usize);
            yerr = yerr.map(|e| triangular_convolution(&e, n as usize));
        }

        let style = styles.take();

        select("psel", &mut x, &mut y, &mut xerr, &mut yerr)?;
        bounds.update(&x, &y);

        let label = entry(config, "ylabel", i)
            .map(|v| v.to_string())
            .unwrap_or_else(|| doc.labels()[y_idx as usize].clone());

        let fit = match entry(config, "linreg", i) {
            None => None,
            Some(Scalar::Str(s)) if s == "none" => None,
            Some(spec) => match linear_fit(&x, &y) {
                Some((slope, intercept)) => {
                    let fit_x = match spec.as_list() {
                        Some(xs) => xs.iter().filter_map(Scalar::as_f64).collect(),
                        None => x.clone(),
                    };
                    Some(Fit {
                        slope,
                        intercept,
                        x: fit_x,
                        style: styles.take(),
                    })
                }
                None => {
                    warn!(series = i, "not enough points for a linear fit");
                    None
                }
            },
        };

        debug!(series = i, points = x.len(), %label, "built series");

        out.push(Series {
            label,
            x,
            y,
            xerr,
            yerr,
            style,
            markersize: entry(config, "markersize", i)
                .and_then(Scalar::as_f64)
                .unwrap_or(6.0),
            fit,
        });
    }

    Ok(out)
}
