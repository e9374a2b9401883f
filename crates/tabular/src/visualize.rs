//! Plot data: scatter points, histograms, and feature distributions for the
//! low and high ends of the target. Rendering is left to the client.

use crate::outliers::check_percentile;
use crate::stats::{mean, quantile};
use crate::{Frame, Result, TabularError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BINS: usize = 20;
pub const DEFAULT_SCATTER_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    Scatter,
    Histogram,
}

/// `x` is the row index when only one column is plotted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterData {
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<[f64; 2]>,
}

/// `edges` has one more entry than `counts`; the last bin is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub column: String,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scatter: Option<ScatterData>,
    pub histograms: Vec<Histogram>,
}

/// Scatter and histogram data for one column (index vs value) or two
/// columns (first vs second). Rows missing any plotted value are skipped.
pub fn visualize(
    frame: &Frame,
    columns: &[String],
    kinds: &[PlotKind],
    scatter_limit: usize,
) -> Result<Visualization> {
    if columns.is_empty() || columns.len() > 2 {
        return Err(TabularError::invalid("columns", "pick one or two columns"));
    }
    if kinds.is_empty() {
        return Err(TabularError::invalid("plots", "pick at least one plot type"));
    }
    for c in columns {
        numeric_column(frame, c)?;
    }

    let scatter = if kinds.contains(&PlotKind::Scatter) {
        Some(match columns {
            [only] => {
                let values = frame.numeric(only)?;
                ScatterData {
                    x_label: "index".to_string(),
                    y_label: only.clone(),
                    points: values
                        .iter()
                        .take(scatter_limit)
                        .enumerate()
                        .filter_map(|(i, v)| v.map(|v| [i as f64, v]))
                        .collect(),
                }
            }
            [x, y, ..] => {
                let xs = frame.numeric(x)?;
                let ys = frame.numeric(y)?;
                ScatterData {
                    x_label: x.clone(),
                    y_label: y.clone(),
                    points: xs
                        .iter()
                        .zip(&ys)
                        .filter_map(|(a, b)| Some([(*a)?, (*b)?]))
                        .collect(),
                }
            }
            [] => return Err(TabularError::invalid("columns", "pick one or two columns")),
        })
    } else {
        None
    };

    let histograms = if kinds.contains(&PlotKind::Histogram) {
        columns
            .iter()
            .map(|c| Ok(histogram(c, &present(frame, c)?, DEFAULT_BINS)))
            .collect::<Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(Visualization {
        columns: columns.to_vec(),
        scatter,
        histograms,
    })
}

/// Equal-width bins over the value range. A constant column gets one bin.
pub fn histogram(column: &str, values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if values.is_empty() {
        return Histogram {
            column: column.to_string(),
            edges: Vec::new(),
            counts: Vec::new(),
        };
    }
    if max <= min {
        return Histogram {
            column: column.to_string(),
            edges: vec![min, max],
            counts: vec![values.len()],
        };
    }
    let width = (max - min) / bins as f64;
    let edges = (0..=bins).map(|i| min + width * i as f64).collect();
    let mut counts = vec![0; bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Histogram {
        column: column.to_string(),
        edges,
        counts,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDistribution {
    pub rows: usize,
    pub mean: Option<f64>,
    pub histogram: Histogram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureComparison {
    pub feature: String,
    pub lower: GroupDistribution,
    pub upper: GroupDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetComparison {
    pub target: String,
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub lower_cutoff: f64,
    pub upper_cutoff: f64,
    pub features: Vec<FeatureComparison>,
}

/// Compare each feature's distribution between rows whose target is at or
/// below the `lower` percentile and rows at or above the `upper` one.
/// Both groups share bin edges so their histograms overlay.
pub fn compare_by_target(
    frame: &Frame,
    target: &str,
    features: &[String],
    lower: f64,
    upper: f64,
) -> Result<TargetComparison> {
    check_percentile("lower", lower)?;
    check_percentile("upper", upper)?;
    if features.is_empty() {
        return Err(TabularError::invalid("features", "pick at least one feature"));
    }
    let target_values = frame.numeric(target)?;
    let present_target: Vec<f64> = target_values.iter().flatten().copied().collect();
    numeric_column(frame, target)?;
    let lower_cutoff = quantile(&present_target, lower / 100.0)
        .ok_or_else(|| TabularError::NotNumeric(target.to_string()))?;
    let upper_cutoff = quantile(&present_target, upper / 100.0)
        .ok_or_else(|| TabularError::NotNumeric(target.to_string()))?;

    let mut comparisons = Vec::with_capacity(features.len());
    for feature in features {
        numeric_column(frame, feature)?;
        let values = frame.numeric(feature)?;
        let mut low = Vec::new();
        let mut high = Vec::new();
        for (t, v) in target_values.iter().zip(&values) {
            let (Some(t), Some(v)) = (t, v) else { continue };
            if *t <= lower_cutoff {
                low.push(*v);
            }
            if *t >= upper_cutoff {
                high.push(*v);
            }
        }
        let all: Vec<f64> = low.iter().chain(&high).copied().collect();
        let edges = histogram(feature, &all, DEFAULT_BINS).edges;
        comparisons.push(FeatureComparison {
            feature: feature.clone(),
            lower: group(feature, &low, &edges),
            upper: group(feature, &high, &edges),
        });
    }
    Ok(TargetComparison {
        target: target.to_string(),
        lower_percentile: lower,
        upper_percentile: upper,
        lower_cutoff,
        upper_cutoff,
        features: comparisons,
    })
}

fn group(column: &str, values: &[f64], edges: &[f64]) -> GroupDistribution {
    let mut counts = vec![0; edges.len().saturating_sub(1)];
    if let (Some(first), Some(last)) = (edges.first(), edges.last()) {
        let bins = counts.len();
        let width = if bins > 0 { (last - first) / bins as f64 } else { 0.0 };
        for v in values {
            let idx = if width > 0.0 {
                (((v - first) / width) as usize).min(bins - 1)
            } else {
                0
            };
            if let Some(c) = counts.get_mut(idx) {
                *c += 1;
            }
        }
    }
    GroupDistribution {
        rows: values.len(),
        mean: mean(values),
        histogram: Histogram {
            column: column.to_string(),
            edges: edges.to_vec(),
            counts,
        },
    }
}

fn numeric_column(frame: &Frame, name: &str) -> Result<()> {
    frame.column_index(name)?;
    if !frame.is_numeric(name) {
        return Err(TabularError::NotNumeric(name.to_string()));
    }
    Ok(())
}

fn present(frame: &Frame, name: &str) -> Result<Vec<f64>> {
    Ok(frame.numeric(name)?.into_iter().flatten().collect())
}
