use crate::frame::format_number;
use crate::stats::median;
use crate::{Frame, Result, TabularError};
use serde::{Deserialize, Serialize};

fn default_frac() -> f64 {
    0.1
}
fn default_kernel() -> usize {
    5
}
fn default_window() -> usize {
    7
}
fn default_sigmas() -> f64 {
    3.0
}

/// MAD to sigma for normally distributed data.
const MAD_SCALE: f64 = 1.4826;
const LOWESS_ITERATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SmoothMethod {
    Lowess {
        #[serde(default = "default_frac")]
        frac: f64,
    },
    Median {
        #[serde(default = "default_kernel")]
        kernel: usize,
    },
    Hampel {
        #[serde(default = "default_window")]
        window: usize,
        #[serde(default = "default_sigmas")]
        n_sigmas: f64,
    },
}

impl SmoothMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SmoothMethod::Lowess { .. } => "lowess",
            SmoothMethod::Median { .. } => "median",
            SmoothMethod::Hampel { .. } => "hampel",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SmoothMethod::Lowess { frac } => {
                if !frac.is_finite() || *frac <= 0.0 || *frac >= 1.0 {
                    return Err(TabularError::invalid(
                        "frac",
                        format!("fraction {frac} must lie strictly between 0 and 1"),
                    ));
                }
            }
            SmoothMethod::Median { kernel } => {
                if *kernel == 0 {
                    return Err(TabularError::invalid("kernel", "kernel size must be positive"));
                }
            }
            SmoothMethod::Hampel { window, n_sigmas } => {
                if *window == 0 {
                    return Err(TabularError::invalid("window", "window size must be positive"));
                }
                if !n_sigmas.is_finite() || *n_sigmas <= 0.0 {
                    return Err(TabularError::invalid("n_sigmas", "must be a positive number"));
                }
            }
        }
        Ok(())
    }

    pub fn apply(&self, series: &[f64]) -> Result<Vec<f64>> {
        self.validate()?;
        Ok(match self {
            SmoothMethod::Lowess { frac } => lowess(series, *frac),
            SmoothMethod::Median { kernel } => median_filter(series, *kernel),
            SmoothMethod::Hampel { window, n_sigmas } => hampel(series, *window, *n_sigmas),
        })
    }
}

/// Smooth `column` and add the result as `<column>_<method>`. Missing cells
/// stay missing and are skipped by the smoother.
pub fn smooth_column(frame: &mut Frame, column: &str, method: &SmoothMethod) -> Result<String> {
    method.validate()?;
    if !frame.is_numeric(column) {
        return Err(TabularError::NotNumeric(column.to_string()));
    }
    let values = frame.numeric(column)?;
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let mut smoothed = method.apply(&present)?.into_iter();
    let cells = values
        .iter()
        .map(|v| match v {
            Some(_) => smoothed.next().map(format_number).unwrap_or_default(),
            None => String::new(),
        })
        .collect();
    let name = format!("{column}_{}", method.name());
    frame.put_column(&name, cells)?;
    Ok(name)
}

/// Locally weighted linear regression against the row index, with bisquare
/// robustness reweighting.
pub fn lowess(y: &[f64], frac: f64) -> Vec<f64> {
    let n = y.len();
    if n < 3 {
        return y.to_vec();
    }
    let k = ((frac * n as f64).floor() as usize).clamp(2, n);
    let mut robust = vec![1.0; n];
    let mut fitted = vec![0.0; n];

    for iteration in 0..=LOWESS_ITERATIONS {
        for i in 0..n {
            let mut dist: Vec<f64> = (0..n).map(|j| (j as f64 - i as f64).abs()).collect();
            dist.sort_by(f64::total_cmp);
            let h = dist[k - 1].max(f64::EPSILON);

            let (mut sw, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for j in 0..n {
                let u = (j as f64 - i as f64).abs() / h;
                if u >= 1.0 {
                    continue;
                }
                let w = (1.0 - u.powi(3)).powi(3) * robust[j];
                let x = j as f64;
                sw += w;
                sx += w * x;
                sy += w * y[j];
                sxx += w * x * x;
                sxy += w * x * y[j];
            }
            fitted[i] = if sw <= 0.0 {
                y[i]
            } else {
                let mx = sx / sw;
                let my = sy / sw;
                let var = sxx / sw - mx * mx;
                if var.abs() < 1e-12 {
                    my
                } else {
                    let slope = (sxy / sw - mx * my) / var;
                    my + slope * (i as f64 - mx)
                }
            };
        }

        if iteration == LOWESS_ITERATIONS {
            break;
        }
        let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(a, b)| (a - b).abs()).collect();
        let s = median(&residuals).unwrap_or(0.0);
        if s <= 1e-12 {
            break;
        }
        for (r, res) in robust.iter_mut().zip(&residuals) {
            let u = res / (6.0 * s);
            *r = if u < 1.0 { (1.0 - u * u).powi(2) } else { 0.0 };
        }
    }
    fitted
}

/// Sliding median; an even kernel grows by one. The window shrinks at the
/// edges instead of padding.
pub fn median_filter(y: &[f64], kernel: usize) -> Vec<f64> {
    let kernel = if kernel % 2 == 0 { kernel + 1 } else { kernel };
    let half = kernel / 2;
    (0..y.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(y.len());
            median(&y[lo..hi]).unwrap_or(y[i])
        })
        .collect()
}

/// Replace points further than `n_sigmas` scaled MADs from the local median.
pub fn hampel(y: &[f64], window: usize, n_sigmas: f64) -> Vec<f64> {
    let window = if window % 2 == 0 { window + 1 } else { window };
    let half = window / 2;
    let mut out = y.to_vec();
    if y.len() <= 2 * half {
        return out;
    }
    for i in half..y.len() - half {
        let win = &y[i - half..=i + half];
        let Some(med) = median(win) else { continue };
        let deviations: Vec<f64> = win.iter().map(|v| (v - med).abs()).collect();
        let mad = MAD_SCALE * median(&deviations).unwrap_or(0.0);
        if mad > 0.0 && (y[i] - med).abs() > n_sigmas * mad {
            out[i] = med;
        }
    }
    out
}
