//! Individual alpha frequency: the per-channel spectral peak inside a band.
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use crate::error::SpectralError;
use crate::spectral::bands::{band_mask, FreqRange};
/// Minimum lead of the peak over the in-band median.
const PEAK_MARGIN: f64 = 1e-12;
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakParams {
    pub range: FreqRange,
    pub smooth: bool,
    /// Savitzky-Golay window length, odd.
    pub window: usize,
    pub poly_order: usize,
}
impl Default for PeakParams {
    fn default() -> Self {
        Self {
            range: FreqRange {
                fmin: 7.0,
                fmax: 14.0,
            },
            smooth: true,
            window: 11,
            poly_order: 3,
        }
    }
}
impl PeakParams {
    pub fn validate(&self) -> Result<(), SpectralError> {
        FreqRange::new(self.range.fmin, self.range.fmax)?;
        if self.smooth && (self.window % 2 == 0 || self.window < self.poly_order + 2) {
            return Err(SpectralError::invalid(format!(
                "smoothing window {} must be odd and at least polynomial order + 2 ({})",
                self.window,
                self.poly_order + 2
            )));
        }
        Ok(())
    }
}
/// Frequency of the largest in-band power per channel, NaN for channels whose
/// peak does not rise above the in-band median.
pub fn individual_alpha_frequency(
    psd: ArrayView2<'_, f64>,
    freqs: ArrayView1<'_, f64>,
    params: &PeakParams,
) -> Result<Array1<f64>, SpectralError> {
    params.validate()?;
    let mask = band_mask(freqs, params.range);
    if mask.is_empty() {
        return Ok(Array1::from_elem(psd.nrows(), f64::NAN));
    }
    let f = freqs.select(Axis(0), &mask);
    let sub = psd.select(Axis(1), &mask);
    let mut peaks = Array1::from_elem(psd.nrows(), f64::NAN);
    for (ch, row) in sub.outer_iter().enumerate() {
        let values: Vec<f64> = if params.smooth && row.len() >= params.window {
            savgol_smooth(row, params.window, params.poly_order)?
        } else {
            row.to_vec()
        };
        let Some((idx, max)) = values
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        if max > median(&values) + PEAK_MARGIN {
            peaks[ch] = f[idx];
        }
    }
    Ok(peaks)
}
/// Least-squares polynomial smoothing. Points within half a window of either
/// edge are evaluated from the fit over the first or last full window.
pub fn savgol_smooth(
    y: ArrayView1<'_, f64>,
    window: usize,
    poly_order: usize,
) -> Result<Vec<f64>, SpectralError> {
    let n = y.len();
    if window == 0 || window > n || window <= poly_order {
        return Err(SpectralError::invalid(format!(
            "cannot fit order {poly_order} over window {window} with {n} points"
        )));
    }
    let half = (window / 2) as f64;
    let offsets: Vec<f64> = (0..window).map(|j| j as f64 - half).collect();
    let terms = poly_order + 1;
    // Normal equations share one Gram matrix because every fit uses the same offsets.
    let mut gram = vec![vec![0.0; terms]; terms];
    for (a, row) in gram.iter_mut().enumerate() {
        for (b, cell) in row.iter_mut().enumerate() {
            *cell = offsets.iter().map(|t| t.powi((a + b) as i32)).sum();
        }
    }
    let mut out = Vec::with_capacity(n);
    let mut fit_start = usize::MAX;
    let mut coeffs = Vec::new();
    for i in 0..n {
        let start = i.saturating_sub(window / 2).min(n - window);
        if start != fit_start {
            let rhs: Vec<f64> = (0..terms)
                .map(|a| {
                    offsets
                        .iter()
                        .enumerate()
                        .map(|(j, t)| t.powi(a as i32) * y[start + j])
                        .sum()
                })
                .collect();
            coeffs = solve(gram.clone(), rhs)
                .ok_or_else(|| SpectralError::invalid("singular smoothing system"))?;
            fit_start = start;
        }
        let at = (i - start) as f64 - half;
        out.push(coeffs.iter().rev().fold(0.0, |acc, c| acc * at + c));
    }
    Ok(out)
}
/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))?;
        if a[pivot][col].abs() < f64::EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
