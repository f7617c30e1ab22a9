use std::fmt;
use std::str::FromStr;
use ndarray::{ArrayView1, ArrayView2, Axis};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use crate::error::SpectralError;
/// Added to denominators and log arguments so silent channels stay finite.
pub const EPS: f64 = 1e-20;
/// Named closed frequency interval in Hz.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub fmin: f64,
    pub fmax: f64,
}
impl Band {
    pub fn new(name: impl Into<String>, fmin: f64, fmax: f64) -> Result<Self, SpectralError> {
        let range = FreqRange::new(fmin, fmax)?;
        Ok(Self {
            name: name.into(),
            fmin: range.fmin,
            fmax: range.fmax,
        })
    }
    pub fn range(&self) -> FreqRange {
        FreqRange {
            fmin: self.fmin,
            fmax: self.fmax,
        }
    }
    pub fn validate(&self) -> Result<(), SpectralError> {
        FreqRange::new(self.fmin, self.fmax).map(|_| ())
    }
}
/// Delta, theta, alpha, beta and gamma.
pub static DEFAULT_BANDS: Lazy<Vec<Band>> = Lazy::new(|| {
    vec![
        Band {
            name: "delta".into(),
            fmin: 1.0,
            fmax: 4.0,
        },
        Band {
            name: "theta".into(),
            fmin: 4.0,
            fmax: 7.0,
        },
        Band {
            name: "alpha".into(),
            fmin: 8.0,
            fmax: 13.0,
        },
        Band {
            name: "beta".into(),
            fmin: 13.0,
            fmax: 30.0,
        },
        Band {
            name: "gamma".into(),
            fmin: 30.0,
            fmax: 45.0,
        },
    ]
});
/// Default bands with the alpha entry replaced by `alpha`.
pub fn standard_bands(alpha: FreqRange) -> Vec<Band> {
    DEFAULT_BANDS
        .iter()
        .map(|band| {
            if band.name == "alpha" {
                Band {
                    name: band.name.clone(),
                    fmin: alpha.fmin,
                    fmax: alpha.fmax,
                }
            } else {
                band.clone()
            }
        })
        .collect()
}
/// Inclusive `[fmin, fmax]` with `fmin < fmax`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct FreqRange {
    pub fmin: f64,
    pub fmax: f64,
}
impl FreqRange {
    pub fn new(fmin: f64, fmax: f64) -> Result<Self, SpectralError> {
        if !fmin.is_finite() || !fmax.is_finite() || fmin < 0.0 || !(fmin < fmax) {
            return Err(SpectralError::invalid(format!(
                "malformed band bounds [{fmin}, {fmax}]"
            )));
        }
        Ok(Self { fmin, fmax })
    }
    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.fmin && freq <= self.fmax
    }
}
impl fmt::Display for FreqRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.fmin, self.fmax)
    }
}
/// Parses `"8,13"`.
impl FromStr for FreqRange {
    type Err = SpectralError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);
        let (Some(lo), Some(hi), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(SpectralError::invalid(format!(
                "expected 'fmin,fmax', got '{s}'"
            )));
        };
        let parse = |v: &str| {
            v.parse::<f64>()
                .map_err(|_| SpectralError::invalid(format!("not a frequency: '{v}'")))
        };
        FreqRange::new(parse(lo)?, parse(hi)?)
    }
}
impl TryFrom<[f64; 2]> for FreqRange {
    type Error = SpectralError;
    fn try_from(value: [f64; 2]) -> Result<Self, Self::Error> {
        FreqRange::new(value[0], value[1])
    }
}
impl From<FreqRange> for [f64; 2] {
    fn from(value: FreqRange) -> Self {
        [value.fmin, value.fmax]
    }
}
/// Indices of the frequency bins inside `range`, bounds inclusive.
pub fn band_mask(freqs: ArrayView1<'_, f64>, range: FreqRange) -> Vec<usize> {
    freqs
        .iter()
        .enumerate()
        .filter(|(_, f)| range.contains(**f))
        .map(|(i, _)| i)
        .collect()
}
/// Trapezoidal integral of `y` over the sample points `x`.
pub fn trapezoid(y: ArrayView1<'_, f64>, x: ArrayView1<'_, f64>) -> f64 {
    let n = y.len().min(x.len());
    (1..n)
        .map(|i| (x[i] - x[i - 1]) * (y[i] + y[i - 1]) / 2.0)
        .sum()
}
/// Integrate every channel of `psd` over the bins in `mask`. An empty mask
/// gives NaN per channel.
pub(crate) fn integrate_rows(
    psd: ArrayView2<'_, f64>,
    freqs: ArrayView1<'_, f64>,
    mask: &[usize],
) -> Vec<f64> {
    if mask.is_empty() {
        return vec![f64::NAN; psd.nrows()];
    }
    let f = freqs.select(Axis(0), mask);
    let sub = psd.select(Axis(1), mask);
    sub.outer_iter().map(|row| trapezoid(row, f.view())).collect()
}
