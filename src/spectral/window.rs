use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::SpectralError;
/// Taper applied to each Welch segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WindowKind {
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
    Nuttall,
    FlatTop,
    Bartlett,
    Triang,
    Boxcar,
}
const HANN: &[f64] = &[0.5, 0.5];
const HAMMING: &[f64] = &[0.54, 0.46];
const BLACKMAN: &[f64] = &[0.42, 0.50, 0.08];
const BLACKMAN_HARRIS: &[f64] = &[0.35875, 0.48829, 0.14128, 0.01168];
const NUTTALL: &[f64] = &[0.3635819, 0.4891775, 0.1365995, 0.0106411];
const FLAT_TOP: &[f64] = &[
    0.21557895,
    0.41663158,
    0.277263158,
    0.083578947,
    0.006947368,
];
impl WindowKind {
    pub fn name(&self) -> &'static str {
        match self {
            WindowKind::Hann => "hann",
            WindowKind::Hamming => "hamming",
            WindowKind::Blackman => "blackman",
            WindowKind::BlackmanHarris => "blackmanharris",
            WindowKind::Nuttall => "nuttall",
            WindowKind::FlatTop => "flattop",
            WindowKind::Bartlett => "bartlett",
            WindowKind::Triang => "triang",
            WindowKind::Boxcar => "boxcar",
        }
    }
    /// Periodic (DFT-even) coefficients of length `size`: the symmetric
    /// window of `size + 1` points with the last one dropped.
    pub fn coefficients(&self, size: usize) -> Vec<f64> {
        match self {
            WindowKind::Hann => cosine_sum(HANN, size),
            WindowKind::Hamming => cosine_sum(HAMMING, size),
            WindowKind::Blackman => cosine_sum(BLACKMAN, size),
            WindowKind::BlackmanHarris => cosine_sum(BLACKMAN_HARRIS, size),
            WindowKind::Nuttall => cosine_sum(NUTTALL, size),
            WindowKind::FlatTop => cosine_sum(FLAT_TOP, size),
            WindowKind::Bartlett => {
                let n = size as f64;
                (0..size)
                    .map(|i| 1.0 - (2.0 * i as f64 / n - 1.0).abs())
                    .collect()
            }
            WindowKind::Triang => {
                let m = size + 1;
                // Divide by m + 1 for odd m and by m for even m.
                let denom = (if m % 2 == 1 { m + 1 } else { m }) as f64;
                (0..size)
                    .map(|i| 1.0 - (2.0 * i as f64 - (m - 1) as f64).abs() / denom)
                    .collect()
            }
            WindowKind::Boxcar => vec![1.0; size],
        }
    }
}
/// `sum_k (-1)^k a_k cos(k * 2 pi i / size)`
fn cosine_sum(a: &[f64], size: usize) -> Vec<f64> {
    let n = size as f64;
    (0..size)
        .map(|i| {
            let phase = 2.0 * PI * i as f64 / n;
            a.iter()
                .enumerate()
                .map(|(k, ak)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * ak * (k as f64 * phase).cos()
                })
                .sum()
        })
        .collect()
}
impl Default for WindowKind {
    fn default() -> Self {
        WindowKind::Hann
    }
}
impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
impl FromStr for WindowKind {
    type Err = SpectralError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowKind::Hann),
            "hamming" => Ok(WindowKind::Hamming),
            "blackman" => Ok(WindowKind::Blackman),
            "blackmanharris" | "blackman-harris" => Ok(WindowKind::BlackmanHarris),
            "nuttall" => Ok(WindowKind::Nuttall),
            "flattop" | "flat-top" => Ok(WindowKind::FlatTop),
            "bartlett" | "triangle-bartlett" => Ok(WindowKind::Bartlett),
            "triang" | "triangle" => Ok(WindowKind::Triang),
            "boxcar" | "rectangular" | "rect" => Ok(WindowKind::Boxcar),
            other => Err(SpectralError::invalid(format!("unknown window '{other}'"))),
        }
    }
}
impl TryFrom<String> for WindowKind {
    type Error = SpectralError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl From<WindowKind> for String {
    fn from(value: WindowKind) -> Self {
        value.name().to_owned()
    }
}
