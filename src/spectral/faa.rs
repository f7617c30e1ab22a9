use ndarray::{ArrayView1, ArrayView2, Axis};
use crate::error::SpectralError;
use crate::spectral::bands::{band_mask, integrate_rows, FreqRange, EPS};
/// How the two band powers are compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AsymmetryScale {
    /// `ln(P_right) - ln(P_left)`
    #[default]
    NaturalLog,
    /// `10 log10(P_right) - 10 log10(P_left)`
    Decibel,
}
impl AsymmetryScale {
    pub fn from_db_flag(use_db: bool) -> Self {
        if use_db {
            AsymmetryScale::Decibel
        } else {
            AsymmetryScale::NaturalLog
        }
    }
}
/// Frontal alpha asymmetry between the `left` and `right` channels.
///
/// Returns NaN when either label is missing so that incomplete montage
/// metadata does not abort the unit. A label listed twice resolves to its last
/// occurrence.
pub fn frontal_alpha_asymmetry(
    psd: ArrayView2<'_, f64>,
    freqs: ArrayView1<'_, f64>,
    channel_labels: &[String],
    left: &str,
    right: &str,
    alpha: FreqRange,
    scale: AsymmetryScale,
) -> Result<f64, SpectralError> {
    let alpha = FreqRange::new(alpha.fmin, alpha.fmax)?;
    let find = |name: &str| channel_labels.iter().rposition(|label| label == name);
    let (Some(li), Some(ri)) = (find(left), find(right)) else {
        return Ok(f64::NAN);
    };
    if li >= psd.nrows() || ri >= psd.nrows() {
        return Ok(f64::NAN);
    }
    let mask = band_mask(freqs, alpha);
    let pair = psd.select(Axis(0), &[li, ri]);
    let power = integrate_rows(pair.view(), freqs, &mask);
    let (p_left, p_right) = (power[0], power[1]);
    Ok(match scale {
        AsymmetryScale::NaturalLog => (p_right + EPS).ln() - (p_left + EPS).ln(),
        AsymmetryScale::Decibel => 10.0 * (p_right + EPS).log10() - 10.0 * (p_left + EPS).log10(),
    })
}
