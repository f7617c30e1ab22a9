//! Band power and summary statistics of a PSD restricted to a frequency range.
//!
//! Every function takes the PSD as `channels x bins` plus its frequency axis.
//! Malformed ranges fail with [`SpectralError::InvalidParameter`]; a range that
//! selects no bins yields NaN for every channel instead of an error.
use std::collections::BTreeMap;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use crate::error::SpectralError;
use crate::spectral::bands::{band_mask, integrate_rows, Band, FreqRange, EPS};
/// Denominator range for relative band power unless the caller overrides it.
pub const DEFAULT_TOTAL_RANGE: FreqRange = FreqRange {
    fmin: 1.0,
    fmax: 45.0,
};
/// Band name -> per-channel power.
pub type BandPowers = BTreeMap<String, Array1<f64>>;
/// Power-weighted moments of the frequency distribution, per channel.
#[derive(Clone, Debug)]
pub struct SpectralMoments {
    pub centroid: Array1<f64>,
    pub variance: Array1<f64>,
    pub skewness: Array1<f64>,
    pub kurtosis: Array1<f64>,
}
/// Trapezoidal band power per channel. With `relative_to`, each value is
/// divided by the power over that range.
pub fn band_power(
    psd: ArrayView2<'_, f64>,
    freqs: ArrayView1<'_, f64>,
    bands: &[Band],
    relative_to: Option<FreqRange>,
) -> Result<BandPowers, SpectralError> {
    for band in bands {
        band.validate()?;
    }
    let denominator = relative_to.map(|total| {
        let mask = band_mask(freqs, total);
        integrate_rows(psd, freqs, &mask)
            .into_iter()
            .map(|p| p + EPS)
            .collect::<Vec<_>>()
    });
    let mut out = BandPowers::new();
    for band in bands {
        let mask = band_mask(freqs, band.range());
        let mut power = Array1::from(integrate_rows(psd, freqs, &mask));
        if let Some(total) = &denominator {
            power
                .iter_mut()
                .zip(total)
                .for_each(|(p, t)| *p /= *t);
        }
        out.insert(band.name.clone(), power);
    }
    Ok(out)
}
/// Shannon entropy of the normalized in-band spectrum. `log_base` of `e`
/// gives nats.
pub fn spectral_entropy(
    psd: ArrayView2<'_, f64>,
    freqs: ArrayView1<'_, f64>,
    range: FreqRange,
    log_base: f64,
) -> Result<Array1<f64>, SpectralError> {
    let range = FreqRange::new(range.fmin, range.fmax)?;
    if !(log_base > 0.0) || log_base == 1.0 || !log_base.is_finite() {
        return Err(SpectralError::invalid(format!("invalid log base {log_base}")));
    }
    let mask = band_mask(freqs, range);
    if mask.is_empty() {
        return Ok(Array1::from_elem(psd.nrows(), f64::NAN));
    }
    let rescale = if log_base == std::f64::consts::E {
        1.0
    } else {
        log_base.ln()
    };
    let sub = psd.select(Axis(1), &mask);
    Ok(sub
        .outer_iter()
        .map(|row| {
            let total = row.sum() + EPS;
            let h: f64 = row
                .iter()
                .map(|p| {
                    let q = p / total;
                    q * (q + EPS).ln()
                })
                .sum();
            -h / rescale
        })
        .collect())
}
pub fn spectral_moments(
    psd: ArrayView2<'_, f64>,
    freqs: ArrayView1<'_, f64>,
    range: FreqRange,
) -> Result<SpectralMoments, SpectralError> {
    let range = FreqRange::new(range.fmin, range.fmax)?;
    let n = psd.nrows();
    let mask = band_mask(freqs, range);
    if mask.is_empty() {
        let nan = Array1::from_elem(n, f64::NAN);
        return Ok(SpectralMoments {
            centroid: nan.clone(),
            variance: nan.clone(),
            skewness: nan.clone(),
            kurtosis: nan,
        });
    }
    let f = freqs.select(Axis(0), &mask);
    let sub = psd.select(Axis(1), &mask);
    let mut moments = SpectralMoments {
        centroid: Array1::zeros(n),
        variance: Array1::zeros(n),
        skewness: Array1::zeros(n),
        kurtosis: Array1::zeros(n),
    };
    for (ch, row) in sub.outer_iter().enumerate() {
        let weight = row.sum() + EPS;
        let mu = row.dot(&f) / weight;
        let central = |order: i32| -> f64 {
            row.iter()
                .zip(f.iter())
                .map(|(p, fr)| p * (fr - mu).powi(order))
                .sum()
        };
        let var = central(2) / weight;
        moments.centroid[ch] = mu;
        moments.variance[ch] = var;
        moments.skewness[ch] = central(3) / (weight * (var.sqrt() + EPS).powi(3));
        moments.kurtosis[ch] = central(4) / (weight * (var + EPS).powi(2));
    }
    Ok(moments)
}
/// Smallest in-band frequency at which cumulative power reaches `percent`
/// (0..=1) of the in-band total.
pub fn spectral_edge(
    psd: ArrayView2<'_, f64>,
    freqs: ArrayView1<'_, f64>,
    percent: f64,
    range: FreqRange,
) -> Result<Array1<f64>, SpectralError> {
    let range = FreqRange::new(range.fmin, range.fmax)?;
    if !(0.0..=1.0).contains(&percent) {
        return Err(SpectralError::invalid(format!(
            "edge percent {percent} outside [0, 1]"
        )));
    }
    let mask = band_mask(freqs, range);
    let Some(&last) = mask.last() else {
        return Ok(Array1::from_elem(psd.nrows(), f64::NAN));
    };
    let sub = psd.select(Axis(1), &mask);
    Ok(sub
        .outer_iter()
        .map(|row| {
            let cumulative: Vec<f64> = row
                .iter()
                .scan(0.0, |acc, p| {
                    *acc += p;
                    Some(*acc)
                })
                .collect();
            let total = cumulative.last().copied().unwrap_or(0.0) + EPS;
            let threshold = percent * total;
            // Vanishing totals can leave the threshold just above the final sum.
            cumulative
                .iter()
                .position(|c| *c >= threshold)
                .map(|i| freqs[mask[i]])
                .unwrap_or(freqs[last])
        })
        .collect())
}
pub fn median_frequency(
    psd: ArrayView2<'_, f64>,
    freqs: ArrayView1<'_, f64>,
    range: FreqRange,
) -> Result<Array1<f64>, SpectralError> {
    spectral_edge(psd, freqs, 0.5, range)
}
