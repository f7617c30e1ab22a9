use std::sync::Arc;
use ndarray::{Array1, Array2};
use rustfft::{num_complex::Complex64, FftPlanner};
use crate::error::SpectralError;
use crate::spectral::{TimeSeriesBlock, WindowKind};
/// Power spectral density for each channel.
#[derive(Clone, Debug)]
pub struct PowerSpectrum {
    pub sample_rate_hz: f64,
    pub freqs: Array1<f64>,
    pub psd: Array2<f64>, // channel -> bins
    pub channel_labels: Arc<[String]>,
}
/// Welch averaged-periodogram estimator.
#[derive(Clone, Debug)]
pub struct WelchEstimator {
    segment_len: usize,
    overlap: usize,
    window: WindowKind,
}
impl WelchEstimator {
    /// `overlap` defaults to half the segment length.
    pub fn new(
        segment_len: usize,
        overlap: Option<usize>,
        window: WindowKind,
    ) -> Result<Self, SpectralError> {
        if segment_len == 0 {
            return Err(SpectralError::invalid("segment length must be positive"));
        }
        let overlap = overlap.unwrap_or(segment_len / 2);
        if overlap >= segment_len {
            return Err(SpectralError::invalid(format!(
                "overlap {overlap} must be smaller than segment length {segment_len}"
            )));
        }
        Ok(Self {
            segment_len,
            overlap,
            window,
        })
    }
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }
    pub fn overlap(&self) -> usize {
        self.overlap
    }
    /// One-sided frequency axis, `k * fs / L` for `k = 0..=L/2`.
    pub fn frequencies(&self, sample_rate_hz: f64) -> Array1<f64> {
        let bins = self.segment_len / 2 + 1;
        Array1::from_iter((0..bins).map(|k| k as f64 * sample_rate_hz / self.segment_len as f64))
    }
    pub fn estimate(&self, block: &TimeSeriesBlock) -> Result<PowerSpectrum, SpectralError> {
        let available = block.num_samples();
        if self.segment_len > available {
            return Err(SpectralError::InsufficientData {
                needed: self.segment_len,
                available,
            });
        }
        let fs = block.sample_rate_hz();
        let window = self.window.coefficients(self.segment_len);
        let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());
        let step = self.segment_len - self.overlap;
        let n_segments = (available - self.segment_len) / step + 1;
        let bins = self.segment_len / 2 + 1;
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(self.segment_len);
        let mut buffer = vec![Complex64::new(0.0, 0.0); self.segment_len];
        let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let mut psd = Array2::<f64>::zeros((block.num_channels(), bins));
        for (ch, mut row) in psd.outer_iter_mut().enumerate() {
            let samples: Vec<f64> = block.channel(ch).iter().copied().collect();
            for seg in 0..n_segments {
                let segment = &samples[seg * step..seg * step + self.segment_len];
                let mean = segment.iter().sum::<f64>() / self.segment_len as f64;
                for ((slot, &s), &w) in buffer.iter_mut().zip(segment).zip(&window) {
                    *slot = Complex64::new((s - mean) * w, 0.0);
                }
                fft.process_with_scratch(&mut buffer, &mut scratch);
                for (acc, c) in row.iter_mut().zip(&buffer[..bins]) {
                    *acc += c.norm_sqr();
                }
            }
            row.mapv_inplace(|p| p * scale / n_segments as f64);
            // Fold negative frequencies; DC and (for even L) Nyquist appear once.
            let last_doubled = if self.segment_len % 2 == 0 { bins - 1 } else { bins };
            for p in row.iter_mut().take(last_doubled).skip(1) {
                *p *= 2.0;
            }
        }
        Ok(PowerSpectrum {
            sample_rate_hz: fs,
            freqs: self.frequencies(fs),
            psd,
            channel_labels: block.channel_labels().iter().cloned().collect(),
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;
    fn sine_block(sample_rate: f64, seconds: f64, freq: f64, amps: &[f64]) -> TimeSeriesBlock {
        let n = (sample_rate * seconds) as usize;
        let data = Array2::from_shape_fn((n, amps.len()), |(i, ch)| {
            amps[ch] * (2.0 * PI * freq * i as f64 / sample_rate).sin()
        });
        let labels: Arc<[String]> = (0..amps.len()).map(|i| format!("C{i}")).collect();
        TimeSeriesBlock::new(data, sample_rate, labels).unwrap()
    }
    #[test]
    fn frequency_axis_matches_segment_length() {
        let est = WelchEstimator::new(256, None, WindowKind::Hann).unwrap();
        assert_eq!(est.overlap(), 128);
        let f = est.frequencies(256.0);
        assert_eq!(f.len(), 129);
        assert_eq!(f[0], 0.0);
        assert!((f[128] - 128.0).abs() < 1e-12);
    }
    #[test]
    fn sinusoid_peaks_at_its_frequency() {
        let block = sine_block(256.0, 8.0, 16.0, &[1.0]);
        let est = WelchEstimator::new(256, None, WindowKind::Hann).unwrap();
        let spectrum = est.estimate(&block).unwrap();
        let row = spectrum.psd.row(0);
        let peak = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!((spectrum.freqs[peak] - 16.0).abs() < 1e-9);
        assert!(row.iter().all(|p| *p >= 0.0));
    }
    #[test]
    fn density_integrates_to_signal_variance() {
        // Parseval: integral of a one-sided density equals the mean power (A^2 / 2).
        let block = sine_block(500.0, 8.0, 10.0, &[2.0]);
        let est = WelchEstimator::new(1000, None, WindowKind::Hann).unwrap();
        let spectrum = est.estimate(&block).unwrap();
        let df = spectrum.freqs[1] - spectrum.freqs[0];
        let total: f64 = spectrum.psd.row(0).sum() * df;
        assert!((total - 2.0).abs() < 0.05, "total power {total}");
    }
    #[test]
    fn is_deterministic() {
        let block = sine_block(200.0, 4.0, 12.0, &[1.0, 0.5]);
        let est = WelchEstimator::new(128, Some(32), WindowKind::Hamming).unwrap();
        let a = est.estimate(&block).unwrap();
        let b = est.estimate(&block).unwrap();
        assert_eq!(a.psd, b.psd);
        assert_eq!(a.freqs, b.freqs);
    }
    #[test]
    fn segment_longer_than_channel_is_insufficient_data() {
        let block = sine_block(100.0, 1.0, 5.0, &[1.0]);
        let est = WelchEstimator::new(256, None, WindowKind::Hann).unwrap();
        let err = est.estimate(&block).unwrap_err();
        assert!(matches!(
            err,
            SpectralError::InsufficientData {
                needed: 256,
                available: 100
            }
        ));
    }
    #[test]
    fn overlap_not_below_segment_is_rejected() {
        assert!(matches!(
            WelchEstimator::new(128, Some(128), WindowKind::Hann),
            Err(SpectralError::InvalidParameter(_))
        ));
        assert!(matches!(
            WelchEstimator::new(0, None, WindowKind::Hann),
            Err(SpectralError::InvalidParameter(_))
        ));
    }
}
