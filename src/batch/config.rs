use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::SpectralError;
use crate::spectral::{
    standard_bands, Band, FreqRange, PeakParams, WelchEstimator, WindowKind, DEFAULT_TOTAL_RANGE,
};
/// Immutable parameters shared by every unit of a run. Validate once with
/// [`RunConfig::validate`] before enumeration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub sample_rate_hz: f64,
    #[serde(default = "default_segment_len")]
    pub segment_len: usize,
    /// Defaults to half the segment length.
    #[serde(default)]
    pub overlap: Option<usize>,
    #[serde(default)]
    pub window: WindowKind,
    #[serde(default = "default_alpha")]
    pub alpha: FreqRange,
    #[serde(default = "default_range")]
    pub total_range: FreqRange,
    /// Range used by entropy, moments and spectral edge.
    #[serde(default = "default_range")]
    pub analysis_range: FreqRange,
    #[serde(default = "default_edge_percent")]
    pub edge_percent: f64,
    #[serde(default = "default_left")]
    pub faa_left: String,
    #[serde(default = "default_right")]
    pub faa_right: String,
    #[serde(default)]
    pub faa_db: bool,
    #[serde(default)]
    pub iaf: PeakParams,
    #[serde(default = "default_workers")]
    pub workers: usize,
}
fn default_segment_len() -> usize {
    1024
}
fn default_alpha() -> FreqRange {
    FreqRange {
        fmin: 8.0,
        fmax: 13.0,
    }
}
fn default_range() -> FreqRange {
    DEFAULT_TOTAL_RANGE
}
fn default_edge_percent() -> f64 {
    0.95
}
fn default_left() -> String {
    "F3".to_owned()
}
fn default_right() -> String {
    "F4".to_owned()
}
fn default_workers() -> usize {
    4
}
impl RunConfig {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            sample_rate_hz,
            segment_len: default_segment_len(),
            overlap: None,
            window: WindowKind::default(),
            alpha: default_alpha(),
            total_range: default_range(),
            analysis_range: default_range(),
            edge_percent: default_edge_percent(),
            faa_left: default_left(),
            faa_right: default_right(),
            faa_db: false,
            iaf: PeakParams::default(),
            workers: default_workers(),
        }
    }
    pub fn from_json_file(path: &Path) -> Result<Self, SpectralError> {
        let file = File::open(path).map_err(|e| SpectralError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| SpectralError::json(path, e))
    }
    pub fn with_segment(mut self, segment_len: usize, overlap: Option<usize>) -> Self {
        self.segment_len = segment_len;
        self.overlap = overlap;
        self
    }
    pub fn with_alpha(mut self, alpha: FreqRange) -> Self {
        self.alpha = alpha;
        self
    }
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
    /// Delta, theta, configured alpha, beta, gamma.
    pub fn bands(&self) -> Vec<Band> {
        standard_bands(self.alpha)
    }
    pub fn estimator(&self) -> Result<WelchEstimator, SpectralError> {
        WelchEstimator::new(self.segment_len, self.overlap, self.window)
    }
    pub fn validate(&self) -> Result<(), SpectralError> {
        if !(self.sample_rate_hz > 0.0) || !self.sample_rate_hz.is_finite() {
            return Err(SpectralError::InvalidSampleRate);
        }
        self.estimator()?;
        for range in [self.alpha, self.total_range, self.analysis_range] {
            FreqRange::new(range.fmin, range.fmax)?;
        }
        if !(0.0..=1.0).contains(&self.edge_percent) {
            return Err(SpectralError::invalid(format!(
                "edge percent {} outside [0, 1]",
                self.edge_percent
            )));
        }
        self.iaf.validate()?;
        if self.workers == 0 {
            return Err(SpectralError::invalid("worker pool needs at least one worker"));
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_validate() {
        let config = RunConfig::new(500.0);
        config.validate().unwrap();
        assert_eq!(config.estimator().unwrap().overlap(), 512);
        assert_eq!(config.bands().len(), 5);
    }
    #[test]
    fn invalid_settings_are_caught_once() {
        assert!(matches!(
            RunConfig::new(0.0).validate(),
            Err(SpectralError::InvalidSampleRate)
        ));
        let overlap = RunConfig::new(250.0).with_segment(256, Some(300));
        assert!(matches!(
            overlap.validate(),
            Err(SpectralError::InvalidParameter(_))
        ));
        assert!(RunConfig::new(250.0).with_workers(0).validate().is_err());
        let mut edge = RunConfig::new(250.0);
        edge.edge_percent = 1.2;
        assert!(edge.validate().is_err());
    }
    #[test]
    fn custom_alpha_replaces_default_band() {
        let config = RunConfig::new(500.0).with_alpha(FreqRange::new(7.5, 12.5).unwrap());
        config.validate().unwrap();
        let alpha = config
            .bands()
            .into_iter()
            .find(|b| b.name == "alpha")
            .unwrap();
        assert_eq!((alpha.fmin, alpha.fmax), (7.5, 12.5));
        assert_eq!(config.bands().len(), 5);
    }
    #[test]
    fn json_fills_in_defaults() {
        let json = r#"{ "sample_rate_hz": 256.0, "window": "hamming", "alpha": [7.0, 12.0] }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.window, WindowKind::Hamming);
        assert_eq!(config.alpha, FreqRange::new(7.0, 12.0).unwrap());
        assert_eq!(config.segment_len, 1024);
        assert_eq!(config.workers, 4);
        assert_eq!(config.faa_left, "F3");
        let inverted = r#"{ "sample_rate_hz": 256.0, "alpha": [12.0, 7.0] }"#;
        assert!(serde_json::from_str::<RunConfig>(inverted).is_err());
    }
}
