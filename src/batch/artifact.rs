use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use crate::batch::config::RunConfig;
use crate::error::SpectralError;
use crate::spectral::{BandPowers, PowerSpectrum, SpectralMoments};
/// Raw spectrum of one unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PsdArtifact {
    pub freqs: Vec<f64>,
    /// channels x frequency bins
    pub psd: Vec<Vec<f64>>,
    pub channels: Vec<String>,
}
impl From<&PowerSpectrum> for PsdArtifact {
    fn from(spectrum: &PowerSpectrum) -> Self {
        Self {
            freqs: spectrum.freqs.to_vec(),
            psd: spectrum.psd.outer_iter().map(|row| row.to_vec()).collect(),
            channels: spectrum.channel_labels.to_vec(),
        }
    }
}
#[derive(Clone, Debug, Serialize)]
pub struct MomentsRecord {
    pub centroid: Vec<f64>,
    pub variance: Vec<f64>,
    pub skewness: Vec<f64>,
    pub kurtosis: Vec<f64>,
}
impl From<&SpectralMoments> for MomentsRecord {
    fn from(m: &SpectralMoments) -> Self {
        Self {
            centroid: m.centroid.to_vec(),
            variance: m.variance.to_vec(),
            skewness: m.skewness.to_vec(),
            kurtosis: m.kurtosis.to_vec(),
        }
    }
}
/// Derived features of one unit. NaN values serialize as `null`.
#[derive(Clone, Debug, Serialize)]
pub struct MetricsArtifact {
    pub subject: String,
    pub task: String,
    pub bands_abs: BTreeMap<String, Vec<f64>>,
    pub bands_rel: BTreeMap<String, Vec<f64>>,
    pub entropy: Vec<f64>,
    pub moments: MomentsRecord,
    #[serde(rename = "SEF95")]
    pub sef95: Vec<f64>,
    #[serde(rename = "F50")]
    pub f50: Vec<f64>,
    #[serde(rename = "FAA")]
    pub faa: f64,
    #[serde(rename = "IAF")]
    pub iaf: Vec<f64>,
    pub alpha_band: [f64; 2],
}
pub(crate) fn band_record(powers: &BandPowers) -> BTreeMap<String, Vec<f64>> {
    powers
        .iter()
        .map(|(name, values)| (name.clone(), values.to_vec()))
        .collect()
}
/// Where a unit's two artifacts were written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub psd: PathBuf,
    pub metrics: PathBuf,
}
/// Run-level index of every successful unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub subjects: BTreeMap<String, BTreeMap<String, ArtifactPaths>>,
    pub alpha: [f64; 2],
    pub sfreq: f64,
    pub nperseg: usize,
    pub window: String,
}
impl RunSummary {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            subjects: BTreeMap::new(),
            alpha: config.alpha.into(),
            sfreq: config.sample_rate_hz,
            nperseg: config.segment_len,
            window: config.window.to_string(),
        }
    }
    pub fn record(&mut self, subject: &str, task: &str, paths: ArtifactPaths) {
        self.subjects
            .entry(subject.to_owned())
            .or_default()
            .insert(task.to_owned(), paths);
    }
    /// Number of (subject, task) entries.
    pub fn len(&self) -> usize {
        self.subjects.values().map(BTreeMap::len).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
/// On-disk layout below the output directory.
#[derive(Clone, Debug)]
pub struct OutputLayout {
    root: PathBuf,
}
impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
    pub fn root(&self) -> &Path {
        &self.root
    }
    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.root.join("subjects").join(subject)
    }
    pub fn paths_for(&self, subject: &str, task: &str) -> ArtifactPaths {
        let dir = self.subject_dir(subject);
        ArtifactPaths {
            psd: dir.join(format!("psd_{task}.json")),
            metrics: dir.join(format!("metrics_{task}.json")),
        }
    }
    pub fn summary_path(&self) -> PathBuf {
        self.root.join("summary.json")
    }
}
/// Pretty-print `value` to `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SpectralError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SpectralError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| SpectralError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| SpectralError::json(path, e))?;
    writer.flush().map_err(|e| SpectralError::io(path, e))
}
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SpectralError> {
    let file = File::open(path).map_err(|e| SpectralError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| SpectralError::json(path, e))
}
#[derive(Deserialize)]
struct BandPowerRecord {
    bands_abs: BTreeMap<String, Vec<Option<f64>>>,
}
/// Absolute band powers from a metrics artifact; `null` entries read back as NaN.
pub fn read_band_powers(path: &Path) -> Result<BTreeMap<String, Vec<f64>>, SpectralError> {
    let record: BandPowerRecord = read_json(path)?;
    Ok(record
        .bands_abs
        .into_iter()
        .map(|(band, values)| {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            (band, values)
        })
        .collect())
}
