use std::path::PathBuf;
use std::sync::Arc;
use crate::batch::artifact::{
    band_record, write_json, ArtifactPaths, MetricsArtifact, MomentsRecord, OutputLayout,
    PsdArtifact,
};
use crate::batch::config::RunConfig;
use crate::batch::report::{Reporter, RunEvent};
use crate::error::SpectralError;
use crate::spectral::{
    band_power, frontal_alpha_asymmetry, individual_alpha_frequency, median_frequency,
    spectral_edge, spectral_entropy, spectral_moments, AsymmetryScale, PowerSpectrum,
    TimeSeriesBlock,
};
/// One schedulable (subject, task) recording.
#[derive(Clone, Debug)]
pub struct WorkUnit {
    pub subject_id: String,
    pub task_name: String,
    pub block: TimeSeriesBlock,
}
/// What a unit reports back to the scheduler. Errors never cross the unit
/// boundary as `Err`.
#[derive(Clone, Debug, PartialEq)]
pub enum UnitOutcome {
    Success {
        subject: String,
        task: String,
        psd: PathBuf,
        metrics: PathBuf,
    },
    Failure {
        subject: String,
        task: String,
        error: String,
    },
}
impl UnitOutcome {
    pub fn subject(&self) -> &str {
        match self {
            UnitOutcome::Success { subject, .. } | UnitOutcome::Failure { subject, .. } => subject,
        }
    }
    pub fn task(&self) -> &str {
        match self {
            UnitOutcome::Success { task, .. } | UnitOutcome::Failure { task, .. } => task,
        }
    }
    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Success { .. })
    }
}
/// Runs one unit to an outcome. Implementations run on pool threads.
pub trait UnitExecutor: Send + Sync + 'static {
    fn execute(&self, unit: WorkUnit) -> UnitOutcome;
}
/// Welch PSD, feature extraction and artifact writing for one unit.
#[derive(Clone)]
pub struct TaskComputeUnit {
    config: Arc<RunConfig>,
    layout: Arc<OutputLayout>,
    reporter: Arc<dyn Reporter>,
}
impl TaskComputeUnit {
    pub fn new(
        config: Arc<RunConfig>,
        layout: Arc<OutputLayout>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            layout,
            reporter,
        }
    }
    /// Spectrum and features without touching the filesystem.
    pub fn compute(
        &self,
        unit: &WorkUnit,
    ) -> Result<(PowerSpectrum, MetricsArtifact), SpectralError> {
        let cfg = &*self.config;
        let spectrum = cfg.estimator()?.estimate(&unit.block)?;
        let (psd, freqs) = (spectrum.psd.view(), spectrum.freqs.view());
        let bands = cfg.bands();
        let bands_abs = band_power(psd, freqs, &bands, None)?;
        let bands_rel = band_power(psd, freqs, &bands, Some(cfg.total_range))?;
        let entropy = spectral_entropy(psd, freqs, cfg.analysis_range, std::f64::consts::E)?;
        let moments = spectral_moments(psd, freqs, cfg.analysis_range)?;
        let sef = spectral_edge(psd, freqs, cfg.edge_percent, cfg.analysis_range)?;
        let f50 = median_frequency(psd, freqs, cfg.analysis_range)?;
        let faa = frontal_alpha_asymmetry(
            psd,
            freqs,
            &spectrum.channel_labels,
            &cfg.faa_left,
            &cfg.faa_right,
            cfg.alpha,
            AsymmetryScale::from_db_flag(cfg.faa_db),
        )?;
        let iaf = individual_alpha_frequency(psd, freqs, &cfg.iaf)?;
        let metrics = MetricsArtifact {
            subject: unit.subject_id.clone(),
            task: unit.task_name.clone(),
            bands_abs: band_record(&bands_abs),
            bands_rel: band_record(&bands_rel),
            entropy: entropy.to_vec(),
            moments: MomentsRecord::from(&moments),
            sef95: sef.to_vec(),
            f50: f50.to_vec(),
            faa,
            iaf: iaf.to_vec(),
            alpha_band: cfg.alpha.into(),
        };
        Ok((spectrum, metrics))
    }
    fn compute_and_persist(&self, unit: &WorkUnit) -> Result<ArtifactPaths, SpectralError> {
        let (spectrum, metrics) = self.compute(unit)?;
        let paths = self.layout.paths_for(&unit.subject_id, &unit.task_name);
        write_json(&paths.psd, &PsdArtifact::from(&spectrum))?;
        write_json(&paths.metrics, &metrics)?;
        Ok(paths)
    }
}
impl UnitExecutor for TaskComputeUnit {
    fn execute(&self, unit: WorkUnit) -> UnitOutcome {
        let (samples, channels) = unit.block.shape();
        self.reporter.report(RunEvent::UnitStarted {
            subject: unit.subject_id.clone(),
            task: unit.task_name.clone(),
            samples,
            channels,
        });
        match self.compute_and_persist(&unit) {
            Ok(paths) => {
                self.reporter.report(RunEvent::UnitFinished {
                    subject: unit.subject_id.clone(),
                    task: unit.task_name.clone(),
                    psd: paths.psd.clone(),
                    metrics: paths.metrics.clone(),
                });
                UnitOutcome::Success {
                    subject: unit.subject_id,
                    task: unit.task_name,
                    psd: paths.psd,
                    metrics: paths.metrics,
                }
            }
            Err(err) => UnitOutcome::Failure {
                subject: unit.subject_id,
                task: unit.task_name,
                error: err.to_string(),
            },
        }
    }
}
