// src/batch/mod.rs
// 批处理编排：枚举受试者，把每个 (受试者, 任务) 交给工作线程池，写出结果文件与运行汇总
pub mod artifact;
pub mod config;
pub mod montage;
pub mod pool;
pub mod report;
pub mod scheduler;
pub mod source;
pub mod unit;
use std::path::Path;
use std::sync::Arc;
pub use artifact::{
    read_band_powers, read_json, write_json, ArtifactPaths, MetricsArtifact, OutputLayout,
    PsdArtifact, RunSummary,
};
pub use config::RunConfig;
pub use montage::{ChannelSource, FittedLabels, Montage};
pub use pool::{Completion, WorkerCrash, WorkerPool};
pub use report::{ChannelReporter, LogReporter, Reporter, RunEvent, RunPhase};
pub use scheduler::{RunReport, Scheduler, UnitFailure};
pub use source::{parse_subject, JsonSubjectSource, ManualSource, SubjectRecord, SubjectSource};
pub use unit::{TaskComputeUnit, UnitExecutor, UnitOutcome, WorkUnit};
use crate::error::SpectralError;
/// Analyze every subject file under `input` and write artifacts to `out_dir`.
///
/// Configuration, montage and enumeration problems abort before any unit
/// runs; failures inside units only drop those units from the summary.
pub fn analyze(
    config: RunConfig,
    input: &Path,
    out_dir: &Path,
    channels: &ChannelSource,
    reporter: Arc<dyn Reporter>,
) -> Result<RunReport, SpectralError> {
    let montage = Montage::load(channels)?;
    let mut scheduler = Scheduler::spectral(config, OutputLayout::new(out_dir), reporter);
    let mut source = JsonSubjectSource::open(input)?;
    scheduler.run(&mut source, &montage)
}
