use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use crate::batch::artifact::{write_json, ArtifactPaths, OutputLayout, RunSummary};
use crate::batch::config::RunConfig;
use crate::batch::montage::Montage;
use crate::batch::pool::{Completion, WorkerPool};
use crate::batch::report::{Reporter, RunEvent, RunPhase};
use crate::batch::source::{check_artifact_name, SubjectSource};
use crate::batch::unit::{TaskComputeUnit, UnitExecutor, UnitOutcome, WorkUnit};
use crate::error::SpectralError;
use crate::spectral::TimeSeriesBlock;
/// A unit that did not produce artifacts; enough to re-run it alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitFailure {
    pub subject: String,
    pub task: String,
    pub error: String,
}
/// Everything a finished run produced.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub summary_path: PathBuf,
    pub failures: Vec<UnitFailure>,
    pub completed: usize,
    pub total: usize,
}
/// Fans (subject, task) units out over a bounded worker pool and folds the
/// outcomes into a [`RunSummary`] as they complete.
pub struct Scheduler<E: UnitExecutor> {
    config: Arc<RunConfig>,
    executor: Arc<E>,
    layout: Arc<OutputLayout>,
    reporter: Arc<dyn Reporter>,
    phase: RunPhase,
}
impl Scheduler<TaskComputeUnit> {
    /// Scheduler running the standard spectral computation per unit. The
    /// configuration is validated when the run enters enumeration.
    pub fn spectral(
        config: RunConfig,
        layout: OutputLayout,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let config = Arc::new(config);
        let layout = Arc::new(layout);
        let executor = TaskComputeUnit::new(
            Arc::clone(&config),
            Arc::clone(&layout),
            Arc::clone(&reporter),
        );
        Self::new(config, executor, layout, reporter)
    }
}
impl<E: UnitExecutor> Scheduler<E> {
    pub fn new(
        config: Arc<RunConfig>,
        executor: E,
        layout: Arc<OutputLayout>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            executor: Arc::new(executor),
            layout,
            reporter,
            phase: RunPhase::Enumerating,
        }
    }
    pub fn phase(&self) -> RunPhase {
        self.phase
    }
    /// Enumerate `source`, then dispatch every unit and finalize the summary.
    pub fn run<S: SubjectSource>(
        &mut self,
        source: &mut S,
        montage: &Montage,
    ) -> Result<RunReport, SpectralError> {
        let units = self.enumerate(source, montage)?;
        self.dispatch(units)
    }
    /// Walk every subject and task. Labels are fitted once per subject and
    /// shared by its tasks.
    pub fn enumerate<S: SubjectSource>(
        &mut self,
        source: &mut S,
        montage: &Montage,
    ) -> Result<Vec<WorkUnit>, SpectralError> {
        self.enter(RunPhase::Enumerating);
        self.config.validate()?;
        let mut units = Vec::new();
        let mut subjects = 0;
        while let Some(subject) = source.next_subject()? {
            subjects += 1;
            check_artifact_name(&subject.subject_id, &subject.subject_id)?;
            let Some(channels) = subject.channel_count() else {
                continue;
            };
            let fitted = montage.fit(channels);
            if fitted.fell_back {
                self.reporter.report(RunEvent::ChannelFallback {
                    subject: subject.subject_id.clone(),
                    channels,
                    labels: montage.labels().len(),
                });
            }
            for (task, matrix) in subject.tasks {
                check_artifact_name(&subject.subject_id, &task)?;
                let block = TimeSeriesBlock::from_channel_major(
                    matrix,
                    self.config.sample_rate_hz,
                    Arc::clone(&fitted.labels),
                )?;
                units.push(WorkUnit {
                    subject_id: subject.subject_id.clone(),
                    task_name: task,
                    block,
                });
            }
        }
        self.reporter.report(RunEvent::Discovered {
            subjects,
            units: units.len(),
            workers: self.config.workers,
        });
        Ok(units)
    }
    /// Keep at most `workers` units in flight, topping the pool up by one each
    /// time a unit completes.
    pub fn dispatch(&mut self, units: Vec<WorkUnit>) -> Result<RunReport, SpectralError> {
        let total = units.len();
        let mut summary = RunSummary::new(&self.config);
        let mut failures = Vec::new();
        if total == 0 {
            return self.finalize(summary, failures, 0, 0);
        }
        self.enter(RunPhase::Dispatching);
        let mut pool = WorkerPool::new(self.config.workers.min(total))?;
        let mut backlog = units.into_iter().enumerate();
        let mut pending: HashMap<usize, (String, String)> = HashMap::new();
        while pool.in_flight() < pool.capacity() {
            let Some((ticket, unit)) = backlog.next() else {
                break;
            };
            self.submit(&mut pool, &mut pending, ticket, unit)?;
        }
        self.enter(RunPhase::Draining);
        let mut completed = 0;
        while let Some(Completion { ticket, result }) = pool.next_completion() {
            let (subject, task) = pending.remove(&ticket).unwrap_or_default();
            let outcome = result.unwrap_or_else(|crash| UnitOutcome::Failure {
                subject,
                task,
                error: crash.to_string(),
            });
            match outcome {
                UnitOutcome::Success {
                    subject,
                    task,
                    psd,
                    metrics,
                } => summary.record(&subject, &task, ArtifactPaths { psd, metrics }),
                UnitOutcome::Failure {
                    subject,
                    task,
                    error,
                } => {
                    self.reporter.report(RunEvent::UnitFailed {
                        subject: subject.clone(),
                        task: task.clone(),
                        error: error.clone(),
                    });
                    failures.push(UnitFailure {
                        subject,
                        task,
                        error,
                    });
                }
            }
            completed += 1;
            if let Some((ticket, unit)) = backlog.next() {
                self.submit(&mut pool, &mut pending, ticket, unit)?;
            }
            self.reporter.report(RunEvent::Progress {
                completed,
                total,
                in_flight: pool.in_flight(),
            });
        }
        drop(pool);
        self.finalize(summary, failures, completed, total)
    }
    fn submit(
        &self,
        pool: &mut WorkerPool<UnitOutcome>,
        pending: &mut HashMap<usize, (String, String)>,
        ticket: usize,
        unit: WorkUnit,
    ) -> Result<(), SpectralError> {
        pending.insert(ticket, (unit.subject_id.clone(), unit.task_name.clone()));
        let executor = Arc::clone(&self.executor);
        pool.submit(ticket, move || executor.execute(unit))
    }
    fn finalize(
        &mut self,
        summary: RunSummary,
        failures: Vec<UnitFailure>,
        completed: usize,
        total: usize,
    ) -> Result<RunReport, SpectralError> {
        let summary_path = self.layout.summary_path();
        write_json(&summary_path, &summary)?;
        self.reporter
            .report(RunEvent::SummaryWritten(summary_path.clone()));
        self.enter(RunPhase::Finalized);
        Ok(RunReport {
            summary,
            summary_path,
            failures,
            completed,
            total,
        })
    }
    fn enter(&mut self, phase: RunPhase) {
        self.phase = phase;
        self.reporter.report(RunEvent::Phase(phase));
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::montage::ChannelSource;
    use crate::batch::report::ChannelReporter;
    use crate::batch::source::{ManualSource, SubjectRecord};
    use ndarray::Array2;
    use std::f64::consts::PI;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};
    fn recording(channels: usize, samples: usize) -> Array2<f64> {
        Array2::from_shape_fn((channels, samples), |(ch, i)| {
            (ch as f64 + 1.0) * (2.0 * PI * 10.0 * i as f64 / 250.0).sin()
        })
    }
    fn config(workers: usize) -> RunConfig {
        RunConfig::new(250.0)
            .with_segment(256, None)
            .with_workers(workers)
    }
    fn montage(labels: &[&str]) -> Montage {
        Montage::load(&ChannelSource::List(
            labels.iter().map(|s| s.to_string()).collect(),
        ))
        .unwrap()
    }
    fn spectral_scheduler(
        root: &std::path::Path,
        workers: usize,
    ) -> (Scheduler<TaskComputeUnit>, mpsc::Receiver<RunEvent>) {
        let (tx, rx) = mpsc::channel();
        let scheduler = Scheduler::spectral(
            config(workers),
            OutputLayout::new(root),
            Arc::new(ChannelReporter::new(tx)),
        );
        (scheduler, rx)
    }
    #[test]
    fn failing_unit_is_dropped_and_run_finalizes() {
        let dir = tempfile::tempdir().unwrap();
        let (mut scheduler, rx) = spectral_scheduler(dir.path(), 2);
        let mut tasks = Vec::new();
        for i in 1..=5 {
            // Unit #3 is shorter than one Welch segment.
            let samples = if i == 3 { 100 } else { 1000 };
            tasks.push((format!("task{i}"), recording(2, samples)));
        }
        let mut source = ManualSource::new([SubjectRecord::new("s01", tasks)]);
        let report = scheduler
            .run(&mut source, &montage(&["F3", "F4"]))
            .unwrap();
        assert_eq!(scheduler.phase(), RunPhase::Finalized);
        assert_eq!(report.total, 5);
        assert_eq!(report.completed, 5);
        assert_eq!(report.summary.len(), 4);
        assert!(!report.summary.subjects["s01"].contains_key("task3"));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].task, "task3");
        let persisted: RunSummary =
            crate::batch::artifact::read_json(&report.summary_path).unwrap();
        assert_eq!(persisted, report.summary);
        let events: Vec<RunEvent> = rx.try_iter().collect();
        let failed = events
            .iter()
            .filter(|e| matches!(e, RunEvent::UnitFailed { .. }))
            .count();
        assert_eq!(failed, 1);
        let progress: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Progress {
                    completed,
                    total: 5,
                    ..
                } => Some(*completed),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3, 4, 5]);
        assert_eq!(events.last(), Some(&RunEvent::Phase(RunPhase::Finalized)));
    }
    #[test]
    fn empty_input_finalizes_without_scheduling() {
        let dir = tempfile::tempdir().unwrap();
        let (mut scheduler, rx) = spectral_scheduler(dir.path(), 2);
        let mut source = ManualSource::new(Vec::new());
        let report = scheduler.run(&mut source, &montage(&["F3"])).unwrap();
        assert!(report.summary.subjects.is_empty());
        assert_eq!(report.total, 0);
        assert!(report.summary_path.exists());
        let events: Vec<RunEvent> = rx.try_iter().collect();
        assert!(!events.contains(&RunEvent::Phase(RunPhase::Dispatching)));
        assert!(!events
            .iter()
            .any(|e| matches!(e, RunEvent::UnitStarted { .. })));
        assert_eq!(scheduler.phase(), RunPhase::Finalized);
    }
    #[test]
    fn labels_are_fitted_once_per_subject() {
        let dir = tempfile::tempdir().unwrap();
        let (mut scheduler, rx) = spectral_scheduler(dir.path(), 1);
        let mut source = ManualSource::new([
            SubjectRecord::new(
                "a",
                vec![
                    ("rest".into(), recording(3, 300)),
                    ("task".into(), recording(3, 300)),
                ],
            ),
            SubjectRecord::new("b", vec![("rest".into(), recording(2, 300))]),
        ]);
        let units = scheduler
            .enumerate(&mut source, &montage(&["F3", "F4"]))
            .unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].block.channel_labels(), &["Ch1", "Ch2", "Ch3"]);
        assert!(std::ptr::eq(
            units[0].block.channel_labels(),
            units[1].block.channel_labels()
        ));
        assert_eq!(units[2].block.channel_labels(), &["F3", "F4"]);
        let fallbacks: Vec<RunEvent> = rx
            .try_iter()
            .filter(|e| matches!(e, RunEvent::ChannelFallback { .. }))
            .collect();
        assert_eq!(
            fallbacks,
            vec![RunEvent::ChannelFallback {
                subject: "a".into(),
                channels: 3,
                labels: 2,
            }]
        );
    }
    #[test]
    fn invalid_config_aborts_before_scheduling() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let bad = config(2).with_segment(256, Some(256));
        let mut scheduler = Scheduler::spectral(
            bad,
            OutputLayout::new(dir.path()),
            Arc::new(ChannelReporter::new(tx)),
        );
        let mut source = ManualSource::new([SubjectRecord::new(
            "s01",
            vec![("rest".into(), recording(2, 1000))],
        )]);
        let err = scheduler
            .run(&mut source, &montage(&["F3", "F4"]))
            .unwrap_err();
        assert!(matches!(err, SpectralError::InvalidParameter(_)));
        assert!(!dir.path().join("summary.json").exists());
        assert!(!rx
            .try_iter()
            .any(|e| matches!(e, RunEvent::UnitStarted { .. })));
    }
    #[test]
    fn unsafe_names_abort_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        let (mut scheduler, _rx) = spectral_scheduler(dir.path(), 1);
        let mut source = ManualSource::new([SubjectRecord::new(
            "s01",
            vec![("../../../escaped".into(), recording(2, 300))],
        )]);
        let err = scheduler
            .run(&mut source, &montage(&["F3", "F4"]))
            .unwrap_err();
        assert!(matches!(err, SpectralError::Enumeration(_)));
        let mut source = ManualSource::new([SubjectRecord::new(
            "../s01",
            vec![("rest".into(), recording(2, 300))],
        )]);
        assert!(scheduler
            .run(&mut source, &montage(&["F3", "F4"]))
            .is_err());
        assert!(!dir.path().join("summary.json").exists());
    }
    /// Sleeps, tracks concurrency, and panics on the task named "boom".
    struct FlakyExecutor {
        running: AtomicUsize,
        peak: AtomicUsize,
    }
    impl UnitExecutor for FlakyExecutor {
        fn execute(&self, unit: WorkUnit) -> UnitOutcome {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            self.running.fetch_sub(1, Ordering::SeqCst);
            if unit.task_name == "boom" {
                panic!("unit exploded");
            }
            UnitOutcome::Success {
                psd: format!("{}.psd", unit.task_name).into(),
                metrics: format!("{}.metrics", unit.task_name).into(),
                subject: unit.subject_id,
                task: unit.task_name,
            }
        }
    }
    #[test]
    fn crashed_worker_is_a_failure_and_slot_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel();
        let mut scheduler = Scheduler::new(
            Arc::new(config(3)),
            FlakyExecutor {
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            Arc::new(OutputLayout::new(dir.path())),
            Arc::new(ChannelReporter::new(tx)),
        );
        let names = ["t0", "t1", "boom", "t3", "t4", "t5", "t6", "t7", "t8", "t9"];
        let units: Vec<WorkUnit> = names
            .iter()
            .map(|name| WorkUnit {
                subject_id: "s".into(),
                task_name: name.to_string(),
                block: TimeSeriesBlock::new(Array2::zeros((4, 1)), 250.0, Arc::from(vec!["A".to_string()]))
                    .unwrap(),
            })
            .collect();
        let report = scheduler.dispatch(units).unwrap();
        assert_eq!(report.summary.len(), 9);
        assert_eq!(
            report.failures,
            vec![UnitFailure {
                subject: "s".into(),
                task: "boom".into(),
                error: "worker crashed: unit exploded".into(),
            }]
        );
        assert!(scheduler.executor.peak.load(Ordering::SeqCst) <= 3);
    }
    /// Holds each unit until `gate` units run together, or a deadline passes.
    struct GateExecutor {
        gate: usize,
        running: AtomicUsize,
        peak: AtomicUsize,
    }
    impl UnitExecutor for GateExecutor {
        fn execute(&self, unit: WorkUnit) -> UnitOutcome {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let deadline = Instant::now() + Duration::from_secs(2);
            while self.running.load(Ordering::SeqCst) < self.gate && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            UnitOutcome::Success {
                psd: format!("{}.psd", unit.task_name).into(),
                metrics: format!("{}.metrics", unit.task_name).into(),
                subject: unit.subject_id,
                task: unit.task_name,
            }
        }
    }
    #[test]
    fn pool_stays_full_until_backlog_runs_out() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let mut scheduler = Scheduler::new(
            Arc::new(config(3)),
            GateExecutor {
                gate: 3,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            Arc::new(OutputLayout::new(dir.path())),
            Arc::new(ChannelReporter::new(tx)),
        );
        let units: Vec<WorkUnit> = (0..7)
            .map(|i| WorkUnit {
                subject_id: "s".into(),
                task_name: format!("t{i}"),
                block: TimeSeriesBlock::new(
                    Array2::zeros((4, 1)),
                    250.0,
                    Arc::from(vec!["A".to_string()]),
                )
                .unwrap(),
            })
            .collect();
        let report = scheduler.dispatch(units).unwrap();
        assert_eq!(report.summary.len(), 7);
        assert_eq!(scheduler.executor.peak.load(Ordering::SeqCst), 3);
        let progress: Vec<(usize, usize)> = rx
            .try_iter()
            .filter_map(|e| match e {
                RunEvent::Progress {
                    completed,
                    in_flight,
                    ..
                } => Some((completed, in_flight)),
                _ => None,
            })
            .collect();
        assert_eq!(progress.len(), 7);
        for (completed, in_flight) in progress {
            assert_eq!(in_flight, 3usize.min(7 - completed), "after {completed} done");
        }
    }
}
