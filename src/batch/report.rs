use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use log::{debug, error, info, warn};
/// Lifecycle of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Enumerating,
    Dispatching,
    Draining,
    Finalized,
}
/// Messages emitted by the scheduler and by each unit.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    Phase(RunPhase),
    Discovered {
        subjects: usize,
        units: usize,
        workers: usize,
    },
    ChannelFallback {
        subject: String,
        channels: usize,
        labels: usize,
    },
    UnitStarted {
        subject: String,
        task: String,
        samples: usize,
        channels: usize,
    },
    UnitFinished {
        subject: String,
        task: String,
        psd: PathBuf,
        metrics: PathBuf,
    },
    UnitFailed {
        subject: String,
        task: String,
        error: String,
    },
    /// Reported after the completed unit is folded in and its slot refilled.
    Progress {
        completed: usize,
        total: usize,
        in_flight: usize,
    },
    SummaryWritten(PathBuf),
}
/// Observer injected into the scheduler and every unit in place of a global
/// logger.
pub trait Reporter: Send + Sync {
    fn report(&self, event: RunEvent);
}
/// Forwards events to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;
impl Reporter for LogReporter {
    fn report(&self, event: RunEvent) {
        match event {
            RunEvent::Phase(phase) => debug!("phase: {phase:?}"),
            RunEvent::Discovered {
                subjects,
                units,
                workers,
            } => info!("Found {subjects} subject(s); total tasks to run: {units} (workers={workers})"),
            RunEvent::ChannelFallback {
                subject,
                channels,
                labels,
            } => warn!(
                "Channel count mismatch for {subject}: {labels} label(s) for {channels} channel(s), using placeholders Ch1..Ch{channels}"
            ),
            RunEvent::UnitStarted {
                subject,
                task,
                samples,
                channels,
            } => info!("[Task start] subject={subject} task={task} shape=({samples}, {channels})"),
            RunEvent::UnitFinished {
                subject,
                task,
                psd,
                metrics,
            } => info!(
                "[Task done] subject={subject} task={task} -> psd:{} metrics:{}",
                psd.display(),
                metrics.display()
            ),
            RunEvent::UnitFailed {
                subject,
                task,
                error,
            } => error!("[Task error] subject={subject} task={task}: {error}"),
            RunEvent::Progress {
                completed,
                total,
                in_flight,
            } => info!("Progress: {completed}/{total} ({in_flight} running)"),
            RunEvent::SummaryWritten(path) => info!("Summary written: {}", path.display()),
        }
    }
}
/// Sends events over a channel, for embedders that drive their own UI.
pub struct ChannelReporter {
    tx: Mutex<Sender<RunEvent>>,
}
impl ChannelReporter {
    pub fn new(tx: Sender<RunEvent>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}
impl Reporter for ChannelReporter {
    fn report(&self, event: RunEvent) {
        if let Ok(tx) = self.tx.lock() {
            tx.send(event).ok();
        }
    }
}
