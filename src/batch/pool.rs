//! Fixed-size thread pool with blocking submit and completion-order results.
//!
//! Jobs are handed to workers over a rendezvous channel, so `submit` blocks
//! until one of the `capacity` workers is idle. A panicking job is caught on
//! its worker and reported as [`WorkerCrash`]; the worker keeps serving.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use crossbeam_channel as channel;
use thiserror::Error;
use crate::error::SpectralError;
type Job<T> = Box<dyn FnOnce() -> T + Send + 'static>;
/// A job panicked instead of returning.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("worker crashed: {message}")]
pub struct WorkerCrash {
    pub message: String,
}
/// Result of one submitted job, tagged with the caller's ticket.
#[derive(Debug)]
pub struct Completion<T> {
    pub ticket: usize,
    pub result: Result<T, WorkerCrash>,
}
pub struct WorkerPool<T: Send + 'static> {
    job_tx: Option<channel::Sender<(usize, Job<T>)>>,
    done_rx: Receiver<Completion<T>>,
    workers: Vec<JoinHandle<()>>,
    in_flight: usize,
}
impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(capacity: usize) -> Result<Self, SpectralError> {
        if capacity == 0 {
            return Err(SpectralError::invalid("worker pool needs at least one worker"));
        }
        let (job_tx, job_rx) = channel::bounded::<(usize, Job<T>)>(0);
        let (done_tx, done_rx) = mpsc::channel();
        let workers = (0..capacity)
            .map(|idx| {
                let job_rx = job_rx.clone();
                let done_tx: Sender<Completion<T>> = done_tx.clone();
                thread::Builder::new()
                    .name(format!("eegspec-worker-{idx}"))
                    .spawn(move || {
                        for (ticket, job) in job_rx.iter() {
                            let result = panic::catch_unwind(AssertUnwindSafe(job))
                                .map_err(|payload| WorkerCrash {
                                    message: panic_message(&*payload),
                                });
                            if done_tx.send(Completion { ticket, result }).is_err() {
                                break;
                            }
                        }
                    })
                    .map_err(|e| SpectralError::io("<worker thread>", e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            job_tx: Some(job_tx),
            done_rx,
            workers,
            in_flight: 0,
        })
    }
    pub fn capacity(&self) -> usize {
        self.workers.len()
    }
    /// Jobs submitted and not yet collected.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
    /// Hand `job` to an idle worker, blocking until one is free.
    pub fn submit<F>(&mut self, ticket: usize, job: F) -> Result<(), SpectralError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let tx = self
            .job_tx
            .as_ref()
            .ok_or_else(|| SpectralError::invalid("worker pool already shut down"))?;
        tx.send((ticket, Box::new(job)))
            .map_err(|_| SpectralError::invalid("all workers exited"))?;
        self.in_flight += 1;
        Ok(())
    }
    /// Block for the next job to finish, in completion order. `None` when
    /// nothing is in flight.
    pub fn next_completion(&mut self) -> Option<Completion<T>> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.done_rx.recv().ok()?;
        self.in_flight -= 1;
        Some(completion)
    }
}
impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        // Closing the job channel ends each worker's receive loop.
        self.job_tx.take();
        for worker in self.workers.drain(..) {
            worker.join().ok();
        }
    }
}
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
