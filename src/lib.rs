//! Batch EEG spectral analysis.
//!
//! [`spectral`] holds the numerics (Welch PSD, band power, entropy, moments,
//! spectral edge, asymmetry, peak frequency, task-related power) and [`batch`]
//! runs them over many subjects and tasks on a bounded worker pool.
pub mod batch;
pub mod error;
pub mod spectral;
pub use error::SpectralError;
