use std::sync::Arc;
use ndarray::{Array2, ArrayView1, Axis};
use crate::error::SpectralError;
/// Dense multichannel recording: rows are time samples, columns are channels.
#[derive(Clone, Debug)]
pub struct TimeSeriesBlock {
    data: Array2<f64>,
    sample_rate_hz: f64,
    channel_labels: Arc<[String]>,
}
impl TimeSeriesBlock {
    /// Build a block, replacing labels with `Ch1..ChN` when their count does not
    /// match the channel count.
    pub fn new(
        data: Array2<f64>,
        sample_rate_hz: f64,
        channel_labels: Arc<[String]>,
    ) -> Result<Self, SpectralError> {
        if !(sample_rate_hz > 0.0) || !sample_rate_hz.is_finite() {
            return Err(SpectralError::InvalidSampleRate);
        }
        let channel_labels = if channel_labels.len() == data.ncols() {
            channel_labels
        } else {
            placeholder_labels(data.ncols())
        };
        Ok(Self {
            data,
            sample_rate_hz,
            channel_labels,
        })
    }
    /// Build a block from a channels x samples matrix, the layout used on disk.
    pub fn from_channel_major(
        channels_by_samples: Array2<f64>,
        sample_rate_hz: f64,
        channel_labels: Arc<[String]>,
    ) -> Result<Self, SpectralError> {
        let data = channels_by_samples.reversed_axes().as_standard_layout().into_owned();
        Self::new(data, sample_rate_hz, channel_labels)
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn channel_labels(&self) -> &[String] {
        &self.channel_labels
    }
    pub fn num_channels(&self) -> usize {
        self.data.ncols()
    }
    pub fn num_samples(&self) -> usize {
        self.data.nrows()
    }
    /// `(samples, channels)`
    pub fn shape(&self) -> (usize, usize) {
        (self.data.nrows(), self.data.ncols())
    }
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.index_axis(Axis(1), index)
    }
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate_hz
    }
}
/// `Ch1..ChN`
pub fn placeholder_labels(count: usize) -> Arc<[String]> {
    (1..=count).map(|i| format!("Ch{i}")).collect()
}
