// src/spectral/mod.rs
// 纯数值计算：功率谱估计及其派生特征，不做任何文件读写
pub mod bands;
pub mod block;
pub mod faa;
pub mod features;
pub mod iaf;
pub mod trp;
pub mod welch;
pub mod window;
pub use bands::{band_mask, standard_bands, trapezoid, Band, FreqRange, DEFAULT_BANDS, EPS};
pub use block::{placeholder_labels, TimeSeriesBlock};
pub use faa::{frontal_alpha_asymmetry, AsymmetryScale};
pub use features::{
    band_power, median_frequency, spectral_edge, spectral_entropy, spectral_moments, BandPowers,
    SpectralMoments, DEFAULT_TOTAL_RANGE,
};
pub use iaf::{individual_alpha_frequency, savgol_smooth, PeakParams};
pub use trp::{band_changes, task_related_power, ChangeMode};
pub use welch::{PowerSpectrum, WelchEstimator};
pub use window::WindowKind;
