use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ndarray::{Array, ArrayBase, Data, Dimension, Zip};
use crate::error::SpectralError;
use crate::spectral::bands::EPS;
/// Task-related power expressed relative to baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChangeMode {
    /// `(task - baseline) / baseline`
    #[default]
    Ratio,
    /// `10 (log10 task - log10 baseline)`
    Decibel,
}
impl FromStr for ChangeMode {
    type Err = SpectralError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ratio" => Ok(ChangeMode::Ratio),
            "db" => Ok(ChangeMode::Decibel),
            other => Err(SpectralError::invalid(format!(
                "mode must be 'ratio' or 'db', got '{other}'"
            ))),
        }
    }
}
impl fmt::Display for ChangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeMode::Ratio => "ratio",
            ChangeMode::Decibel => "db",
        })
    }
}
/// Element-wise change from `baseline` to `task`; both must share a shape.
pub fn task_related_power<S, T, D>(
    baseline: &ArrayBase<S, D>,
    task: &ArrayBase<T, D>,
    mode: ChangeMode,
) -> Result<Array<f64, D>, SpectralError>
where
    S: Data<Elem = f64>,
    T: Data<Elem = f64>,
    D: Dimension,
{
    if baseline.shape() != task.shape() {
        return Err(SpectralError::invalid(format!(
            "baseline shape {:?} differs from task shape {:?}",
            baseline.shape(),
            task.shape()
        )));
    }
    Ok(Zip::from(baseline).and(task).map_collect(|&b, &t| match mode {
        ChangeMode::Ratio => (t - b) / (b + EPS),
        ChangeMode::Decibel => 10.0 * ((t + EPS).log10() - (b + EPS).log10()),
    }))
}
/// Task-related power for every band present in both maps.
pub fn band_changes(
    baseline: &BTreeMap<String, Vec<f64>>,
    task: &BTreeMap<String, Vec<f64>>,
    mode: ChangeMode,
) -> Result<BTreeMap<String, Vec<f64>>, SpectralError> {
    let mut out = BTreeMap::new();
    for (band, base) in baseline {
        let Some(active) = task.get(band) else {
            continue;
        };
        let change = task_related_power(
            &ndarray::aview1(base),
            &ndarray::aview1(active),
            mode,
        )?;
        out.insert(band.clone(), change.to_vec());
    }
    if out.is_empty() && !baseline.is_empty() {
        return Err(SpectralError::invalid("baseline and task share no bands"));
    }
    Ok(out)
}
