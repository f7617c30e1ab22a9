//! Channel-label resolution from montage files or the built-in cap layout.
//!
//! Any failure to read or parse a montage is a [`SpectralError::Configuration`]
//! and stops the run. A montage whose size disagrees with the recording is not
//! an error: the subject falls back to `Ch1..ChN` placeholders.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::error::SpectralError;
use crate::spectral::placeholder_labels;
/// 63-channel 10-10 cap, in amplifier order.
const BUILTIN_CAP63: [&str; 63] = [
    "Fp1", "Fz", "F3", "F7", "FT9", "FC5", "FC1", "C3", "T7", "TP9", "CP5", "CP1", "Pz", "P3",
    "P7", "O1", "Oz", "O2", "P4", "P8", "TP10", "CP6", "CP2", "Cz", "C4", "T8", "FT10", "FC6",
    "FC2", "F4", "F8", "Fp2", "AF7", "AF3", "AFz", "F1", "F5", "FT7", "FC3", "C1", "C5", "TP7",
    "CP3", "P1", "P5", "PO7", "PO3", "POz", "PO4", "PO8", "P6", "P2", "CPz", "CP4", "TP8", "C6",
    "C2", "FC4", "FT8", "F6", "AF8", "AF4", "F2",
];
/// Where channel labels come from.
#[derive(Clone, Debug, Default)]
pub enum ChannelSource {
    #[default]
    Builtin,
    File(PathBuf),
    List(Vec<String>),
}
/// Labels loaded from a [`ChannelSource`].
#[derive(Clone, Debug)]
pub struct Montage {
    labels: Arc<[String]>,
}
/// Labels fitted to one recording.
#[derive(Clone, Debug)]
pub struct FittedLabels {
    pub labels: Arc<[String]>,
    /// Set when the montage size did not match and placeholders were used.
    pub fell_back: bool,
}
impl Montage {
    pub fn load(source: &ChannelSource) -> Result<Self, SpectralError> {
        let labels: Vec<String> = match source {
            ChannelSource::Builtin => BUILTIN_CAP63.iter().map(|s| s.to_string()).collect(),
            ChannelSource::List(labels) => labels.clone(),
            ChannelSource::File(path) => read_montage_file(path)?,
        };
        if labels.is_empty() {
            return Err(SpectralError::Configuration(format!(
                "no channel names parsed from {source:?}"
            )));
        }
        Ok(Self {
            labels: labels.into(),
        })
    }
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
    pub fn fit(&self, channels: usize) -> FittedLabels {
        if self.labels.len() == channels {
            FittedLabels {
                labels: Arc::clone(&self.labels),
                fell_back: false,
            }
        } else {
            FittedLabels {
                labels: placeholder_labels(channels),
                fell_back: true,
            }
        }
    }
}
fn read_montage_file(path: &Path) -> Result<Vec<String>, SpectralError> {
    let text = fs::read_to_string(path).map_err(|e| {
        SpectralError::Configuration(format!("cannot read montage {}: {e}", path.display()))
    })?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    Ok(match extension.as_str() {
        "locs" | "eloc" | "sfp" => parse_locs(&text),
        "csv" => parse_csv(&text),
        _ => parse_plain(&text),
    })
}
fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(['#', ';', '%']))
}
/// One label per line.
pub fn parse_plain(text: &str) -> Vec<String> {
    content_lines(text).map(str::to_owned).collect()
}
/// Comma separated, possibly over several lines.
pub fn parse_csv(text: &str) -> Vec<String> {
    content_lines(text)
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_owned)
        .collect()
}
/// EEGLAB-style location rows (`index theta radius label`) or bare labels.
/// The label is the first token containing a letter, else the second token.
pub fn parse_locs(text: &str) -> Vec<String> {
    content_lines(text)
        .filter_map(|line| {
            let tokens: Vec<&str> = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
                .collect();
            tokens
                .iter()
                .find(|t| t.chars().any(|c| c.is_ascii_alphabetic()))
                .or_else(|| tokens.get(1))
                .map(|t| t.to_string())
        })
        .collect()
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    #[test]
    fn builtin_montage_has_63_labels() {
        let montage = Montage::load(&ChannelSource::Builtin).unwrap();
        assert_eq!(montage.labels().len(), 63);
        assert!(montage.labels().iter().any(|l| l == "F3"));
        assert!(montage.labels().iter().any(|l| l == "F4"));
    }
    #[test]
    fn parses_locs_rows() {
        let text = "# comment\n1\t-18\t0.511\tFp1\n2 18 0.511 Fp2\n\n3,0,0.25,Fz\n";
        assert_eq!(parse_locs(text), vec!["Fp1", "Fp2", "Fz"]);
        assert_eq!(parse_locs("4 17\n"), vec!["17"]);
    }
    #[test]
    fn parses_csv_and_plain() {
        assert_eq!(parse_csv("F3, F4,\nC3,C4\n"), vec!["F3", "F4", "C3", "C4"]);
        assert_eq!(parse_plain("% header\nF3\n  F4  \n;x\n"), vec!["F3", "F4"]);
    }
    #[test]
    fn reads_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cap.locs");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "1 -18 0.5 F3").unwrap();
        writeln!(file, "2 18 0.5 F4").unwrap();
        let montage = Montage::load(&ChannelSource::File(path)).unwrap();
        assert_eq!(montage.labels(), &["F3", "F4"]);
    }
    #[test]
    fn unreadable_or_empty_montage_is_configuration_error() {
        let missing = Montage::load(&ChannelSource::File("/nonexistent/cap.txt".into()));
        assert!(matches!(missing, Err(SpectralError::Configuration(_))));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "# nothing here\n").unwrap();
        let empty = Montage::load(&ChannelSource::File(path));
        assert!(matches!(empty, Err(SpectralError::Configuration(_))));
    }
    #[test]
    fn size_mismatch_falls_back_to_placeholders() {
        let montage = Montage::load(&ChannelSource::List(vec!["F3".into(), "F4".into()])).unwrap();
        let fitted = montage.fit(2);
        assert!(!fitted.fell_back);
        assert_eq!(&*fitted.labels, &["F3", "F4"]);
        let fitted = montage.fit(3);
        assert!(fitted.fell_back);
        assert_eq!(&*fitted.labels, &["Ch1", "Ch2", "Ch3"]);
    }
}
