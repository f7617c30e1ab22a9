use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use ndarray::Array2;
use serde::Deserialize;
use crate::error::SpectralError;
/// All tasks recorded for one subject, each as a channels x samples matrix.
#[derive(Clone, Debug)]
pub struct SubjectRecord {
    pub subject_id: String,
    pub tasks: Vec<(String, Array2<f64>)>,
}
impl SubjectRecord {
    pub fn new(subject_id: impl Into<String>, tasks: Vec<(String, Array2<f64>)>) -> Self {
        Self {
            subject_id: subject_id.into(),
            tasks,
        }
    }
    /// Channel count of the first task; labels are resolved against it.
    pub fn channel_count(&self) -> Option<usize> {
        self.tasks.first().map(|(_, m)| m.nrows())
    }
}
/// Something that can yield subjects one after another.
pub trait SubjectSource {
    fn next_subject(&mut self) -> Result<Option<SubjectRecord>, SpectralError>;
}
/// In-memory source useful for tests and embedding.
pub struct ManualSource {
    queue: VecDeque<SubjectRecord>,
}
impl ManualSource {
    pub fn new(subjects: impl IntoIterator<Item = SubjectRecord>) -> Self {
        Self {
            queue: subjects.into_iter().collect(),
        }
    }
}
impl SubjectSource for ManualSource {
    fn next_subject(&mut self) -> Result<Option<SubjectRecord>, SpectralError> {
        Ok(self.queue.pop_front())
    }
}
/// Subject JSON files: a directory of `*.json` or a single file. Each file maps
/// task name to a channels x samples matrix.
pub struct JsonSubjectSource {
    paths: VecDeque<PathBuf>,
}
impl JsonSubjectSource {
    pub fn open(input: &Path) -> Result<Self, SpectralError> {
        let paths: Vec<PathBuf> = if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)
                .map_err(|e| SpectralError::io(input, e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file()
                        && p.extension()
                            .and_then(|e| e.to_str())
                            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
                })
                .collect();
            found.sort();
            found
        } else if input.is_file() {
            vec![input.to_path_buf()]
        } else {
            Vec::new()
        };
        if paths.is_empty() {
            return Err(SpectralError::Enumeration(format!(
                "no JSON files found under {}",
                input.display()
            )));
        }
        Ok(Self {
            paths: paths.into(),
        })
    }
    pub fn len(&self) -> usize {
        self.paths.len()
    }
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
impl SubjectSource for JsonSubjectSource {
    fn next_subject(&mut self) -> Result<Option<SubjectRecord>, SpectralError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let subject_id = subject_id_from_path(&path);
        let file = File::open(&path).map_err(|e| SpectralError::io(&path, e))?;
        let tasks: BTreeMap<String, TaskMatrix> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| {
                SpectralError::Enumeration(format!(
                    "{}: expected an object mapping task name to a channels x samples matrix ({e})",
                    path.display()
                ))
            })?;
        parse_tasks(subject_id, tasks).map(Some)
    }
}
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskMatrix {
    Rows(Vec<Vec<f64>>),
    Single(Vec<f64>),
}
/// Parse an in-memory subject document.
pub fn parse_subject(
    subject_id: impl Into<String>,
    document: serde_json::Value,
) -> Result<SubjectRecord, SpectralError> {
    let subject_id = subject_id.into();
    let tasks: BTreeMap<String, TaskMatrix> = serde_json::from_value(document).map_err(|e| {
        SpectralError::Enumeration(format!(
            "subject {subject_id}: expected an object mapping task name to a channels x samples matrix ({e})"
        ))
    })?;
    parse_tasks(subject_id, tasks)
}
fn parse_tasks(
    subject_id: String,
    tasks: BTreeMap<String, TaskMatrix>,
) -> Result<SubjectRecord, SpectralError> {
    let mut parsed = Vec::with_capacity(tasks.len());
    for (task, matrix) in tasks {
        check_artifact_name(&subject_id, &task)?;
        let rows = match matrix {
            TaskMatrix::Rows(rows) => rows,
            TaskMatrix::Single(row) => vec![row],
        };
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(SpectralError::Enumeration(format!(
                "subject {subject_id}: task '{task}' is not a 2D matrix (ragged rows)"
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let height = if width == 0 { 0 } else { flat.len() / width };
        let data = Array2::from_shape_vec((height, width), flat).map_err(|e| {
            SpectralError::Enumeration(format!("subject {subject_id}: task '{task}': {e}"))
        })?;
        parsed.push((task, data));
    }
    Ok(SubjectRecord::new(subject_id, parsed))
}
/// Subject and task names end up as path components under the output
/// directory, so they must not carry separators or `..`.
pub(crate) fn check_artifact_name(subject_id: &str, name: &str) -> Result<(), SpectralError> {
    if name.is_empty() || name.contains("..") || name.contains(|c: char| c == '/' || c == '\\') {
        return Err(SpectralError::Enumeration(format!(
            "subject {subject_id}: '{name}' cannot be used as a file name"
        )));
    }
    Ok(())
}
/// File stem, e.g. `sub-01` for `data/sub-01.json`.
pub fn subject_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    #[test]
    fn parses_matrices_and_single_channels() {
        let subject = parse_subject(
            "s1",
            json!({
                "rest": [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
                "mono": [7.0, 8.0]
            }),
        )
        .unwrap();
        assert_eq!(subject.tasks.len(), 2);
        let (name, mono) = &subject.tasks[0];
        assert_eq!(name, "mono");
        assert_eq!(mono.shape(), &[1, 2]);
        let (_, rest) = &subject.tasks[1];
        assert_eq!(rest.shape(), &[2, 3]);
        assert_eq!(rest[[1, 0]], 4.0);
    }
    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            parse_subject("s", json!([[1.0, 2.0]])),
            Err(SpectralError::Enumeration(_))
        ));
        assert!(matches!(
            parse_subject("s", json!({"t": [[1.0, 2.0], [3.0]]})),
            Err(SpectralError::Enumeration(_))
        ));
        assert!(matches!(
            parse_subject("s", json!({"t": "not numbers"})),
            Err(SpectralError::Enumeration(_))
        ));
    }
    #[test]
    fn task_names_cannot_leave_the_output_directory() {
        for name in ["../../../escaped", "a/b", "a\\b", ".."] {
            let err = parse_subject("s", json!({ name: [[1.0, 2.0]] })).unwrap_err();
            assert!(matches!(err, SpectralError::Enumeration(_)), "{name}");
        }
        assert!(parse_subject("s", json!({"eyes.closed": [[1.0, 2.0]]})).is_ok());
    }
    #[test]
    fn directory_source_is_sorted_and_filters_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), r#"{"task": [[1, 2], [3, 4]]}"#).unwrap();
        fs::write(dir.path().join("a.JSON"), r#"{}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
        let mut source = JsonSubjectSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);
        let first = source.next_subject().unwrap().unwrap();
        assert_eq!(first.subject_id, "a");
        assert!(first.tasks.is_empty());
        let second = source.next_subject().unwrap().unwrap();
        assert_eq!(second.subject_id, "b");
        assert_eq!(second.channel_count(), Some(2));
        assert!(source.next_subject().unwrap().is_none());
    }
    #[test]
    fn empty_directory_is_an_enumeration_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            JsonSubjectSource::open(dir.path()),
            Err(SpectralError::Enumeration(_))
        ));
    }
}
