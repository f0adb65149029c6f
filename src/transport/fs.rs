use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::PipelineError;

/// One parsed JSONL line: its 1-based line number and the JSON object it held.
pub type JsonlObject = (usize, Map<String, Value>);

/// Open an input file, reporting the path when it is missing or unreadable.
pub fn open_input(path: &Path) -> Result<File, PipelineError> {
    File::open(path).map_err(|source| PipelineError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Read every non-blank line of a JSONL file as a JSON object.
///
/// A line that is not valid JSON, or is valid JSON but not an object, fails
/// the whole read with the offending line number.
pub fn read_jsonl_objects(path: &Path) -> Result<Vec<JsonlObject>, PipelineError> {
    let reader = BufReader::new(open_input(path)?);
    let mut objects = Vec::new();
    for (offset, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = offset + 1;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(&line).map_err(|source| PipelineError::Json {
                path: path.to_path_buf(),
                line: line_no,
                source,
            })?;
        match value {
            Value::Object(object) => objects.push((line_no, object)),
            other => {
                return Err(PipelineError::Schema {
                    path: path.to_path_buf(),
                    line: line_no,
                    details: format!("expected a JSON object, found {}", json_kind(&other)),
                });
            }
        }
    }
    debug!(path = %path.display(), lines = objects.len(), "read jsonl");
    Ok(objects)
}

/// Write `items` as JSONL, creating parent directories. Returns the number of lines written.
pub fn write_jsonl<'a, T, I>(path: &Path, items: I) -> Result<usize, PipelineError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    ensure_parent_dir(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0usize;
    for item in items {
        serde_json::to_writer(&mut writer, item).map_err(std::io::Error::from)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    debug!(path = %path.display(), lines = written, "wrote jsonl");
    Ok(written)
}

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
