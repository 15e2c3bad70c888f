//! @ai:module:intent Parse one rollout file into raw field-addressable rows
//! @ai:module:layer infrastructure
//! @ai:module:public_api SourceFormat, RawRow, read_source, unsupported_extension
//! @ai:module:stateless true

use crate::error::SkipReason;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde_json::{Map, Value};
use std::fs::File;
use std::path::Path;

/// Tabular extensions that look like rollout data but have no reader.
const UNSUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "arrow", "feather", "avro", "orc"];

/// A row as it appears in the source, addressed by field name.
pub type RawRow = Map<String, Value>;

/// @ai:intent Self-describing record formats the loader understands
/// @ai:effects pure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// One JSON object per line
    JsonLines,
    /// A JSON array of row objects, or an object of equal-length columns
    Json,
    /// Apache Parquet, one row group or many
    Parquet,
}

impl SourceFormat {
    /// @ai:intent Detect the format from a file extension
    /// @ai:effects pure
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jsonl" | "ndjson" => Some(SourceFormat::JsonLines),
            "json" => Some(SourceFormat::Json),
            "parquet" => Some(SourceFormat::Parquet),
            _ => None,
        }
    }
}

/// @ai:intent Extension of a data file the loader recognises but cannot read
/// @ai:effects pure
pub fn unsupported_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    UNSUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// @ai:intent Read and parse a source file, classifying any failure
/// @ai:effects fs:read
pub fn read_source(path: &Path, format: SourceFormat) -> Result<Vec<RawRow>, SkipReason> {
    let metadata =
        std::fs::metadata(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    if metadata.len() == 0 {
        return Err(SkipReason::Empty);
    }

    let rows = match format {
        SourceFormat::JsonLines => parse_json_lines(&read_text(path)?),
        SourceFormat::Json => parse_json(&read_text(path)?),
        SourceFormat::Parquet => {
            let file = File::open(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
            parse_parquet(file)
        }
    }
    .map_err(SkipReason::Malformed)?;

    if rows.is_empty() {
        return Err(SkipReason::NoRows);
    }
    Ok(rows)
}

fn read_text(path: &Path) -> Result<String, SkipReason> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => SkipReason::Malformed("not valid UTF-8".to_string()),
        _ => SkipReason::Unreadable(e.to_string()),
    })
}

/// @ai:intent Read every row of a Parquet file as named JSON fields
/// @ai:effects fs:read
fn parse_parquet(file: File) -> Result<Vec<RawRow>, String> {
    let reader = SerializedFileReader::new(file).map_err(|e| e.to_string())?;
    let rows = reader.get_row_iter(None).map_err(|e| e.to_string())?;

    rows.enumerate()
        .map(|(idx, row)| {
            let row = row.map_err(|e| format!("row {}: {}", idx, e))?;
            Ok(row
                .get_column_iter()
                .map(|(name, field)| (name.clone(), field.to_json_value()))
                .collect())
        })
        .collect()
}

fn parse_json_lines(content: &str) -> Result<Vec<RawRow>, String> {
    let mut rows = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value =
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", idx + 1, e))?;
        match value {
            Value::Object(row) => rows.push(row),
            other => {
                return Err(format!(
                    "line {}: expected an object, found {}",
                    idx + 1,
                    kind(&other)
                ))
            }
        }
    }

    Ok(rows)
}

fn parse_json(content: &str) -> Result<Vec<RawRow>, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(format!("row {}: expected an object, found {}", idx, kind(&other))),
            })
            .collect(),
        Value::Object(columns) => transpose_columns(columns),
        other => Err(format!("expected an array or object, found {}", kind(&other))),
    }
}

/// @ai:intent Turn `{field: [v0, v1, ...]}` into one row per index
/// @ai:pre every field maps to an array of the same length
/// @ai:effects pure
fn transpose_columns(columns: Map<String, Value>) -> Result<Vec<RawRow>, String> {
    let mut len: Option<usize> = None;
    let mut arrays = Vec::with_capacity(columns.len());

    for (name, column) in columns {
        let Value::Array(values) = column else {
            return Err(format!("column '{}' is not an array", name));
        };
        match len {
            Some(expected) if expected != values.len() => {
                return Err(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    expected
                ))
            }
            _ => len = Some(values.len()),
        }
        arrays.push((name, values));
    }

    let mut rows = vec![RawRow::new(); len.unwrap_or(0)];
    for (name, values) in arrays {
        for (row, value) in rows.iter_mut().zip(values) {
            row.insert(name.clone(), value);
        }
    }
    Ok(rows)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}


#[cfg(test)]
pub(crate) mod fixtures {
    use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int64Type};
    use parquet::file::properties::WriterProperties;
    use parquet::file::writer::SerializedFileWriter;
    use parquet::schema::parser::parse_message_type;
    use std::path::Path;
    use std::sync::Arc;

    /// Write a rollout file with `example_id`, `reward` and an optional `answer`.
    pub fn write_parquet(path: &Path, example_ids: &[i64], rewards: &[f64], answers: &[Option<&str>]) {
        let schema = parse_message_type(
            "message rollout {
                REQUIRED INT64 example_id;
                REQUIRED DOUBLE reward;
                OPTIONAL BYTE_ARRAY answer (UTF8);
            }",
        )
        .unwrap();
        let file = std::fs::File::create(path).unwrap();
        let props = Arc::new(WriterProperties::builder().build());
        let mut writer = SerializedFileWriter::new(file, Arc::new(schema), props).unwrap();
        let mut row_group = writer.next_row_group().unwrap();

        let mut column = row_group.next_column().unwrap().unwrap();
        column.typed::<Int64Type>().write_batch(example_ids, None, None).unwrap();
        column.close().unwrap();

        let mut column = row_group.next_column().unwrap().unwrap();
        column.typed::<DoubleType>().write_batch(rewards, None, None).unwrap();
        column.close().unwrap();

        let values: Vec<ByteArray> = answers.iter().flatten().map(|a| ByteArray::from(*a)).collect();
        let levels: Vec<i16> = answers.iter().map(|a| i16::from(a.is_some())).collect();
        let mut column = row_group.next_column().unwrap().unwrap();
        column
            .typed::<ByteArrayType>()
            .write_batch(&values, Some(&levels), None)
            .unwrap();
        column.close().unwrap();

        row_group.close().unwrap();
        writer.close().unwrap();
    }
}
