//! File-backed table loaders.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use squirrel_model::{parse_scalar, Scalar, Table};
use squirrel_script::{ScriptError, TableLoader};

use crate::error::{IngestError, Result};
use crate::manifest::{DataSource, SourceKind};

/// Read a CSV file into a table. The first record is the header; cell
/// values go through best-effort scalar inference.
pub fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows: Vec<IndexMap<String, Scalar>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| (name.clone(), parse_scalar(cell)))
            .collect();
        rows.push(row);
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "read csv source");
    Ok(Table::from_rows(&rows))
}

/// Read a JSON array of objects into a table.
pub fn read_json(path: &Path) -> Result<Table> {
    let raw = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let serde_json::Value::Array(items) = value else {
        return Err(IngestError::UnsupportedSource(format!(
            "{}: expected a JSON array of objects",
            path.display()
        )));
    };
    let mut rows: Vec<IndexMap<String, Scalar>> = Vec::with_capacity(items.len());
    for item in items {
        let serde_json::Value::Object(fields) = item else {
            return Err(IngestError::UnsupportedSource(format!(
                "{}: expected a JSON array of objects",
                path.display()
            )));
        };
        let row = fields
            .into_iter()
            .map(|(name, v)| (name, json_scalar(v)))
            .collect();
        rows.push(row);
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "read json source");
    Ok(Table::from_rows(&rows))
}

fn json_scalar(value: serde_json::Value) -> Scalar {
    match value {
        serde_json::Value::Null => Scalar::Null,
        serde_json::Value::Bool(b) => Scalar::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Scalar::Int(i),
            None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Scalar::Str(s),
        // Nested structures flatten to their JSON text.
        other => Scalar::Str(other.to_string()),
    }
}

/// Load a source directory via its manifest.
pub fn read_source(source: &DataSource) -> Result<Table> {
    let data_path = source.data_path();
    match source.manifest.kind {
        SourceKind::Csv => read_csv(&data_path),
        SourceKind::Json => read_json(&data_path),
    }
}

/// Filesystem-backed [`TableLoader`] handed to the replay evaluator.
/// Accepts either a manifest directory or a bare `.csv` / `.json` file,
/// resolved relative to the project root.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn load(&self, path: &str) -> Result<Table> {
        let full = self.root.join(path);
        if full.is_dir() {
            return read_source(&DataSource::from_dir(&full)?);
        }
        match full.extension().and_then(|e| e.to_str()) {
            Some("csv") => read_csv(&full),
            Some("json") => read_json(&full),
            _ => Err(IngestError::UnsupportedSource(full.display().to_string())),
        }
    }
}

impl TableLoader for FsLoader {
    fn load_table(&self, path: &str) -> squirrel_script::Result<Table> {
        self.load(path)
            .map_err(|e| ScriptError::Load(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Manifest, MANIFEST_FILE};

    #[test]
    fn test_read_csv_infers_scalars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "name,age,score\nalice,30,1.5\nbob,,2\n").unwrap();
        let table = read_csv(&path).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(
            table.column("age").unwrap().values,
            vec![Scalar::Int(30), Scalar::Null]
        );
        assert_eq!(
            table.column("score").unwrap().values,
            vec![Scalar::Float(1.5), Scalar::Int(2)]
        );
    }

    #[test]
    fn test_read_json_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"[{"a": 1, "b": null}, {"a": 2.5, "b": true}]"#).unwrap();
        let table = read_json(&path).unwrap();
        assert_eq!(
            table.column("a").unwrap().values,
            vec![Scalar::Int(1), Scalar::Float(2.5)]
        );
        assert!(table.column("b").unwrap().values[0].is_null());
    }

    #[test]
    fn test_json_must_be_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{"a": 1}"#).unwrap();
        let err = read_json(&path).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedSource(_)));
    }

    #[test]
    fn test_fs_loader_resolves_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = dir.path().join("people");
        fs::create_dir(&source_dir).unwrap();
        let manifest = Manifest {
            kind: SourceKind::Csv,
            name: "People".to_string(),
            path: None,
            description: None,
        };
        fs::write(
            source_dir.join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();
        fs::write(source_dir.join("data.csv"), "x\n1\n").unwrap();

        let loader = FsLoader::new(dir.path());
        let table = loader.load_table("people").unwrap();
        assert_eq!(table.column("x").unwrap().values, vec![Scalar::Int(1)]);
    }

    #[test]
    fn test_fs_loader_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.bin"), b"\x00").unwrap();
        let loader = FsLoader::new(dir.path());
        assert!(loader.load_table("data.bin").is_err());
    }
}
