//! Data-source manifests.
//!
//! A data source is a directory holding a `__manifest__.json` descriptor
//! and the data file it points at.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

pub const MANIFEST_FILE: &str = "__manifest__.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Csv,
    Json,
}

impl SourceKind {
    /// Default data file name for the kind.
    pub fn default_file(self) -> &'static str {
        match self {
            Self::Csv => "data.csv",
            Self::Json => "data.json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub name: String,
    /// Data file, relative to the source directory. Defaults by kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A manifest bound to its directory.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub dir: PathBuf,
    pub manifest: Manifest,
}

impl DataSource {
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let raw = fs::read_to_string(&manifest_path).map_err(|e| IngestError::Manifest {
            dir: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|e| IngestError::Manifest {
                dir: dir.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    /// Write the manifest into its directory, creating the directory first.
    pub fn write(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let raw = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(self.dir.join(MANIFEST_FILE), raw)?;
        Ok(())
    }

    /// Absolute path of the data file.
    pub fn data_path(&self) -> PathBuf {
        let file = self
            .manifest
            .path
            .as_deref()
            .unwrap_or_else(|| self.manifest.kind.default_file());
        self.dir.join(file)
    }

    /// The create-table statement loading this source, addressed by the
    /// source directory (resolved again at replay time by the loader).
    pub fn load_statement(&self, table_name: &str) -> String {
        format!(
            "tables[{}] = load_table({})",
            quote(table_name),
            quote(&self.dir.display().to_string())
        )
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource {
            dir: dir.path().join("people"),
            manifest: Manifest {
                kind: SourceKind::Csv,
                name: "People".to_string(),
                path: None,
                description: Some("demo".to_string()),
            },
        };
        source.write().unwrap();
        let loaded = DataSource::from_dir(&dir.path().join("people")).unwrap();
        assert_eq!(loaded.manifest.kind, SourceKind::Csv);
        assert_eq!(loaded.manifest.name, "People");
        assert!(loaded.data_path().ends_with("people/data.csv"));
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataSource::from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, IngestError::Manifest { .. }));
    }

    #[test]
    fn test_load_statement() {
        let source = DataSource {
            dir: PathBuf::from("sources/people"),
            manifest: Manifest {
                kind: SourceKind::Csv,
                name: "People".to_string(),
                path: None,
                description: None,
            },
        };
        assert_eq!(
            source.load_statement("people"),
            "tables['people'] = load_table('sources/people')"
        );
    }
}
