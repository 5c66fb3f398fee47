//! Catalog file loading.
//!
//! A catalog file lists named tables to register at startup. Both `.json`
//! and `.toml` are accepted, either as a bare table list or wrapped in a
//! `tables` key.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use quarry_common::{QuarryError, Result};
use serde::{Deserialize, Serialize};

/// One table entry in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    /// Registration name.
    pub name: String,
    /// File path of the data.
    pub uri: String,
    /// Data format; only `csv` is supported.
    pub format: String,
}

/// A set of named table definitions.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    tables: HashMap<String, TableDef>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Register a table definition, replacing any previous entry.
    pub fn register_table(&mut self, table: TableDef) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Look up a table definition by name.
    pub fn get(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .get(name)
            .ok_or_else(|| QuarryError::NotFound(format!("unknown table: {name}")))
    }

    /// All table definitions, sorted by name.
    pub fn tables(&self) -> Vec<TableDef> {
        let mut v = self.tables.values().cloned().collect::<Vec<_>>();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        v
    }

    /// Load a catalog from a `.json` or `.toml` file.
    pub fn load(path: &str) -> Result<Self> {
        let defs = match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let s = fs::read_to_string(path)?;
                parse_tables_json(&s)?
            }
            Some("toml") => {
                let s = fs::read_to_string(path)?;
                parse_tables_toml(&s)?
            }
            Some(other) => {
                return Err(QuarryError::InvalidInput(format!(
                    "unsupported catalog extension '.{other}'; use .json or .toml"
                )));
            }
            None => {
                return Err(QuarryError::InvalidInput(
                    "catalog path must include extension .json or .toml".to_string(),
                ));
            }
        };

        let mut catalog = Catalog::new();
        for def in defs {
            validate_table(&def)?;
            catalog.register_table(def);
        }
        Ok(catalog)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    TableList(Vec<TableDef>),
    Wrapped { tables: Vec<TableDef> },
}

impl CatalogFile {
    fn into_tables(self) -> Vec<TableDef> {
        match self {
            Self::TableList(tables) => tables,
            Self::Wrapped { tables } => tables,
        }
    }
}

fn parse_tables_json(s: &str) -> Result<Vec<TableDef>> {
    let parsed: CatalogFile =
        serde_json::from_str(s).map_err(|e| QuarryError::InvalidInput(e.to_string()))?;
    Ok(parsed.into_tables())
}

fn parse_tables_toml(s: &str) -> Result<Vec<TableDef>> {
    let parsed: CatalogFile =
        toml::from_str(s).map_err(|e| QuarryError::InvalidInput(e.to_string()))?;
    Ok(parsed.into_tables())
}

fn validate_table(table: &TableDef) -> Result<()> {
    if table.uri.is_empty() {
        return Err(QuarryError::InvalidInput(format!(
            "table '{}' must define a uri",
            table.name
        )));
    }
    match table.format.to_ascii_lowercase().as_str() {
        "csv" => Ok(()),
        "parquet" => Err(QuarryError::Unimplemented(format!(
            "table '{}': parquet sources are not available in this version",
            table.name
        ))),
        other => Err(QuarryError::InvalidInput(format!(
            "table '{}' has unsupported format '{other}'",
            table.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{Catalog, QuarryError};

    fn unique_path(ext: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("quarry_catalog_test_{nanos}.{ext}"))
    }

    #[test]
    fn loads_catalog_from_json_list() {
        let path = unique_path("json");
        let payload = r#"[{"name":"t","uri":"./t.csv","format":"csv"}]"#;
        std::fs::write(&path, payload).expect("write json");

        let catalog = Catalog::load(path.to_str().expect("path utf8")).expect("load");
        assert_eq!(catalog.get("t").expect("table").uri, "./t.csv");

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn loads_catalog_from_toml_wrapped_tables() {
        let path = unique_path("toml");
        let payload = r#"
            [[tables]]
            name = "t"
            uri = "./t.csv"
            format = "csv"
        "#;
        std::fs::write(&path, payload).expect("write toml");

        let catalog = Catalog::load(path.to_str().expect("path utf8")).expect("load");
        assert_eq!(catalog.tables().len(), 1);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn parquet_entries_are_unimplemented() {
        let path = unique_path("json");
        let payload = r#"[{"name":"t","uri":"./t.parquet","format":"parquet"}]"#;
        std::fs::write(&path, payload).expect("write json");

        let err = Catalog::load(path.to_str().expect("path utf8")).expect_err("reject");
        assert!(matches!(err, QuarryError::Unimplemented(_)), "{err}");

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unknown_extension_is_invalid_input() {
        let err = Catalog::load("catalog.yaml").expect_err("reject");
        assert!(matches!(err, QuarryError::InvalidInput(_)), "{err}");
    }
}
