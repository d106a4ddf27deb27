//! Schema catalog for the star schema.
//!
//! Loaded once from a pre-extracted JSON document and shared read-only for
//! the process lifetime (wrap in `Arc` to share across requests). When the
//! document is missing the catalog degrades to live introspection through a
//! caller-supplied [`SchemaProvider`]; foreign-key discovery is skipped in
//! that mode and join-key resolution falls back to the naming heuristic.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::CatalogSettings;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub notnull: bool,
    #[serde(default)]
    pub pk: bool,
}

/// A foreign key on a fact-like table. `source` is "declared" when it came
/// from a database constraint, "inferred" when derived by the extractor's
/// naming analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    #[serde(default)]
    pub ref_column: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub declared_foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub inferred_foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }
}

/// Live-introspection seam for when no schema document is available.
/// Implementations typically wrap a database connection.
pub trait SchemaProvider {
    fn table_names(&self) -> Result<Vec<String>>;
    fn table_columns(&self, table: &str) -> Result<Vec<ColumnSchema>>;
}

/// Read-only lookup structure over tables, columns, and foreign-key edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub tables: BTreeMap<String, TableSchema>,
    #[serde(default = "default_dimension_prefix")]
    pub dimension_prefix: String,
}

fn default_dimension_prefix() -> String {
    "dim_".to_string()
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self {
            tables: BTreeMap::new(),
            dimension_prefix: default_dimension_prefix(),
        }
    }
}

impl SchemaCatalog {
    pub fn from_json(contents: &str) -> Result<Self> {
        let catalog: SchemaCatalog =
            serde_json::from_str(contents.trim_start_matches('\u{feff}'))?;
        Ok(catalog)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&contents)?;
        tracing::info!(
            path = %path.as_ref().display(),
            tables = catalog.tables.len(),
            "loaded schema catalog"
        );
        Ok(catalog)
    }

    /// Build a catalog by introspecting the live schema. No foreign keys are
    /// recorded, so join-key resolution is reduced to the naming heuristic.
    pub fn introspect(provider: &dyn SchemaProvider) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for name in provider.table_names()? {
            let columns = provider.table_columns(&name)?;
            tables.insert(
                name,
                TableSchema {
                    columns,
                    ..TableSchema::default()
                },
            );
        }
        tracing::warn!(
            tables = tables.len(),
            "schema document unavailable; introspected live schema (no foreign keys)"
        );
        Ok(Self {
            tables,
            dimension_prefix: default_dimension_prefix(),
        })
    }

    /// Load the schema document if present, otherwise introspect.
    pub fn load_or_introspect<P: AsRef<Path>>(
        path: P,
        provider: &dyn SchemaProvider,
    ) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Self::introspect(provider)
        }
    }

    /// Build a catalog as the runtime settings describe it: the configured
    /// schema document when one is set and present, introspection through
    /// `provider` otherwise. The configured dimension prefix wins over the
    /// document's.
    pub fn from_settings(
        settings: &CatalogSettings,
        provider: &dyn SchemaProvider,
    ) -> Result<Self> {
        let mut catalog = match &settings.schema_path {
            Some(path) if Path::new(path).exists() => Self::from_file(path)?,
            _ => Self::introspect(provider)?,
        };
        catalog.dimension_prefix = settings.dimension_prefix.clone();
        Ok(catalog)
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Ordered column list for a table; empty for unknown tables.
    pub fn columns(&self, table: &str) -> &[ColumnSchema] {
        self.tables
            .get(table)
            .map(|t| t.columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .map(|t| t.has_column(column))
            .unwrap_or(false)
    }

    /// Find the dimension table owning `column`, searching only tables whose
    /// name carries the dimension prefix. Deterministic: tables are scanned
    /// in sorted name order.
    pub fn find_dimension_table(&self, column: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|(name, table)| {
                name.starts_with(&self.dimension_prefix) && table.has_column(column)
            })
            .map(|(name, _)| name.as_str())
    }

    /// Resolve the join key between the fact table and a dimension table.
    ///
    /// Resolution order: declared foreign keys, then inferred foreign keys
    /// (both restricted to columns actually present on the fact table), then
    /// the `<dim_table_without_prefix>_id` naming heuristic. `None` means the
    /// join cannot be made; callers must fail rather than drop the join.
    pub fn find_join_key(&self, fact_table: &str, dim_table: &str) -> Option<String> {
        if let Some(fact) = self.tables.get(fact_table) {
            for fk in fact
                .declared_foreign_keys
                .iter()
                .chain(fact.inferred_foreign_keys.iter())
            {
                if fk.ref_table == dim_table && fact.has_column(&fk.column) {
                    return Some(fk.column.clone());
                }
            }
        }
        let base = dim_table
            .strip_prefix(&self.dimension_prefix)
            .unwrap_or(dim_table);
        let candidate = format!("{base}_id");
        if self.has_column(fact_table, &candidate) {
            return Some(candidate);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            data_type: "TEXT".to_string(),
            notnull: false,
            pk: false,
        }
    }

    fn fk(column: &str, ref_table: &str, source: &str) -> ForeignKey {
        ForeignKey {
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: column.to_string(),
            source: source.to_string(),
        }
    }

    fn catalog() -> SchemaCatalog {
        let mut tables = BTreeMap::new();
        tables.insert(
            "fact_sales".to_string(),
            TableSchema {
                columns: vec![
                    column("deal_id"),
                    column("close_date"),
                    column("net_revenue"),
                    column("region_key"),
                    column("region_id"),
                    column("product_id"),
                ],
                primary_key: vec!["deal_id".to_string()],
                declared_foreign_keys: vec![fk("region_key", "dim_region", "declared")],
                inferred_foreign_keys: vec![fk("product_id", "dim_product", "inferred")],
            },
        );
        tables.insert(
            "dim_region".to_string(),
            TableSchema {
                columns: vec![column("region_key"), column("region_id"), column("country")],
                ..TableSchema::default()
            },
        );
        tables.insert(
            "dim_product".to_string(),
            TableSchema {
                columns: vec![column("product_id"), column("product_name")],
                ..TableSchema::default()
            },
        );
        tables.insert(
            "staging_orders".to_string(),
            TableSchema {
                columns: vec![column("country")],
                ..TableSchema::default()
            },
        );
        SchemaCatalog {
            tables,
            dimension_prefix: "dim_".to_string(),
        }
    }

    #[test]
    fn dimension_lookup_ignores_non_dim_tables() {
        let catalog = catalog();
        // staging_orders also has "country" but lacks the dim_ prefix
        assert_eq!(catalog.find_dimension_table("country"), Some("dim_region"));
        assert_eq!(
            catalog.find_dimension_table("product_name"),
            Some("dim_product")
        );
        assert_eq!(catalog.find_dimension_table("missing"), None);
    }

    #[test]
    fn declared_fk_beats_inferred_and_heuristic() {
        let catalog = catalog();
        // region_id would satisfy the heuristic, but the declared FK uses region_key
        assert_eq!(
            catalog.find_join_key("fact_sales", "dim_region"),
            Some("region_key".to_string())
        );
    }

    #[test]
    fn inferred_fk_beats_heuristic() {
        let catalog = catalog();
        assert_eq!(
            catalog.find_join_key("fact_sales", "dim_product"),
            Some("product_id".to_string())
        );
    }

    #[test]
    fn heuristic_requires_column_on_fact_table() {
        let mut catalog = catalog();
        catalog.tables.insert(
            "dim_customer".to_string(),
            TableSchema {
                columns: vec![column("customer_id"), column("customer_name")],
                ..TableSchema::default()
            },
        );
        // fact_sales has no customer_id column
        assert_eq!(catalog.find_join_key("fact_sales", "dim_customer"), None);
    }

    #[test]
    fn parses_extractor_document() {
        let doc = r#"{
            "tables": {
                "fact_sales": {
                    "columns": [
                        {"name": "deal_id", "type": "INTEGER", "notnull": true, "pk": true},
                        {"name": "region_id", "type": "INTEGER"}
                    ],
                    "primary_key": ["deal_id"],
                    "declared_foreign_keys": [
                        {"column": "region_id", "ref_table": "dim_region",
                         "ref_column": "region_id", "source": "declared"}
                    ],
                    "inferred_foreign_keys": []
                },
                "dim_region": {
                    "columns": [{"name": "region_id"}, {"name": "country"}]
                }
            }
        }"#;
        let catalog = SchemaCatalog::from_json(doc).unwrap();
        assert_eq!(catalog.columns("fact_sales").len(), 2);
        assert!(catalog.has_column("dim_region", "country"));
        assert_eq!(
            catalog.find_join_key("fact_sales", "dim_region"),
            Some("region_id".to_string())
        );
    }

    struct FakeProvider;

    impl SchemaProvider for FakeProvider {
        fn table_names(&self) -> Result<Vec<String>> {
            Ok(vec!["fact_sales".to_string(), "dim_region".to_string()])
        }

        fn table_columns(&self, table: &str) -> Result<Vec<ColumnSchema>> {
            Ok(match table {
                "fact_sales" => vec![column("deal_id"), column("region_id")],
                _ => vec![column("region_id"), column("country")],
            })
        }
    }

    #[test]
    fn settings_drive_catalog_construction() {
        // missing document falls to introspection, keeping the configured prefix
        let settings = CatalogSettings {
            schema_path: Some("does/not/exist.json".to_string()),
            dimension_prefix: "d_".to_string(),
        };
        let catalog = SchemaCatalog::from_settings(&settings, &FakeProvider).unwrap();
        assert_eq!(catalog.dimension_prefix, "d_");
        assert!(catalog.table("fact_sales").is_some());

        // a present document is loaded, still under the configured prefix
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(
            &path,
            r#"{"tables": {"t_geo": {"columns": [{"name": "country"}]}}}"#,
        )
        .unwrap();
        let settings = CatalogSettings {
            schema_path: Some(path.display().to_string()),
            dimension_prefix: "t_".to_string(),
        };
        let catalog = SchemaCatalog::from_settings(&settings, &FakeProvider).unwrap();
        assert_eq!(catalog.find_dimension_table("country"), Some("t_geo"));
    }

    #[test]
    fn introspection_fallback_uses_heuristic_only() {
        let catalog = SchemaCatalog::introspect(&FakeProvider).unwrap();
        assert!(catalog.table("fact_sales").is_some());
        assert!(catalog
            .table("fact_sales")
            .map(|t| t.declared_foreign_keys.is_empty())
            .unwrap_or(false));
        // no FK metadata, so only the naming heuristic can answer
        assert_eq!(
            catalog.find_join_key("fact_sales", "dim_region"),
            Some("region_id".to_string())
        );
    }
}
