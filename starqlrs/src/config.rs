//! Tenant configuration and runtime settings.
//!
//! Tenant documents are JSON (one per tenant, loaded once per process);
//! runtime settings are TOML with global defaults and the usual
//! env-var / cwd / user-config-dir search order.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, StarqlError};

/// Static per-tenant vocabulary: the fact table, its date column, and the
/// declared metrics / dimensions / named date ranges an intent may reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub fact_table: String,
    pub date_column: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricExpr>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
    #[serde(default)]
    pub date_ranges: BTreeMap<String, u32>,
}

impl TenantConfig {
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: TenantConfig = serde_json::from_str(contents.trim_start_matches('\u{feff}'))?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Map a logical dimension to its physical column, falling back to the
    /// name itself when the dimension is not declared.
    pub fn map_dimension(&self, dimension: &str) -> String {
        self.dimensions
            .get(dimension)
            .cloned()
            .unwrap_or_else(|| dimension.to_string())
    }
}

/// A metric's aggregate expression, classified once when the tenant document
/// is loaded instead of re-sniffing the formula text on every build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricExpr {
    /// `COUNT(*)` when the argument is `*` or empty, else `COUNT(col)`.
    Count(Option<String>),
    /// `AVG(col)`.
    Avg(String),
    /// A bare column name; aggregated as `SUM(col)` by default.
    Sum(String),
    /// An explicit `SUM(...)` or a derived arithmetic expression, emitted verbatim.
    Raw(String),
}

impl MetricExpr {
    /// Classify a formula string from a tenant document.
    pub fn classify(formula: &str) -> MetricExpr {
        let mf = formula.trim();
        let upper = mf.to_uppercase();
        if upper.starts_with("COUNT(") && mf.ends_with(')') {
            let inner = inner_argument(mf);
            if inner.is_empty() || inner == "*" {
                MetricExpr::Count(None)
            } else {
                MetricExpr::Count(Some(inner.to_string()))
            }
        } else if upper.starts_with("AVG(") && mf.ends_with(')') {
            MetricExpr::Avg(inner_argument(mf).to_string())
        } else if upper.starts_with("SUM(") {
            MetricExpr::Raw(mf.to_string())
        } else if mf.contains(&['+', '-', '*', '/'][..]) || mf.contains('(') {
            // already a derived aggregate with its own arithmetic
            MetricExpr::Raw(mf.to_string())
        } else {
            MetricExpr::Sum(mf.to_string())
        }
    }

    /// The formula as it would appear in a tenant document.
    pub fn to_formula(&self) -> String {
        match self {
            MetricExpr::Count(None) => "COUNT(*)".to_string(),
            MetricExpr::Count(Some(col)) => format!("COUNT({col})"),
            MetricExpr::Avg(col) => format!("AVG({col})"),
            MetricExpr::Sum(col) => col.clone(),
            MetricExpr::Raw(expr) => expr.clone(),
        }
    }
}

fn inner_argument(formula: &str) -> &str {
    let open = formula.find('(').map(|i| i + 1).unwrap_or(0);
    let close = formula.rfind(')').unwrap_or(formula.len());
    formula[open..close].trim()
}

impl<'de> Deserialize<'de> for MetricExpr {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) => Ok(MetricExpr::classify(&s)),
            other => Err(de::Error::custom(format!(
                "metric formula must be a string, got {other}"
            ))),
        }
    }
}

impl Serialize for MetricExpr {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_formula())
    }
}

/// Tenant documents loaded from a directory of `*.json` files, keyed by file stem.
#[derive(Debug, Default, Clone)]
pub struct TenantRegistry {
    pub tenants: BTreeMap<String, TenantConfig>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(StarqlError::Config(format!(
                "tenant directory not found: {}",
                dir.display()
            )));
        }
        let mut registry = TenantRegistry::new();
        for entry in glob(&format!("{}/*.json", dir.display()))
            .map_err(|e| StarqlError::Other(e.into()))?
            .flatten()
        {
            registry.load_tenant_file(&entry)?;
        }
        tracing::info!(count = registry.tenants.len(), dir = %dir.display(), "loaded tenant configs");
        Ok(registry)
    }

    fn load_tenant_file(&mut self, path: &PathBuf) -> Result<()> {
        let config = TenantConfig::from_file(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.tenants.insert(name, config);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TenantConfig> {
        self.tenants.get(name)
    }
}

/// Root runtime settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StarqlSettings {
    pub builder: BuilderSettings,
    pub catalog: CatalogSettings,
}

/// SQL builder settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuilderSettings {
    /// Target dialect name (default: "sqlite").
    pub dialect: String,
    /// Degrade unmappable columns to fact-table references instead of failing.
    pub permissive: bool,
}

/// Schema catalog settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Path of the extracted schema document; live introspection when absent.
    pub schema_path: Option<String>,
    /// Table-name prefix marking dimension tables (default: "dim_").
    pub dimension_prefix: String,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            dialect: "sqlite".to_string(),
            permissive: false,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            schema_path: None,
            dimension_prefix: "dim_".to_string(),
        }
    }
}

impl StarqlSettings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| StarqlError::Config(format!("failed to read settings file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| StarqlError::Config(format!("failed to parse settings: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `STARQL_CONFIG` environment variable
    /// 2. `./starql.toml` (current directory)
    /// 3. `~/.config/starql/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("STARQL_CONFIG") {
            if let Ok(settings) = Self::from_file(&path) {
                tracing::info!(path = %path, "loaded settings from STARQL_CONFIG");
                return settings;
            }
        }

        if let Ok(settings) = Self::from_file("starql.toml") {
            tracing::info!("loaded settings from ./starql.toml");
            return settings;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("starql").join("config.toml");
            if let Ok(settings) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded settings from user config dir");
                return settings;
            }
        }

        tracing::debug!("no settings file found, using defaults");
        Self::default()
    }
}
