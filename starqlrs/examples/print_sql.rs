use std::{env, fs, path::PathBuf};

use starql::{validate_intent, Intent, SchemaCatalog, SqlBuilder, StarqlSettings, TenantConfig};
use tracing_subscriber::EnvFilter;

fn usage() {
    eprintln!("Usage: print_sql <tenant_config_json> <intent_json> [schema_json]");
    eprintln!("Without [schema_json], catalog.schema_path from starql.toml is used.");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }

    let settings = StarqlSettings::load_default();
    let config_path = PathBuf::from(args.remove(0));
    let intent_path = PathBuf::from(args.remove(0));
    let schema_path = if args.is_empty() {
        settings.catalog.schema_path.clone().ok_or_else(|| {
            anyhow::anyhow!("no schema document: pass [schema_json] or set catalog.schema_path")
        })?
    } else {
        args.remove(0)
    };

    let config = TenantConfig::from_file(&config_path)?;
    let mut catalog = SchemaCatalog::from_file(&schema_path)?;
    catalog.dimension_prefix = settings.catalog.dimension_prefix.clone();
    let intent: Intent = serde_json::from_str(&fs::read_to_string(intent_path)?)?;

    let today = chrono::Local::now().date_naive();
    let validated = validate_intent(&intent, &config, today)?;
    let bound = SqlBuilder::from_settings(&config, &catalog, &settings.builder)
        .build(&validated, &settings.builder.dialect)?;

    println!("{}", bound.sql);
    for (name, value) in &bound.params {
        println!("  :{name} = {value}");
    }
    Ok(())
}
