use anyhow::Context;

use crate::config::Config;
use crate::db::{CatalogImport, Store};

pub async fn cmd_import(config: &Config, path: &str) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read import file: {path}"))?;
    let import: CatalogImport = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse import file: {path}"))?;

    let store = open_store(config).await?;
    let summary = store.import_catalog(&import).await?;

    println!("Imported catalog from {path}");
    println!("  Brands:          {}", summary.brands);
    println!("  Models:          {}", summary.models);
    println!("  Engine variants: {}", summary.engine_variants);
    println!("  Engine codes:    {}", summary.engine_codes);

    Ok(())
}

pub async fn cmd_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let counts = store.table_counts().await?;

    println!("Catalog ({})", config.general.database_path);
    println!("{:-<40}", "");
    println!("  Brands:          {}", counts.brands);
    println!("  Models:          {}", counts.models);
    println!("  Engine variants: {}", counts.engine_variants);
    println!("  Engine codes:    {}", counts.engine_codes);

    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}
