//! Health Command
//!
//! Check whether the configured completion provider is reachable.

use console::style;

use crate::config::ConfigLoader;
use crate::generation::ClientCache;
use crate::types::{DraftError, Result};

pub async fn run() -> Result<()> {
    let config = ConfigLoader::load()?;

    let cache = ClientCache::new();
    let client = cache.get_or_init(&config.llm)?;

    println!(
        "Checking provider at {} (model: {})...",
        config.llm.api_base, config.llm.model
    );

    match client.health_check().await {
        Ok(true) => {
            println!("{} provider is reachable", style("✓").green().bold());
            Ok(())
        }
        Ok(false) => Err(DraftError::Config(
            "provider is not reachable; check api_base and API key".to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}
