//! Draft Command
//!
//! Generate a report section from a template (or raw prompt) and write the
//! result to stdout. With streaming enabled, fragments are written as they
//! arrive.

use std::io::Write;
use std::sync::Arc;

use console::style;
use tracing::info;

use crate::config::ConfigLoader;
use crate::generation::{ClientCache, GenerationOrchestrator};
use crate::template::{TemplateParams, TemplateRegistry, TemplateSource};
use crate::types::{DraftError, Result};

/// Options shared by the template and raw-prompt entry points
#[derive(Debug, Default)]
pub struct DraftOptions {
    /// Model override
    pub model: Option<String>,
    /// Force streaming on or off; `None` keeps the configured default
    pub stream: Option<bool>,
}

/// Generate from a template id with `key=value` parameters
pub async fn run_template(
    template_id: &str,
    params: Vec<(String, String)>,
    options: DraftOptions,
) -> Result<()> {
    let registry = Arc::new(TemplateRegistry::with_builtins());
    if registry.get(template_id).is_none() {
        return Err(DraftError::Template(format!(
            "unknown template '{}'; run `draftsmith templates` to list available ids",
            template_id
        )));
    }

    let params: TemplateParams = params.into_iter().collect();
    let (orchestrator, streaming) = build_orchestrator(registry, &options)?;

    let content = orchestrator
        .generate(template_id, &params)
        .await
        .map_err(DraftError::from)?;

    if !streaming {
        println!("{content}");
    }
    Ok(())
}

/// Generate directly from a raw prompt
pub async fn run_prompt(prompt: &str, options: DraftOptions) -> Result<()> {
    let registry = Arc::new(TemplateRegistry::with_builtins());
    let (orchestrator, streaming) = build_orchestrator(registry, &options)?;

    let content = orchestrator
        .generate_from_prompt(prompt)
        .await
        .map_err(DraftError::from)?;

    if !streaming {
        println!("{content}");
    }
    Ok(())
}

fn build_orchestrator(
    registry: Arc<dyn TemplateSource>,
    options: &DraftOptions,
) -> Result<(GenerationOrchestrator, bool)> {
    let mut config = ConfigLoader::load()?;
    if let Some(model) = &options.model {
        config.llm.model = model.clone();
    }
    let streaming = options.stream.unwrap_or(config.llm.streaming);

    let cache = ClientCache::new();
    let client = cache.get_or_init(&config.llm)?;

    info!(model = %config.llm.model, streaming, "Drafting");

    let orchestrator = GenerationOrchestrator::new(registry, client)
        .with_streaming(streaming)
        .on_stream(|fragment, _progress| {
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(fragment.as_bytes());
            let _ = stdout.flush();
        })
        .on_complete(|_content, metadata| {
            eprintln!();
            eprintln!(
                "{} {} chars from {} ({})",
                style("✓").green().bold(),
                metadata.response_chars,
                metadata.model,
                metadata.correlation_id
            );
        })
        .on_error(|err| {
            eprintln!("{} {}", style("✗").red().bold(), err);
        });

    Ok((orchestrator, streaming))
}
