//! AI models commands.
//!
//! Lists the registered analyzers with their capabilities and configured key
//! counts, and shows how an id or alias resolves.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use petcare_models::auth::env_var_for_provider;
use petcare_models::{AnalyzerRegistry, Capability, CapabilitySet, ModelInfo};

use crate::config::ConfigLoader;

/// Models management arguments.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommands,
}

/// Models subcommands.
#[derive(Subcommand, Debug)]
pub enum ModelsCommands {
    /// List available models
    List {
        /// Filter by capability (image, audio, video, activity, text)
        #[arg(long)]
        capability: Option<String>,
    },
    /// Show which model an id or alias resolves to
    Resolve {
        /// Model id or alias (e.g., gemini-1.5-flash, hf)
        model: String,
    },
}

/// Run models command.
pub fn run(args: ModelsArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let registry = AnalyzerRegistry::from_env(&config.models.to_registry_config())?;

    match args.command {
        ModelsCommands::List { capability } => list_models(&registry, capability.as_deref()),
        ModelsCommands::Resolve { model } => resolve_model(&registry, &model),
    }
}

/// List models with an optional capability filter.
fn list_models(registry: &AnalyzerRegistry, capability: Option<&str>) -> Result<()> {
    let filter = capability.map(parse_capability).transpose()?;
    let models: Vec<ModelInfo> = registry
        .models()
        .into_iter()
        .filter(|m| filter.is_none_or(|cap| m.capabilities.contains(cap)))
        .collect();

    if models.is_empty() {
        println!("No models match the specified filters.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Capabilities").fg(Color::Cyan),
        Cell::new("Keys").fg(Color::Cyan),
    ]);

    for model in &models {
        let keys = if model.credentials == 0 {
            Cell::new("none").fg(Color::Yellow)
        } else {
            Cell::new(model.credentials)
        };
        table.add_row(vec![
            Cell::new(model.id),
            Cell::new(model.provider),
            Cell::new(&model.model),
            Cell::new(format_capabilities(model.capabilities)),
            keys,
        ]);
    }

    println!("{table}");

    for provider in missing_providers(&models) {
        if let Some(var) = env_var_for_provider(provider) {
            println!("No {provider} keys configured; set {var} to enable.");
        }
    }
    Ok(())
}

/// Show how an id or alias resolves.
fn resolve_model(registry: &AnalyzerRegistry, requested: &str) -> Result<()> {
    let analyzer = registry.resolve(Some(requested))?;
    let id = analyzer.id();
    let Some(info) = registry.models().into_iter().find(|m| m.id == id) else {
        bail!("Model '{}' is not registered", id);
    };

    println!("{requested} -> {id}");
    println!();
    println!("Label: {}", info.label);
    println!("Provider: {}", info.provider);
    println!("Model: {}", info.model);
    println!("Capabilities: {}", format_capabilities(info.capabilities));
    println!("Keys configured: {}", info.credentials);
    println!("Aliases: {}", id.aliases().collect::<Vec<_>>().join(", "));

    Ok(())
}

/// Parse a capability name.
fn parse_capability(cap: &str) -> Result<Capability> {
    let normalized = cap.trim().to_lowercase();
    match Capability::ALL.into_iter().find(|c| c.as_str() == normalized) {
        Some(capability) => Ok(capability),
        None => {
            let valid: Vec<_> = Capability::ALL.iter().map(Capability::as_str).collect();
            bail!("Unknown capability '{}'. Valid: {}", cap, valid.join(", "))
        }
    }
}

/// Format capabilities as a comma-separated string.
fn format_capabilities(caps: CapabilitySet) -> String {
    let parts: Vec<_> = caps.iter().map(|c| c.as_str()).collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

/// Providers with no keys, deduplicated in listing order.
fn missing_providers(models: &[ModelInfo]) -> Vec<&'static str> {
    let mut providers = Vec::new();
    for model in models.iter().filter(|m| m.credentials == 0) {
        if !providers.contains(&model.provider) {
            providers.push(model.provider);
        }
    }
    providers
}
