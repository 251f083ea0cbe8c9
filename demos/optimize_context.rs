//! Example: Running one context optimization pass
//!
//! Usage:
//!   cargo run --example optimize_context -- [config.toml] [skill] [intent...]
//!
//! Without a config file the defaults and `CONTEXT_OPTIMIZER_*` environment
//! variables are used, with sources resolved from the current directory.

use context_optimizer::{
    config::Config,
    context::{ContextOptimizationEngine, SessionContextUpdate},
    logging::init_logging,
    metrics::METRICS,
};

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // Load configuration
    let config = if args.first().is_some_and(|a| a.ends_with(".toml")) {
        let path = args.remove(0);
        Config::from_file(&path)?
    } else {
        Config::from_env()?
    };

    init_logging(&config.logging)?;

    let skill = if args.is_empty() {
        None
    } else {
        Some(args.remove(0)).filter(|s| s != "-")
    };
    let intent = if args.is_empty() {
        "fix the failing authentication test".to_string()
    } else {
        args.join(" ")
    };

    let mut engine = ContextOptimizationEngine::from_config(config)?;

    let result = engine.optimize(
        skill.as_deref(),
        &intent,
        SessionContextUpdate::new().phase("debugging"),
    );

    println!("{}", serde_json::to_string_pretty(&result)?);

    println!("\n# Metrics");
    println!("{}", METRICS.export_prometheus());

    Ok(())
}
