//! Print the stage graph

use anyhow::{Context, Result};
use clap::ValueEnum;
use framecast_codegen::Pipeline;

use super::load_config;

/// How the graph is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Mermaid flowchart
    Mermaid,
    /// One line per route
    Text,
}

/// Run the graph command
pub async fn run(config_path: Option<&str>, format: GraphFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::new(&config.project).context("Failed to build pipeline")?;
    let graph = pipeline.graph();

    match format {
        GraphFormat::Mermaid => print!("{}", graph.to_mermaid()),
        GraphFormat::Text => {
            println!("graph {}", graph.name());
            for platform in graph.platforms() {
                println!("  {}: {}", platform, graph.path_for(Some(platform)).join(" -> "));
            }
        }
    }
    Ok(())
}
