//! Generate code from a design file

use anyhow::{Context, Result, bail};
use framecast_codegen::{GenerationRequest, Pipeline, PipelineResult, RunStatus};
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::{load_config, read_design};

/// Flags of the generate command
pub struct GenerateOptions {
    /// Target platform identifier
    pub platform: String,
    /// Style approach; platform default when absent
    pub style: Option<String>,
    /// User instruction
    pub instruction: Option<String>,
    /// Component name override
    pub name: Option<String>,
    /// Output root; project directory when absent
    pub out: Option<String>,
    /// Print files instead of writing them
    pub print: bool,
    /// Print the run result as JSON
    pub json: bool,
}

/// Run the generate command
pub async fn run(config_path: Option<&str>, design: &str, options: GenerateOptions) -> Result<()> {
    let config = load_config(config_path)?;
    let raw = read_design(Path::new(design))?;

    let mut request = GenerationRequest::new(raw, options.platform.as_str());
    if let Some(style) = options.style {
        request = request.with_style(style);
    }
    if let Some(instruction) = options.instruction {
        request = request.with_instruction(instruction);
    }
    if let Some(name) = options.name {
        request = request.with_component_name(name);
    }

    let pipeline = Pipeline::new(&config.project).context("Failed to build pipeline")?;
    tracing::info!("Generating {} code from {}", options.platform, design);
    let result = pipeline.run(&request);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report(&result);
    }

    if result.status == RunStatus::Failed {
        bail!("Generation failed for {}", design);
    }

    if let Some(code) = &result.code {
        if options.print {
            for file in &code.files {
                println!("// {}\n{}", file.path, file.contents);
            }
        } else {
            let root = options
                .out
                .map(PathBuf::from)
                .unwrap_or_else(|| config.base_path.clone());
            for file in &code.files {
                let target = output_path(&root, &file.path)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                fs::write(&target, &file.contents)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                tracing::info!("✓ Wrote {}", target.display());
            }
        }
    }

    Ok(())
}

fn report(result: &PipelineResult) {
    for error in &result.errors {
        let severity = if error.recoverable { "warning" } else { "error" };
        eprintln!("{} [{}] {}", severity, error.stage, error.message);
    }
    eprintln!(
        "{}: {} ({} error(s), {} ms)",
        result.component_name.as_deref().unwrap_or("design"),
        result.status,
        result.errors.len(),
        result.duration_ms
    );
}

/// Join a generated relative path onto the output root, refusing paths that
/// would escape it
fn output_path(root: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        bail!(
            "Refusing to write {} outside the output directory",
            relative.display()
        );
    }
    Ok(root.join(relative))
}
