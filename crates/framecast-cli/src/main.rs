//! Framecast CLI
//!
//! Developer tool for turning design trees into web and mobile components.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Framecast - design trees to React and React Native components
#[derive(Parser)]
#[command(name = "framecast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file or project directory (defaults to ./framecast.yaml when present)
    #[arg(short, long, global = true, env = "FRAMECAST_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Framecast project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Generate code from one design file
    Generate {
        /// Design file (JSON or YAML)
        design: String,

        /// Target platform (web, mobile)
        #[arg(short, long, default_value = "web")]
        platform: String,

        /// Style approach (tailwind, css-modules, nativewind, stylesheet)
        #[arg(short, long)]
        style: Option<String>,

        /// Free-text instruction embedded in the generated file
        #[arg(short, long)]
        instruction: Option<String>,

        /// Component name (derived from the root node by default)
        #[arg(short, long)]
        name: Option<String>,

        /// Directory generated files are written under (defaults to the project directory)
        #[arg(short, long)]
        out: Option<String>,

        /// Print generated files instead of writing them
        #[arg(long)]
        print: bool,

        /// Print the full run result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run designs through the task runtime and report task snapshots
    Submit {
        /// Design files (JSON or YAML)
        #[arg(required = true)]
        designs: Vec<String>,

        /// Target platform (web, mobile)
        #[arg(short, long, default_value = "web")]
        platform: String,

        /// Style approach
        #[arg(short, long)]
        style: Option<String>,

        /// Requester identifier recorded with each task
        #[arg(short, long)]
        requester: Option<String>,

        /// Also print the requester's task history
        #[arg(long, requires = "requester")]
        history: bool,
    },

    /// Validate configuration and design files without generating
    Validate {
        /// Design files or directories to check
        paths: Vec<String>,
    },

    /// Print the stage graph
    Graph {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = commands::graph::GraphFormat::Mermaid)]
        format: commands::graph::GraphFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Init { path } => {
            commands::init::run(&path).await?;
        }
        Commands::Generate {
            design,
            platform,
            style,
            instruction,
            name,
            out,
            print,
            json,
        } => {
            let options = commands::generate::GenerateOptions {
                platform,
                style,
                instruction,
                name,
                out,
                print,
                json,
            };
            commands::generate::run(config, &design, options).await?;
        }
        Commands::Submit {
            designs,
            platform,
            style,
            requester,
            history,
        } => {
            commands::submit::run(
                config,
                &designs,
                &platform,
                style.as_deref(),
                requester.as_deref(),
                history,
            )
            .await?;
        }
        Commands::Validate { paths } => {
            commands::validate::run(config, &paths).await?;
        }
        Commands::Graph { format } => {
            commands::graph::run(config, format).await?;
        }
    }

    Ok(())
}
