//! mastercheck CLI: mastery quizzes, progress and class analytics.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mastercheck", version, about = "Mastery quiz engine and progress tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a module quiz interactively
    Take {
        /// Module id to quiz on
        #[arg(long)]
        module: String,

        /// Learner id (defaults to the configured learner)
        #[arg(long)]
        learner: Option<String>,

        /// Question source name from the config
        #[arg(long)]
        source: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show mastery status per module
    Status {
        /// Output format: text, json, markdown, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Learner id (defaults to the configured learner)
        #[arg(long)]
        learner: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Replay a finished attempt
    Review {
        /// Module id
        #[arg(long)]
        module: String,

        /// Attempt number (defaults to the latest completed attempt)
        #[arg(long)]
        attempt: Option<u32>,

        /// Learner id (defaults to the configured learner)
        #[arg(long)]
        learner: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Summarize per-question class analytics
    Analytics {
        /// Analytics JSON file
        #[arg(long)]
        input: PathBuf,

        /// Also write an HTML view to this path
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Compare two progress reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Exit code 1 if a passed module is no longer passed
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate question set TOML files
    Validate {
        /// Path to a question set file or directory
        #[arg(long)]
        question_set: PathBuf,
    },

    /// Create a starter config, question set and resource catalog
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "mastercheck=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            module,
            learner,
            source,
            config,
        } => commands::take::execute(module, learner, source, config).await,
        Commands::Status {
            format,
            output,
            learner,
            config,
        } => commands::status::execute(format, output, learner, config),
        Commands::Review {
            module,
            attempt,
            learner,
            config,
        } => commands::review::execute(module, attempt, learner, config),
        Commands::Analytics { input, html } => commands::analytics::execute(input, html),
        Commands::Compare {
            baseline,
            current,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, fail_on_regression, format),
        Commands::Validate { question_set } => commands::validate::execute(question_set),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
