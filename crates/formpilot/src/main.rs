use anyhow::Context;
use clap::{Parser, Subcommand};
use formpilot_chrome::ChromeBackend;
use formpilot_common::plan::FillPlan;
use formpilot_engine::engine::ExecutionEngine;
use formpilot_engine::pacing::Pacing;
use formpilot_engine::scanner::FormScanner;

#[derive(Parser)]
#[command(name = "formpilot", version, about = "Scan and fill web application forms")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Launch the browser in visible mode (not headless)
    #[arg(long, global = true)]
    visible: bool,

    /// Write the JSON result to a file instead of stdout
    #[arg(long, global = true)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Discover the fillable questions of an application form
    Scan {
        /// Application form URL
        #[arg(long)]
        url: String,
    },
    /// Execute a fill plan against its target page
    Fill {
        /// Path to a JSON fill plan
        #[arg(long)]
        plan: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr so stdout stays clean for the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut backend = ChromeBackend::new_with_visibility(args.visible);
    backend
        .launch()
        .await
        .context("failed to launch browser backend")?;

    let outcome = run(&mut backend, &args.command).await;

    if let Err(e) = backend.close().await {
        tracing::warn!("failed to close browser cleanly: {}", e);
    }

    let json = outcome?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("writing {}", path))?
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run(backend: &mut ChromeBackend, command: &Command) -> anyhow::Result<String> {
    match command {
        Command::Scan { url } => {
            let report = FormScanner::new(backend, Pacing::default())
                .scan(url)
                .await
                .context("scan failed")?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Fill { plan } => {
            let raw = std::fs::read_to_string(plan).with_context(|| format!("reading {}", plan))?;
            let plan: FillPlan =
                serde_json::from_str(&raw).context("fill plan is not valid JSON")?;
            let report = ExecutionEngine::default()
                .execute(backend, &plan)
                .await
                .context("plan execution failed")?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}
