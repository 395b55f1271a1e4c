use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use meditalks_core::offline::{OFFLINE_SOURCE, offline_adaptation};
use meditalks_core::pipeline::target_language;
use meditalks_core::{
    AdaptationRequest, Config, Document, Language, OrchestrationError, Pipeline, PipelineError,
    context,
};
use meditalks_pdf::PdfExtractBackend;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod output;

use output::ColorMode;

/// MediTalks - Culturally adapted medical communication for Southeast Asia
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adapt a medical message for a cultural context
    Adapt {
        /// Message to adapt (read from stdin when omitted)
        message: Option<String>,

        /// Cultural context identifier (see `contexts`)
        #[arg(short, long)]
        context: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Summarize a PDF medical document into sections
    Summarize {
        /// Path to the PDF document
        file_path: PathBuf,

        /// Cultural context identifier (see `contexts`)
        #[arg(short, long, default_value = "thai-low-literacy")]
        context: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List cultural contexts and supported languages
    Contexts {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Check each configured AI backend
    Health {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Output language code (defaults to the context's language)
    #[arg(short, long)]
    lang: Option<String>,

    /// SEA-Lion API key
    #[arg(long)]
    sealion_key: Option<String>,

    /// Gemini API key
    #[arg(long)]
    gemini_key: Option<String>,

    /// Comma-separated list of backends to disable
    #[arg(long, value_delimiter = ',')]
    disable_backends: Vec<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Log orchestration details to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl CommonArgs {
    /// Resolve configuration: CLI flags > env vars > config file > defaults
    fn config(&self) -> Config {
        let mut config = Config::load();
        if let Some(key) = &self.sealion_key {
            config.sealion_api_key = Some(key.clone());
        }
        if let Some(key) = &self.gemini_key {
            config.gemini_api_key = Some(key.clone());
        }
        config
            .disabled_backends
            .extend(self.disable_backends.iter().cloned());
        config
    }

    fn color(&self) -> ColorMode {
        ColorMode(!self.no_color && !self.json)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Command::Adapt { common, .. }
        | Command::Summarize { common, .. }
        | Command::Health { common } => common.verbose,
        Command::Contexts { .. } => false,
    };
    init_logging(verbose);

    match cli.command {
        Command::Adapt {
            message,
            context,
            common,
        } => adapt(message, context, common).await,
        Command::Summarize {
            file_path,
            context,
            common,
        } => summarize(file_path, context, common).await,
        Command::Contexts { json, no_color } => contexts(json, ColorMode(!no_color)),
        Command::Health { common } => health(common).await,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "meditalks=debug" } else { "meditalks=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Cancel `token` on Ctrl-C so in-flight backend calls stop.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            child.cancel();
        }
    });
    token
}

fn build_pipeline(common: &CommonArgs) -> anyhow::Result<Pipeline> {
    Pipeline::from_config(&common.config(), Arc::new(PdfExtractBackend))
        .context("failed to build HTTP client")
}

async fn adapt(
    message: Option<String>,
    context_id: String,
    common: CommonArgs,
) -> anyhow::Result<ExitCode> {
    let message = match message {
        Some(m) => m,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read message from stdin")?;
            buf
        }
    };

    let pipeline = build_pipeline(&common)?;
    let request = AdaptationRequest {
        source_text: message,
        context_id,
        target_language: common.lang.clone(),
    };
    let color = common.color();
    let mut out = std::io::stdout().lock();

    match pipeline.adapt(&request, &cancel_on_ctrl_c()).await {
        Ok(result) => {
            if common.json {
                serde_json::to_writer_pretty(&mut out, &result)?;
                writeln!(out)?;
            } else {
                output::print_adaptation(&mut out, &result, color)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::Backend(
            err @ (OrchestrationError::AllFailed { .. } | OrchestrationError::NoBackends),
        )) => {
            // Validation passed, so context and language resolve.
            let language = context::resolve(&request.context_id)
                .and_then(|ctx| target_language(ctx, request.target_language.as_deref()))
                .unwrap_or(Language::En);
            let text = offline_adaptation(request.source_text.trim(), language);
            if common.json {
                let value = serde_json::json!({
                    "adapted_text": text,
                    "source_service_used": OFFLINE_SOURCE,
                    "fallback_occurred": true,
                    "degraded": true,
                    "target_language": language,
                    "error": err.to_string(),
                });
                serde_json::to_writer_pretty(&mut out, &value)?;
                writeln!(out)?;
            } else {
                output::print_degraded(&mut out, &text, language, &err.failure_kinds(), color)?;
            }
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err.into()),
    }
}

async fn summarize(
    file_path: PathBuf,
    context_id: String,
    common: CommonArgs,
) -> anyhow::Result<ExitCode> {
    let bytes = std::fs::read(&file_path)
        .with_context(|| format!("failed to read {}", file_path.display()))?;
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.display().to_string());

    let pipeline = build_pipeline(&common)?;
    let analysis = pipeline
        .analyze_document(
            Document::new(bytes, file_name),
            &context_id,
            common.lang.as_deref(),
            &cancel_on_ctrl_c(),
        )
        .await?;

    let mut out = std::io::stdout().lock();
    if common.json {
        serde_json::to_writer_pretty(&mut out, &analysis)?;
        writeln!(out)?;
    } else {
        output::print_analysis(&mut out, &analysis, common.color())?;
    }
    Ok(ExitCode::SUCCESS)
}

fn contexts(json: bool, color: ColorMode) -> anyhow::Result<ExitCode> {
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, context::all())?;
        writeln!(out)?;
    } else {
        output::print_contexts(&mut out, color)?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn health(common: CommonArgs) -> anyhow::Result<ExitCode> {
    let pipeline = build_pipeline(&common)?;
    let statuses = pipeline.backend_status(Duration::from_secs(5)).await;

    let mut out = std::io::stdout().lock();
    if common.json {
        serde_json::to_writer_pretty(&mut out, &statuses)?;
        writeln!(out)?;
    } else {
        output::print_health(&mut out, &statuses, common.color())?;
    }
    if statuses.iter().any(|s| s.available) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
