//! sfc-build - compile Vue single-file components through an embedded compiler.

use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod config;
mod orchestrator;
mod output;

use cli::Args;
use orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let watch = args.watch;
    let orchestrator = Orchestrator::new(workspace, args)?;

    let exit_code = if watch {
        orchestrator.run_watch_mode().await?;
        ExitCode::SUCCESS
    } else {
        let summary = orchestrator.run_single_build().await?;
        if summary.error_count > 0 {
            ExitCode::from(1)
        } else {
            ExitCode::SUCCESS
        }
    };

    orchestrator.dispose();
    Ok(exit_code)
}
