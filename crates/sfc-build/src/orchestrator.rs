//! Orchestrator wiring the compiler, the plugin and the build host.

use crate::cli::Args;
use crate::config::{Config, EXTENSIONS};
use crate::output::{OutputFormatter, Severity};
use bundler_host::{Build, BuildResult};
use js_engine::{CompilerCache, JsExecutor, QuickJsFactory};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use vue_plugin::VuePlugin;

/// Result of a build run.
#[derive(Debug, Default)]
pub struct BuildSummary {
    /// Number of entry points.
    pub entry_count: usize,
    /// Number of generated modules.
    pub module_count: usize,
    /// Number of errors.
    pub error_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Time taken.
    pub duration_ms: u64,
}

/// Orchestrator for running sfc-build.
pub struct Orchestrator {
    config: Config,
    args: Args,
    formatter: OutputFormatter,
    build: Arc<Build>,
}

impl Orchestrator {
    /// Create a new orchestrator: load the compiler and set up the plugin.
    pub fn new(workspace: PathBuf, args: Args) -> Result<Self> {
        let config = Config::load(&workspace, &args)?;
        let formatter = OutputFormatter::new(args.output);

        let cache = CompilerCache::from_file(&config.compiler)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read compiler {}", config.compiler.display()))?;
        let factory = QuickJsFactory::new(Arc::new(cache));
        let executor = JsExecutor::new(Arc::new(factory), config.executor.clone())
            .into_diagnostic()
            .wrap_err("failed to start the compiler")?;
        info!(workers = executor.workers(), "compiler ready");

        let plugin = VuePlugin::builder().executor(Arc::new(executor)).build()?;
        let mut build = Build::new(config.build_options());
        build.add_plugin(plugin.into_plugin());

        Ok(Self {
            config,
            args,
            formatter,
            build: Arc::new(build),
        })
    }

    /// Run a single build.
    pub async fn run_single_build(&self) -> Result<BuildSummary> {
        let start = Instant::now();
        let entries = self.config.find_entries();
        debug!(count = entries.len(), "found entries");

        let entry_count = entries.len();
        let build = Arc::clone(&self.build);
        let result = tokio::task::spawn_blocking(move || build.run_entries(&entries))
            .await
            .into_diagnostic()?;

        self.output_results(&result);
        let summary = BuildSummary {
            entry_count,
            module_count: result.modules.len(),
            error_count: result.errors.len(),
            warning_count: result.warnings.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        self.formatter.print_summary(&summary);

        Ok(summary)
    }

    /// Run in watch mode until interrupted.
    pub async fn run_watch_mode(&self) -> Result<()> {
        use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
        use std::time::Duration;

        eprintln!("Starting watch mode...\n");
        if let Err(err) = self.run_single_build().await {
            eprintln!("{err:?}");
        }

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
        )
        .into_diagnostic()?;

        for root in &self.config.roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to watch {}", root.display()))?;
        }

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    let relevant = event.paths.iter().any(|p| {
                        p.extension()
                            .and_then(|e| e.to_str())
                            .is_some_and(|e| EXTENSIONS.contains(&e))
                    });
                    if !relevant {
                        continue;
                    }
                    // Coalesce the burst of events an editor save produces.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    while rx.try_recv().is_ok() {}

                    eprintln!("File change detected. Rebuilding...\n");
                    if let Err(err) = self.run_single_build().await {
                        eprintln!("{err:?}");
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        Ok(())
    }

    /// Run the plugins' dispose hooks.
    pub fn dispose(&self) {
        self.build.dispose();
    }

    fn output_results(&self, result: &BuildResult) {
        if self.args.print_modules {
            for module in &result.modules {
                self.formatter.print_module(module);
            }
        }
        for message in &result.warnings {
            self.formatter.print_message(Severity::Warning, message);
        }
        for message in &result.errors {
            self.formatter.print_message(Severity::Error, message);
        }
    }
}
