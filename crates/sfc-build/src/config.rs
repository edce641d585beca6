//! Configuration loading and management.

use crate::cli::Args;
use bundler_host::{BuildOptions, SourceMapMode};
use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use js_engine::JsExecutorOptions;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};

/// Extensions the driver picks up when walking a directory.
pub const EXTENSIONS: &[&str] = &["vue", "scss", "sass"];

const DEFAULT_IGNORES: &[&str] = &["**/node_modules/**", "**/dist/**", "**/.git/**"];

/// Configuration for sfc-build.
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory.
    pub workspace: PathBuf,
    /// Entries as given on the command line.
    pub roots: Vec<PathBuf>,
    /// Path to the compiler script.
    pub compiler: PathBuf,
    /// Path to tsconfig.json.
    pub tsconfig: Option<PathBuf>,
    /// Executor sizing.
    pub executor: JsExecutorOptions,
    ignore: GlobSet,
    dev: bool,
    ssr: bool,
    sourcemap: bool,
}

impl Config {
    /// Load configuration from CLI arguments and workspace.
    pub fn load(workspace: &Path, args: &Args) -> Result<Self> {
        let tsconfig = args
            .tsconfig
            .clone()
            .or_else(|| Some(workspace.join("tsconfig.json")).filter(|p| p.is_file()));

        let mut ignore = GlobSetBuilder::new();
        for pattern in DEFAULT_IGNORES
            .iter()
            .copied()
            .chain(args.ignore.iter().map(String::as_str))
        {
            let glob = Glob::new(pattern)
                .into_diagnostic()
                .wrap_err_with(|| format!("invalid ignore pattern `{pattern}`"))?;
            ignore.add(glob);
        }

        let mut executor = JsExecutorOptions::default();
        if let Some(workers) = args.workers {
            executor.workers = workers.max(1);
            executor.queue_capacity = executor.workers * 4;
        }

        Ok(Self {
            workspace: workspace.to_path_buf(),
            roots: args
                .entries
                .iter()
                .map(|entry| workspace.join(entry))
                .collect(),
            compiler: workspace.join(&args.compiler),
            tsconfig,
            executor,
            ignore: ignore.build().into_diagnostic()?,
            dev: args.dev,
            ssr: args.ssr,
            sourcemap: args.sourcemap,
        })
    }

    /// Build options for the host.
    pub fn build_options(&self) -> BuildOptions {
        let mut define = IndexMap::new();
        if self.dev {
            define.insert("import.meta.env.MODE".to_string(), "'development'".to_string());
            define.insert("import.meta.env.PROD".to_string(), "false".to_string());
            define.insert("import.meta.env.DEV".to_string(), "true".to_string());
        }
        if self.ssr {
            define.insert("import.meta.env.SSR".to_string(), "true".to_string());
        }

        BuildOptions {
            abs_working_dir: Some(self.workspace.clone()),
            define,
            sourcemap: if self.sourcemap {
                SourceMapMode::Inline
            } else {
                SourceMapMode::None
            },
            tsconfig: self.tsconfig.clone(),
            ..Default::default()
        }
    }

    /// Collect entry points: files are taken as given, directories are
    /// walked for components and stylesheets.
    pub fn find_entries(&self) -> Vec<String> {
        let mut entries = Vec::new();

        for root in &self.roots {
            if root.is_file() {
                entries.push(root.to_string_lossy().into_owned());
                continue;
            }

            for entry in walkdir::WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if entry.file_type().is_file() && self.should_process(path) {
                    entries.push(path.to_string_lossy().into_owned());
                }
            }
        }

        entries
    }

    /// Check if a file should be processed.
    pub fn should_process(&self, path: &Path) -> bool {
        let known = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| EXTENSIONS.contains(&e));
        if !known {
            return false;
        }

        // Partials are pulled in through `@import`.
        let partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('_'));

        !partial && !self.ignore.is_match(path)
    }
}
