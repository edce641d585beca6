//! In-memory build host.

use crate::hooks::{
    DisposeCallback, EndCallback, ImportKind, LoadArgs, LoadCallback, LoadResult, Loader,
    OnLoadOptions, OnResolveOptions, Plugin, PluginBuild, PluginData, ResolveArgs,
    ResolveCallback, ResolveResult, StartCallback,
};
use crate::message::Message;
use crate::options::BuildOptions;
use crate::scan::scan_imports;
use crate::{path, FILE_NAMESPACE};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A module produced by a build.
#[derive(Clone, Serialize)]
pub struct OutputModule {
    /// The resolved path.
    pub path: String,
    /// The module namespace.
    pub namespace: String,
    /// How the contents are interpreted.
    pub loader: Loader,
    /// The loaded contents.
    pub contents: String,
    /// Directory the module's imports resolve against.
    pub resolve_dir: PathBuf,
    #[serde(skip)]
    plugin_data: Option<PluginData>,
}

impl std::fmt::Debug for OutputModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputModule")
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .field("loader", &self.loader)
            .field("contents", &self.contents)
            .finish()
    }
}

/// Result of a build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildResult {
    /// Errors.
    pub errors: Vec<Message>,
    /// Warnings.
    pub warnings: Vec<Message>,
    /// Loaded modules, in discovery order.
    pub modules: Vec<OutputModule>,
}

impl BuildResult {
    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Find a loaded module.
    pub fn module(&self, namespace: &str, path: &str) -> Option<&OutputModule> {
        self.modules
            .iter()
            .find(|m| m.namespace == namespace && m.path == path)
    }

    /// Errors attached to a file.
    pub fn errors_for(&self, file: &str) -> Vec<&Message> {
        self.errors.iter().filter(|m| m.file() == Some(file)).collect()
    }
}

struct ResolveHook {
    plugin: String,
    options: OnResolveOptions,
    callback: ResolveCallback,
}

struct LoadHook {
    plugin: String,
    options: OnLoadOptions,
    callback: LoadCallback,
}

/// A module that resolved and waits to be loaded.
struct Pending {
    path: String,
    namespace: String,
    importer: String,
    plugin_data: Option<PluginData>,
}

/// An in-memory bundler host.
///
/// Plugins register hooks through [`Build::add_plugin`]; [`Build::run`]
/// then walks the module graph from the entry points, running resolve and
/// load hooks for every import it discovers.
///
/// Imports are discovered lexically, with comments skipped. Text inside a
/// string, template or regex literal that reads like an import statement
/// is taken as one, so a module embedding such text may pull in an extra
/// resolve.
pub struct Build {
    options: BuildOptions,
    start: Vec<(String, StartCallback)>,
    resolvers: Vec<ResolveHook>,
    loaders: Vec<LoadHook>,
    end: Vec<(String, EndCallback)>,
    dispose: Vec<DisposeCallback>,
}

impl Build {
    /// Create a host with build options.
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            start: Vec::new(),
            resolvers: Vec::new(),
            loaders: Vec::new(),
            end: Vec::new(),
            dispose: Vec::new(),
        }
    }

    /// The build options, as left by the plugins' setup.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Register a plugin by running its setup.
    pub fn add_plugin(&mut self, plugin: Plugin) {
        let name = plugin.name().to_string();
        debug!(plugin = %name, "setting up plugin");
        let mut registrar = Registrar { build: self, plugin: name };
        plugin.setup(&mut registrar);
    }

    /// Build the configured entry points.
    pub fn run(&self) -> BuildResult {
        self.run_entries(&self.options.entry_points)
    }

    /// Build a set of entry points.
    pub fn run_entries(&self, entry_points: &[String]) -> BuildResult {
        let mut result = BuildResult::default();

        for (plugin, callback) in &self.start {
            if let Err(err) = callback(&self.options) {
                result
                    .errors
                    .push(Message::new(err.to_string()).with_plugin(plugin));
            }
        }
        if result.has_errors() {
            return self.finish(result);
        }

        let working_dir = self.options.working_dir();
        let mut frontier: Vec<ResolveArgs> = entry_points
            .iter()
            .map(|entry| ResolveArgs {
                path: entry.clone(),
                importer: String::new(),
                namespace: FILE_NAMESPACE.to_string(),
                resolve_dir: working_dir.clone(),
                kind: ImportKind::EntryPoint,
                plugin_data: None,
            })
            .collect();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        while !frontier.is_empty() {
            let resolved: Vec<_> = frontier
                .par_iter()
                .map(|args| (args, self.resolve(args)))
                .collect();

            let mut pending = Vec::new();
            for (args, outcome) in resolved {
                let resolution = match outcome {
                    Ok(Some(resolution)) => resolution,
                    Ok(None) => continue,
                    Err(message) => {
                        result.errors.push(message);
                        continue;
                    }
                };
                result.warnings.extend(resolution.warnings);
                if !resolution.errors.is_empty() {
                    let file = origin(args);
                    result
                        .errors
                        .extend(resolution.errors.into_iter().map(|m| locate(m, file)));
                    continue;
                }
                if resolution.external {
                    continue;
                }

                let namespace = if resolution.namespace.is_empty() {
                    FILE_NAMESPACE.to_string()
                } else {
                    resolution.namespace
                };
                if seen.insert((namespace.clone(), resolution.path.clone())) {
                    pending.push(Pending {
                        path: resolution.path,
                        namespace,
                        importer: args.importer.clone(),
                        plugin_data: resolution.plugin_data,
                    });
                }
            }

            let loaded: Vec<_> = pending
                .par_iter()
                .map(|module| (module, self.load(module)))
                .collect();

            frontier = Vec::new();
            for (module, outcome) in loaded {
                let loaded = match outcome {
                    Ok(loaded) => loaded,
                    Err(messages) => {
                        result.errors.extend(messages);
                        continue;
                    }
                };
                result.warnings.extend(loaded.warnings);
                if !loaded.errors.is_empty() {
                    result.errors.extend(
                        loaded
                            .errors
                            .into_iter()
                            .map(|m| locate(m, &module.path)),
                    );
                    continue;
                }

                let output = loaded.module;
                for (specifier, kind) in scan_imports(&output.contents, output.loader) {
                    frontier.push(ResolveArgs {
                        path: specifier,
                        importer: output.path.clone(),
                        namespace: output.namespace.clone(),
                        resolve_dir: output.resolve_dir.clone(),
                        kind,
                        plugin_data: output.plugin_data.clone(),
                    });
                }
                result.modules.push(output);
            }
        }

        self.finish(result)
    }

    /// Run the dispose callbacks.
    pub fn dispose(&self) {
        for callback in &self.dispose {
            callback();
        }
    }

    fn finish(&self, mut result: BuildResult) -> BuildResult {
        for (plugin, callback) in &self.end {
            if let Err(err) = callback(&result) {
                result
                    .errors
                    .push(Message::new(err.to_string()).with_plugin(plugin));
            }
        }
        result
    }

    fn resolve(&self, args: &ResolveArgs) -> Result<Option<ResolveResult>, Message> {
        for hook in &self.resolvers {
            if !hook.options.filter.is_match(&args.path) {
                continue;
            }
            if let Some(namespace) = &hook.options.namespace {
                if namespace != &args.namespace {
                    continue;
                }
            }
            match (hook.callback)(args) {
                Ok(Some(mut resolution)) => {
                    for message in resolution.errors.iter_mut().chain(resolution.warnings.iter_mut()) {
                        if message.plugin_name.is_none() {
                            message.plugin_name = Some(hook.plugin.clone());
                        }
                    }
                    return Ok(Some(resolution));
                }
                Ok(None) => continue,
                Err(err) => {
                    return Err(Message::new(err.to_string())
                        .with_plugin(&hook.plugin)
                        .with_file(origin(args)))
                }
            }
        }

        default_resolve(args)
    }

    fn load(&self, module: &Pending) -> Result<Loaded, Vec<Message>> {
        let args = LoadArgs {
            path: module.path.clone(),
            namespace: module.namespace.clone(),
            plugin_data: module.plugin_data.clone(),
        };

        for hook in &self.loaders {
            if !hook.options.filter.is_match(&args.path) {
                continue;
            }
            if let Some(namespace) = &hook.options.namespace {
                if namespace != &args.namespace {
                    continue;
                }
            }
            match (hook.callback)(&args) {
                Ok(Some(mut result)) => {
                    for message in result.errors.iter_mut().chain(result.warnings.iter_mut()) {
                        if message.plugin_name.is_none() {
                            message.plugin_name = Some(hook.plugin.clone());
                        }
                    }
                    return Ok(Loaded::from_result(module, result));
                }
                Ok(None) => continue,
                Err(err) => {
                    return Err(vec![Message::new(err.to_string())
                        .with_plugin(&hook.plugin)
                        .with_location(&args.path, &args.namespace)])
                }
            }
        }

        default_load(module)
    }
}

struct Loaded {
    module: OutputModule,
    errors: Vec<Message>,
    warnings: Vec<Message>,
}

impl Loaded {
    fn from_result(module: &Pending, result: LoadResult) -> Self {
        let loader = result
            .loader
            .or_else(|| loader_for(&module.path))
            .unwrap_or(Loader::Js);
        let resolve_dir = result
            .resolve_dir
            .unwrap_or_else(|| parent_dir(&module.path));

        Self {
            module: OutputModule {
                path: module.path.clone(),
                namespace: module.namespace.clone(),
                loader,
                contents: result.contents.unwrap_or_default(),
                resolve_dir,
                plugin_data: result.plugin_data,
            },
            errors: result.errors,
            warnings: result.warnings,
        }
    }
}

/// Resolve an import no plugin claimed: relative and absolute paths land in
/// the `file` namespace, bare specifiers are external.
fn default_resolve(args: &ResolveArgs) -> Result<Option<ResolveResult>, Message> {
    let specifier = args.path.as_str();
    let is_relative = specifier.starts_with("./") || specifier.starts_with("../");
    if !is_relative && !Path::new(specifier).is_absolute() {
        debug!(path = %specifier, "treating bare import as external");
        return Ok(Some(ResolveResult {
            path: specifier.to_string(),
            external: true,
            ..Default::default()
        }));
    }

    Ok(Some(ResolveResult::new(
        path::absolutize(specifier, &args.resolve_dir),
        FILE_NAMESPACE,
    )))
}

/// Load a module no plugin claimed: only files on disk with a known loader.
fn default_load(module: &Pending) -> Result<Loaded, Vec<Message>> {
    let fail = |text: String| vec![Message::new(text).with_location(&module.path, &module.namespace)];

    if module.namespace != FILE_NAMESPACE {
        return Err(fail(format!(
            "no loader handled {} in namespace {}",
            module.path, module.namespace
        )));
    }
    let Some(loader) = loader_for(&module.path) else {
        return Err(fail(format!("no loader is configured for {}", module.path)));
    };
    let contents = std::fs::read_to_string(&module.path).map_err(|e| {
        warn!(path = %module.path, error = %e, "failed to read module");
        fail(format!("failed to read {}: {}", module.path, e))
    })?;

    Ok(Loaded::from_result(
        module,
        LoadResult::new(contents, loader),
    ))
}

fn loader_for(path: &str) -> Option<Loader> {
    Path::new(path)
        .extension()
        .and_then(|ext| Loader::from_extension(&ext.to_string_lossy()))
}

fn parent_dir(path: &str) -> PathBuf {
    Path::new(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// The file an import failure is reported against.
fn origin(args: &ResolveArgs) -> &str {
    if args.importer.is_empty() {
        &args.path
    } else {
        &args.importer
    }
}

fn locate(mut message: Message, file: &str) -> Message {
    if message.location.is_none() {
        message = message.with_file(file);
    }
    message
}

/// Registration surface bound to one plugin.
struct Registrar<'a> {
    build: &'a mut Build,
    plugin: String,
}

impl PluginBuild for Registrar<'_> {
    fn initial_options(&self) -> &BuildOptions {
        &self.build.options
    }

    fn initial_options_mut(&mut self) -> &mut BuildOptions {
        &mut self.build.options
    }

    fn on_start(&mut self, callback: StartCallback) {
        self.build.start.push((self.plugin.clone(), callback));
    }

    fn on_resolve(&mut self, options: OnResolveOptions, callback: ResolveCallback) {
        self.build.resolvers.push(ResolveHook {
            plugin: self.plugin.clone(),
            options,
            callback,
        });
    }

    fn on_load(&mut self, options: OnLoadOptions, callback: LoadCallback) {
        self.build.loaders.push(LoadHook {
            plugin: self.plugin.clone(),
            options,
            callback,
        });
    }

    fn on_end(&mut self, callback: EndCallback) {
        self.build.end.push((self.plugin.clone(), callback));
    }

    fn on_dispose(&mut self, callback: DisposeCallback) {
        self.build.dispose.push(callback);
    }
}
