//! Plugin hook types and the registration surface.

use crate::build::BuildResult;
use crate::message::Message;
use crate::options::BuildOptions;
use regex::Regex;
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Opaque data a plugin threads from one hook to the next.
///
/// Data returned by a resolve hook is handed to the load hook of the same
/// module; data returned by a load hook is handed to the resolve hooks of
/// that module's imports.
pub type PluginData = Arc<dyn Any + Send + Sync>;

/// Called when a build starts.
pub type StartCallback = Box<dyn Fn(&BuildOptions) -> miette::Result<()> + Send + Sync>;
/// Called for every import whose path matches the hook filter.
/// `Ok(None)` passes the import on to the next hook.
pub type ResolveCallback =
    Box<dyn Fn(&ResolveArgs) -> miette::Result<Option<ResolveResult>> + Send + Sync>;
/// Called for every resolved module whose path matches the hook filter.
/// `Ok(None)` passes the module on to the next hook.
pub type LoadCallback = Box<dyn Fn(&LoadArgs) -> miette::Result<Option<LoadResult>> + Send + Sync>;
/// Called when a build ends.
pub type EndCallback = Box<dyn Fn(&BuildResult) -> miette::Result<()> + Send + Sync>;
/// Called when the host is disposed.
pub type DisposeCallback = Box<dyn Fn() + Send + Sync>;

/// How a module's contents are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
    Css,
    Json,
    Text,
}

impl Loader {
    /// Get the loader name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Jsx => "jsx",
            Self::Ts => "ts",
            Self::Tsx => "tsx",
            Self::Css => "css",
            Self::Json => "json",
            Self::Text => "text",
        }
    }

    /// Infer the loader from a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" => Some(Self::Js),
            "jsx" => Some(Self::Jsx),
            "ts" | "mts" | "cts" => Some(Self::Ts),
            "tsx" => Some(Self::Tsx),
            "css" => Some(Self::Css),
            "json" => Some(Self::Json),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// Whether the contents are JavaScript-like source.
    pub fn is_script(&self) -> bool {
        matches!(self, Self::Js | Self::Jsx | Self::Ts | Self::Tsx)
    }
}

/// How a path was imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportKind {
    /// An entry point of the build.
    #[default]
    EntryPoint,
    /// A static `import`/`export ... from` statement.
    ImportStatement,
    /// A CSS `@import` rule.
    ImportRule,
}

/// Filter of a resolve hook.
#[derive(Debug, Clone)]
pub struct OnResolveOptions {
    /// Regex matched against the imported path.
    pub filter: Regex,
    /// Only run for imports from modules in this namespace.
    pub namespace: Option<String>,
}

impl OnResolveOptions {
    /// Create options with a path filter.
    pub fn new(filter: Regex) -> Self {
        Self {
            filter,
            namespace: None,
        }
    }

    /// Restrict the hook to a namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Filter of a load hook.
#[derive(Debug, Clone)]
pub struct OnLoadOptions {
    /// Regex matched against the resolved path.
    pub filter: Regex,
    /// Only run for modules in this namespace.
    pub namespace: Option<String>,
}

impl OnLoadOptions {
    /// Create options with a path filter.
    pub fn new(filter: Regex) -> Self {
        Self {
            filter,
            namespace: None,
        }
    }

    /// Restrict the hook to a namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Arguments of a resolve hook.
#[derive(Clone, Default)]
pub struct ResolveArgs {
    /// The imported path, as written.
    pub path: String,
    /// Path of the importing module (empty for entry points).
    pub importer: String,
    /// Namespace of the importing module.
    pub namespace: String,
    /// Directory relative imports resolve against.
    pub resolve_dir: PathBuf,
    /// How the path was imported.
    pub kind: ImportKind,
    /// Data returned by the importer's load hook.
    pub plugin_data: Option<PluginData>,
}

/// Result of a resolve hook.
#[derive(Clone, Default)]
pub struct ResolveResult {
    /// The resolved path.
    pub path: String,
    /// Namespace of the resolved module (`file` when empty).
    pub namespace: String,
    /// Leave the import out of the bundle.
    pub external: bool,
    /// Data handed to the load hook.
    pub plugin_data: Option<PluginData>,
    /// Errors; a non-empty list fails the import.
    pub errors: Vec<Message>,
    /// Warnings.
    pub warnings: Vec<Message>,
}

impl ResolveResult {
    /// Resolve to a path in a namespace.
    pub fn new(path: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Fail the import with an error.
    pub fn failed(error: Message) -> Self {
        Self {
            errors: vec![error],
            ..Default::default()
        }
    }

    /// Attach plugin data.
    pub fn with_plugin_data(mut self, data: PluginData) -> Self {
        self.plugin_data = Some(data);
        self
    }
}

/// Arguments of a load hook.
#[derive(Clone, Default)]
pub struct LoadArgs {
    /// The resolved path.
    pub path: String,
    /// Namespace of the module.
    pub namespace: String,
    /// Data returned by the resolve hook.
    pub plugin_data: Option<PluginData>,
}

/// Result of a load hook.
#[derive(Clone, Default)]
pub struct LoadResult {
    /// The module contents.
    pub contents: Option<String>,
    /// How to interpret the contents.
    pub loader: Option<Loader>,
    /// Directory the module's imports resolve against.
    pub resolve_dir: Option<PathBuf>,
    /// Data handed to the resolve hooks of this module's imports.
    pub plugin_data: Option<PluginData>,
    /// Errors; a non-empty list fails the module.
    pub errors: Vec<Message>,
    /// Warnings.
    pub warnings: Vec<Message>,
}

impl LoadResult {
    /// Load contents with a loader.
    pub fn new(contents: impl Into<String>, loader: Loader) -> Self {
        Self {
            contents: Some(contents.into()),
            loader: Some(loader),
            ..Default::default()
        }
    }

    /// Fail the module with an error.
    pub fn failed(error: Message) -> Self {
        Self {
            errors: vec![error],
            ..Default::default()
        }
    }
}

impl fmt::Debug for ResolveArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveArgs")
            .field("path", &self.path)
            .field("importer", &self.importer)
            .field("namespace", &self.namespace)
            .field("resolve_dir", &self.resolve_dir)
            .field("kind", &self.kind)
            .field("has_plugin_data", &self.plugin_data.is_some())
            .finish()
    }
}

impl fmt::Debug for ResolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveResult")
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .field("external", &self.external)
            .field("has_plugin_data", &self.plugin_data.is_some())
            .field("errors", &self.errors)
            .field("warnings", &self.warnings)
            .finish()
    }
}

impl fmt::Debug for LoadArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadArgs")
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .field("has_plugin_data", &self.plugin_data.is_some())
            .finish()
    }
}

impl fmt::Debug for LoadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadResult")
            .field("contents", &self.contents)
            .field("loader", &self.loader)
            .field("resolve_dir", &self.resolve_dir)
            .field("has_plugin_data", &self.plugin_data.is_some())
            .field("errors", &self.errors)
            .field("warnings", &self.warnings)
            .finish()
    }
}

/// The registration surface a plugin sees during setup.
pub trait PluginBuild {
    /// Options of the build.
    fn initial_options(&self) -> &BuildOptions;

    /// Mutable options of the build; changes are visible to later plugins.
    fn initial_options_mut(&mut self) -> &mut BuildOptions;

    /// Register a start callback.
    fn on_start(&mut self, callback: StartCallback);

    /// Register a resolve callback.
    fn on_resolve(&mut self, options: OnResolveOptions, callback: ResolveCallback);

    /// Register a load callback.
    fn on_load(&mut self, options: OnLoadOptions, callback: LoadCallback);

    /// Register an end callback.
    fn on_end(&mut self, callback: EndCallback);

    /// Register a dispose callback.
    fn on_dispose(&mut self, callback: DisposeCallback);
}

/// A named plugin with its setup function.
pub struct Plugin {
    name: String,
    setup: Box<dyn FnOnce(&mut dyn PluginBuild) + Send>,
}

impl Plugin {
    /// Create a plugin.
    pub fn new(
        name: impl Into<String>,
        setup: impl FnOnce(&mut dyn PluginBuild) + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            setup: Box::new(setup),
        }
    }

    /// The plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the plugin's setup against a host.
    pub fn setup(self, build: &mut dyn PluginBuild) {
        (self.setup)(build)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name).finish()
    }
}
