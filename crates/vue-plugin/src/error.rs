//! Plugin error types.

use js_engine::EngineError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by user processors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// An error raised while compiling or serving a component.
#[derive(Debug, Error, Diagnostic)]
pub enum PluginError {
    /// The compile service rejected the component.
    #[error("Vue SFC compilation failed: {source}")]
    #[diagnostic(code(vue_plugin::compile))]
    Compile {
        #[source]
        source: EngineError,
    },

    /// A service call failed before it produced a result.
    #[error("{service} compilation service failed: {source}")]
    #[diagnostic(code(vue_plugin::service))]
    Service {
        service: &'static str,
        #[source]
        source: EngineError,
    },

    /// A service returned something other than the expected shape.
    #[error("{reason}")]
    #[diagnostic(code(vue_plugin::malformed_response))]
    MalformedResponse { service: &'static str, reason: String },

    /// A sub-resource that the compiled component does not have.
    #[error("component {owner} has no {part}")]
    #[diagnostic(code(vue_plugin::missing_part))]
    MissingPart { owner: String, part: String },

    /// A sub-resource import without the component it belongs to.
    #[error("no compiled component is available for {path}")]
    #[diagnostic(
        code(vue_plugin::missing_component),
        help("component parts can only be imported from the module generated for their component")
    )]
    MissingComponent { path: String },

    /// A sub-resource path with a bad `type` or `index` parameter.
    #[error("invalid component part `{path}`: {reason}")]
    #[diagnostic(code(vue_plugin::invalid_part))]
    InvalidPart { path: String, reason: String },

    /// A user processor failed.
    #[error("{stage} processor failed: {source}")]
    #[diagnostic(code(vue_plugin::processor))]
    Transform {
        stage: &'static str,
        #[source]
        source: BoxError,
    },

    /// A file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    #[diagnostic(code(vue_plugin::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid plugin or build configuration.
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(vue_plugin::config))]
    Config(String),

    /// The plugin was built without an executor.
    #[error("a JavaScript executor is required")]
    #[diagnostic(
        code(vue_plugin::missing_executor),
        help("pass one to `VuePluginBuilder::executor` before calling `build`")
    )]
    MissingExecutor,
}

impl PluginError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transform(stage: &'static str) -> impl FnOnce(BoxError) -> Self {
        move |source| Self::Transform { stage, source }
    }
}
