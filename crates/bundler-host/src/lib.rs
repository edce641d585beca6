//! Bundler plugin hook contract.
//!
//! This crate describes the surface a bundler exposes to its plugins:
//! - Build options shared with every plugin at setup time
//! - Resolve and load callbacks filtered by path regex and namespace
//! - Start, end and dispose lifecycle callbacks
//!
//! It also ships [`Build`], a small in-memory host that drives the
//! resolve/load cycle over a module graph. It is what the command-line
//! driver and the plugin tests run against.

pub mod build;
pub mod hooks;
pub mod message;
pub mod options;
pub mod path;
mod scan;

pub use build::{Build, BuildResult, OutputModule};
pub use hooks::{
    DisposeCallback, EndCallback, ImportKind, LoadArgs, LoadCallback, LoadResult, Loader,
    OnLoadOptions, OnResolveOptions, Plugin, PluginBuild, PluginData, ResolveArgs,
    ResolveCallback, ResolveResult, StartCallback,
};
pub use message::{Location, Message};
pub use options::{BuildOptions, SourceMapMode};

/// The namespace of modules that live on disk.
pub const FILE_NAMESPACE: &str = "file";
