//! Standalone Sass/SCSS stylesheets.

use crate::error::{PluginError, PluginResult};
use crate::services::{render_style, OutputStyle};
use crate::{parent_dir, Shared};
use bundler_host::path::absolutize;
use bundler_host::{
    LoadArgs, LoadResult, Loader, OnLoadOptions, OnResolveOptions, PluginBuild, ResolveArgs,
    ResolveResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error};

/// Namespace stylesheets load in.
pub const STYLE_LOADER_NAMESPACE: &str = "sass-loader";

static FILTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.s[ac]ss$").expect("valid stylesheet filter"));

pub(crate) fn register(shared: &Arc<Shared>, build: &mut dyn PluginBuild) {
    let state = Arc::clone(shared);
    build.on_resolve(
        OnResolveOptions::new(FILTER.clone()),
        Box::new(move |args| Ok(Some(resolve(&state, args)))),
    );

    let state = Arc::clone(shared);
    build.on_load(
        OnLoadOptions::new(FILTER.clone()).namespace(STYLE_LOADER_NAMESPACE),
        Box::new(move |args| {
            load(&state, args).map(Some).map_err(|err| {
                error!(file = %args.path, error = %err, "failed to render stylesheet");
                miette::Report::new(err)
            })
        }),
    );
}

pub(crate) fn resolve(shared: &Shared, args: &ResolveArgs) -> ResolveResult {
    let path = absolutize(&shared.aliases().apply(&args.path), &args.resolve_dir);
    ResolveResult::new(path, STYLE_LOADER_NAMESPACE)
}

/// The stylesheet source: the first processor that supplies content wins,
/// otherwise the file is read from disk.
pub(crate) fn read_source(shared: &Shared, args: &LoadArgs) -> PluginResult<String> {
    let supplied = shared
        .options
        .on_style_load
        .first_some(|processor| {
            processor(args, &shared.build).map(|source| source.filter(|s| !s.is_empty()))
        })
        .map_err(PluginError::transform("stylesheet load"))?;

    match supplied {
        Some(source) => Ok(source),
        None => std::fs::read_to_string(&args.path).map_err(|e| PluginError::io(&args.path, e)),
    }
}

pub(crate) fn load(shared: &Shared, args: &LoadArgs) -> PluginResult<LoadResult> {
    let source = read_source(shared, args)?;
    let location = parent_dir(&args.path);
    let rendered = render_style(
        shared.executor(),
        &source,
        &location,
        false,
        OutputStyle::Expanded,
    )?;
    debug!(path = %args.path, bytes = rendered.css.len(), "rendered stylesheet");

    Ok(LoadResult {
        resolve_dir: Some(location),
        ..LoadResult::new(rendered.css, Loader::Css)
    })
}
