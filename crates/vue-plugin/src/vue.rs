//! Component resolution and loading.

use crate::component::{CompiledComponent, ComponentIdentity};
use crate::error::{PluginError, PluginResult};
use crate::services::{compile_sfc, CompileOptions};
use crate::synth::generate_entry_module;
use crate::virtual_path::{PartKind, PartRef, SCRIPT_NAMESPACE, STYLE_NAMESPACE, TEMPLATE_NAMESPACE};
use crate::{parent_dir, Shared};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bundler_host::path::{absolutize, relative_to, to_posix};
use bundler_host::{
    LoadArgs, LoadResult, Loader, Message, OnLoadOptions, OnResolveOptions, PluginBuild,
    PluginData, ResolveArgs, ResolveResult, FILE_NAMESPACE,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

static RESOLVE_FILTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.vue(\?.*)?$").expect("valid component resolve filter"));
static LOAD_FILTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.vue$").expect("valid component load filter"));
static ANY: Lazy<Regex> = Lazy::new(|| Regex::new(r".*").expect("valid catch-all filter"));

const SOURCE_MAP_PREFIX: &str = "\n\n//# sourceMappingURL=data:application/json;charset=utf-8;base64,";

/// A compiled component, handed from the entry load to its sub-modules.
#[derive(Debug)]
pub(crate) struct ComponentData {
    /// Path of the component file.
    pub(crate) owner: String,
    pub(crate) identity: ComponentIdentity,
    pub(crate) component: CompiledComponent,
}

/// The component and part a sub-module path resolved to.
#[derive(Debug)]
pub(crate) struct PartData {
    pub(crate) component: Arc<ComponentData>,
    pub(crate) part: PartRef,
}

pub(crate) fn register(shared: &Arc<Shared>, build: &mut dyn PluginBuild) {
    let state = Arc::clone(shared);
    build.on_resolve(
        OnResolveOptions::new(RESOLVE_FILTER.clone()),
        Box::new(move |args| {
            resolve(&state, args)
                .map(Some)
                .map_err(|err| report(err, &args.path, "failed to resolve component"))
        }),
    );

    let state = Arc::clone(shared);
    build.on_load(
        OnLoadOptions::new(LOAD_FILTER.clone()).namespace(FILE_NAMESPACE),
        Box::new(move |args| {
            load_component(&state, args)
                .map(Some)
                .map_err(|err| report(err, &args.path, "failed to compile component"))
        }),
    );

    let state = Arc::clone(shared);
    build.on_load(
        OnLoadOptions::new(ANY.clone()).namespace(SCRIPT_NAMESPACE),
        Box::new(move |args| {
            load_script(&state, args)
                .map(Some)
                .map_err(|err| report(err, &args.path, "failed to load component script"))
        }),
    );

    build.on_load(
        OnLoadOptions::new(ANY.clone()).namespace(TEMPLATE_NAMESPACE),
        Box::new(|args| {
            load_template(args)
                .map(Some)
                .map_err(|err| report(err, &args.path, "failed to load component template"))
        }),
    );

    build.on_load(
        OnLoadOptions::new(ANY.clone()).namespace(STYLE_NAMESPACE),
        Box::new(|args| {
            load_style(args)
                .map(Some)
                .map_err(|err| report(err, &args.path, "failed to load component style"))
        }),
    );
}

fn report(err: PluginError, path: &str, what: &str) -> miette::Report {
    error!(file = %path, error = %err, "{}", what);
    miette::Report::new(err)
}

/// Resolve a component or one of its sub-modules.
pub(crate) fn resolve(shared: &Shared, args: &ResolveArgs) -> PluginResult<ResolveResult> {
    let path = absolutize(&shared.aliases().apply(&args.path), &args.resolve_dir);
    let args = ResolveArgs {
        path: path.clone(),
        ..args.clone()
    };

    if let Some(result) = shared
        .options
        .on_vue_resolve
        .first_some(|processor| processor(&args, &shared.build))
        .map_err(PluginError::transform("component resolve"))?
    {
        return Ok(result);
    }

    let Some((owner, part)) = PartRef::parse(&path)?.map(|(owner, part)| (owner.to_string(), part))
    else {
        return Ok(ResolveResult::new(path, FILE_NAMESPACE));
    };

    let component = importer_component(args.plugin_data.as_ref())
        .filter(|data| to_posix(&data.owner) == to_posix(&owner))
        .ok_or_else(|| PluginError::MissingComponent { path: path.clone() })?;

    debug!(path = %path, part = %part, id = %component.identity, "resolved component part");
    Ok(ResolveResult::new(path, part.kind.namespace())
        .with_plugin_data(Arc::new(PartData { component, part })))
}

/// The component that imported a sub-module, carried by the importer's
/// plugin data.
fn importer_component(data: Option<&PluginData>) -> Option<Arc<ComponentData>> {
    match Arc::clone(data?).downcast::<ComponentData>() {
        Ok(component) => Some(component),
        Err(data) => data
            .downcast::<PartData>()
            .ok()
            .map(|part| Arc::clone(&part.component)),
    }
}

fn part_data(args: &LoadArgs, kind: PartKind) -> PluginResult<Arc<PartData>> {
    args.plugin_data
        .clone()
        .and_then(|data| data.downcast::<PartData>().ok())
        .filter(|data| data.part.kind == kind)
        .ok_or_else(|| PluginError::MissingComponent {
            path: args.path.clone(),
        })
}

/// Compile a component file into its entry module.
pub(crate) fn load_component(shared: &Shared, args: &LoadArgs) -> PluginResult<LoadResult> {
    let raw = std::fs::read(&args.path).map_err(|e| PluginError::io(&args.path, e))?;
    let source = shared
        .options
        .on_vue_load
        .fold(decode_source(&raw), |processor, source| {
            processor(source, args, &shared.build)
        })
        .map_err(PluginError::transform("component load"))?;

    let identity = ComponentIdentity::of(&source);
    let owner = to_posix(&args.path);
    let options = CompileOptions {
        source_map: shared.build.sourcemap.is_enabled(),
        is_prod: shared.mode.is_prod,
        is_ssr: shared.mode.is_ssr,
        preprocess_options: shared.options.style_preprocessor_options.clone(),
        compiler_options: shared.options.template_compiler_options.clone(),
    };
    let component = compile_sfc(shared.executor(), identity, &owner, &source, &options)?;
    let file = relative_file(&args.path, &shared.build.working_dir());
    let contents = generate_entry_module(&owner, &file, identity, shared.mode.is_ssr, &component);
    debug!(path = %args.path, id = %identity, styles = component.styles.len(), "compiled component");

    let warnings = component
        .script
        .iter()
        .flat_map(|script| &script.warnings)
        .map(|warning| Message::new(warning.as_str()).with_file(&args.path))
        .collect();

    Ok(LoadResult {
        contents: Some(contents),
        loader: Some(Loader::Js),
        resolve_dir: Some(parent_dir(&args.path)),
        plugin_data: Some(Arc::new(ComponentData {
            owner: args.path.clone(),
            identity,
            component,
        })),
        errors: Vec::new(),
        warnings,
    })
}

/// Component text with line endings normalized. Bytes that are not UTF-8
/// become U+FFFD so a stray legacy encoding still compiles.
fn decode_source(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace("\r\n", "\n")
}

/// The `__file` value: relative to the working directory when possible.
fn relative_file(path: &str, working_dir: &Path) -> String {
    match relative_to(Path::new(path), working_dir) {
        Some(relative) => to_posix(&relative.to_string_lossy()),
        None => to_posix(path),
    }
}

/// A sub-module result: resolves against the component's directory and
/// keeps the component reachable for its own imports.
fn part_result(data: &PartData, contents: String, loader: Loader) -> LoadResult {
    let component: PluginData = data.component.clone();
    LoadResult {
        resolve_dir: Some(parent_dir(&data.component.owner)),
        plugin_data: Some(component),
        ..LoadResult::new(contents, loader)
    }
}

fn missing(data: &PartData) -> PluginError {
    PluginError::MissingPart {
        owner: data.component.owner.clone(),
        part: data.part.to_string(),
    }
}

pub(crate) fn load_script(shared: &Shared, args: &LoadArgs) -> PluginResult<LoadResult> {
    let data = part_data(args, PartKind::Script)?;
    let script = data
        .component
        .component
        .script
        .as_ref()
        .ok_or_else(|| missing(&data))?;

    let mut contents = script.content.clone();
    if shared.build.sourcemap.is_enabled() {
        if let Some(map) = &script.map {
            contents.push_str(&inline_source_map(map)?);
        }
    }
    Ok(part_result(&data, contents, script.lang().loader()))
}

pub(crate) fn load_template(args: &LoadArgs) -> PluginResult<LoadResult> {
    let data = part_data(args, PartKind::Template)?;
    let template = data
        .component
        .component
        .template
        .as_ref()
        .ok_or_else(|| missing(&data))?;

    let owner = &data.component.owner;
    let mut result = part_result(&data, template.code.clone(), Loader::Ts);
    result.warnings = messages(&template.tips, owner);
    result.errors = messages(&template.errors, owner);
    Ok(result)
}

pub(crate) fn load_style(args: &LoadArgs) -> PluginResult<LoadResult> {
    let data = part_data(args, PartKind::Style)?;
    let style = data
        .part
        .index
        .and_then(|index| data.component.component.styles.get(index))
        .ok_or_else(|| missing(&data))?;

    let mut result = part_result(&data, style.code.clone(), Loader::Css);
    result.errors = messages(&style.errors, &data.component.owner);
    Ok(result)
}

fn messages(texts: &[String], file: &str) -> Vec<Message> {
    texts
        .iter()
        .map(|text| Message::new(text.as_str()).with_file(file))
        .collect()
}

/// The comment that inlines a source map into a script.
fn inline_source_map(map: &Value) -> PluginResult<String> {
    let json = serde_json::to_vec(map)
        .map_err(|e| PluginError::Config(format!("invalid source map: {e}")))?;
    Ok(format!("{SOURCE_MAP_PREFIX}{}", STANDARD.encode(json)))
}
