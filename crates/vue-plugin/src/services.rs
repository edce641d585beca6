//! Typed calls to the compiler's guest services.

use crate::component::{CompiledComponent, ComponentIdentity};
use crate::error::{PluginError, PluginResult};
use js_engine::{services, JsRequest, ServiceExecutor};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Options of the component compile service.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    /// Compute source maps.
    pub source_map: bool,
    /// Production code generation.
    pub is_prod: bool,
    /// Server-side render code generation.
    #[serde(rename = "isSSR")]
    pub is_ssr: bool,
    /// Passed through to style preprocessing.
    pub preprocess_options: Value,
    /// Passed through to template compilation.
    pub compiler_options: Value,
}

/// Compile one component.
///
/// `path` must already be in POSIX form; the compiler embeds it in the
/// generated code.
pub fn compile_sfc(
    executor: &dyn ServiceExecutor,
    identity: ComponentIdentity,
    path: &str,
    source: &str,
    options: &CompileOptions,
) -> PluginResult<CompiledComponent> {
    let options = serde_json::to_value(options)
        .map_err(|e| PluginError::Config(format!("invalid compile options: {e}")))?;
    let request = JsRequest::new(
        services::COMPILE_SFC,
        vec![
            Value::String(identity.hash_id()),
            Value::String(path.to_string()),
            Value::String(source.to_string()),
            options,
        ],
    );
    debug!(id = %request.id, path, "compiling component");

    let response = executor
        .execute(request)
        .map_err(|source| PluginError::Compile { source })?;
    CompiledComponent::decode(response.result)
}

/// Output formatting of rendered CSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

#[derive(Serialize)]
struct StyleRenderOptions<'a> {
    data: &'a str,
    sasslocation: String,
    #[serde(rename = "sourceMap")]
    source_map: bool,
    style: OutputStyle,
}

/// Output of the style render service.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRenderResult {
    /// The rendered CSS.
    pub css: String,
    /// Source map, when one was requested.
    pub map: Option<Value>,
    /// Render statistics.
    pub stats: Value,
}

/// Render a Sass/SCSS stylesheet. Relative `@import`s resolve against
/// `location`.
pub fn render_style(
    executor: &dyn ServiceExecutor,
    source: &str,
    location: &Path,
    source_map: bool,
    style: OutputStyle,
) -> PluginResult<StyleRenderResult> {
    let options = StyleRenderOptions {
        data: source,
        sasslocation: location.to_string_lossy().into_owned(),
        source_map,
        style,
    };
    let options = serde_json::to_value(&options)
        .map_err(|e| PluginError::Config(format!("invalid style options: {e}")))?;
    let request = JsRequest::new(services::SASS_RENDER_SYNC, vec![options]);
    debug!(id = %request.id, location = %location.display(), "rendering stylesheet");

    let response = executor
        .execute(request)
        .map_err(|source| PluginError::Service {
            service: "sass",
            source,
        })?;

    let malformed = |reason: &str| PluginError::MalformedResponse {
        service: services::SASS_RENDER_SYNC,
        reason: reason.to_string(),
    };
    let Value::Object(mut result) = response.result else {
        return Err(malformed("invalid response from sass compilation service"));
    };
    let Some(Value::String(css)) = result.remove("css") else {
        return Err(malformed("failed to extract CSS from compilation result"));
    };

    Ok(StyleRenderResult {
        css,
        map: result.remove("map").filter(|m| !m.is_null()),
        stats: result.remove("stats").unwrap_or(Value::Null),
    })
}
