//! Plugin configuration.

use crate::error::{BoxError, PluginError, PluginResult};
use crate::pipeline::Chain;
use crate::VuePlugin;
use bundler_host::{BuildOptions, BuildResult, LoadArgs, ResolveArgs, ResolveResult};
use js_engine::ServiceExecutor;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Runs when a build starts. An error aborts the build.
pub type OnStartProcessor = Arc<dyn Fn(&BuildOptions) -> Result<(), BoxError> + Send + Sync>;

/// Custom component resolution. `Some` ends the chain and is used as is.
pub type OnVueResolveProcessor = Arc<
    dyn Fn(&ResolveArgs, &BuildOptions) -> Result<Option<ResolveResult>, BoxError> + Send + Sync,
>;

/// Transforms component source before compilation.
pub type OnVueLoadProcessor =
    Arc<dyn Fn(String, &LoadArgs, &BuildOptions) -> Result<String, BoxError> + Send + Sync>;

/// Supplies stylesheet source instead of reading it from disk.
/// `None` (or empty content) defers to the next processor.
pub type OnStyleLoadProcessor =
    Arc<dyn Fn(&LoadArgs, &BuildOptions) -> Result<Option<String>, BoxError> + Send + Sync>;

/// Runs when a build ends.
pub type OnEndProcessor =
    Arc<dyn Fn(&BuildResult, &BuildOptions) -> Result<(), BoxError> + Send + Sync>;

/// Best-effort cleanup when the host is disposed.
pub type OnDisposeProcessor = Arc<dyn Fn(&BuildOptions) + Send + Sync>;

/// Options of the Vue plugin.
#[derive(Clone)]
pub struct VuePluginOptions {
    /// Plugin name, used in diagnostics.
    pub name: String,
    /// Executor serving the compiler's services.
    pub executor: Arc<dyn ServiceExecutor>,
    /// Passed through to template compilation.
    pub template_compiler_options: Value,
    /// Passed through to style preprocessing.
    pub style_preprocessor_options: Value,
    pub on_start: Chain<OnStartProcessor>,
    pub on_vue_resolve: Chain<OnVueResolveProcessor>,
    pub on_vue_load: Chain<OnVueLoadProcessor>,
    pub on_style_load: Chain<OnStyleLoadProcessor>,
    pub on_end: Chain<OnEndProcessor>,
    pub on_dispose: Chain<OnDisposeProcessor>,
}

impl fmt::Debug for VuePluginOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VuePluginOptions")
            .field("name", &self.name)
            .field("template_compiler_options", &self.template_compiler_options)
            .field("style_preprocessor_options", &self.style_preprocessor_options)
            .field("on_start", &self.on_start)
            .field("on_vue_resolve", &self.on_vue_resolve)
            .field("on_vue_load", &self.on_vue_load)
            .field("on_style_load", &self.on_style_load)
            .field("on_end", &self.on_end)
            .field("on_dispose", &self.on_dispose)
            .finish_non_exhaustive()
    }
}

/// Builder for [`VuePlugin`].
#[derive(Default)]
pub struct VuePluginBuilder {
    name: Option<String>,
    executor: Option<Arc<dyn ServiceExecutor>>,
    template_compiler_options: Option<Value>,
    style_preprocessor_options: Option<Value>,
    on_start: Chain<OnStartProcessor>,
    on_vue_resolve: Chain<OnVueResolveProcessor>,
    on_vue_load: Chain<OnVueLoadProcessor>,
    on_style_load: Chain<OnStyleLoadProcessor>,
    on_end: Chain<OnEndProcessor>,
    on_dispose: Chain<OnDisposeProcessor>,
}

impl VuePluginBuilder {
    /// Set the plugin name (default `vue-plugin`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the executor serving the compiler. Required.
    pub fn executor(mut self, executor: Arc<dyn ServiceExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Options passed through to template compilation, such as
    /// `compilerOptions` or `transformAssetUrls`.
    pub fn template_compiler_options(mut self, options: Value) -> Self {
        self.template_compiler_options = Some(options);
        self
    }

    /// Options passed through to style preprocessing, such as
    /// `includePaths` or `outputStyle`.
    pub fn style_preprocessor_options(mut self, options: Value) -> Self {
        self.style_preprocessor_options = Some(options);
        self
    }

    pub fn on_start(
        mut self,
        processor: impl Fn(&BuildOptions) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.on_start.push(Arc::new(processor));
        self
    }

    pub fn on_vue_resolve(
        mut self,
        processor: impl Fn(&ResolveArgs, &BuildOptions) -> Result<Option<ResolveResult>, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_vue_resolve.push(Arc::new(processor));
        self
    }

    pub fn on_vue_load(
        mut self,
        processor: impl Fn(String, &LoadArgs, &BuildOptions) -> Result<String, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_vue_load.push(Arc::new(processor));
        self
    }

    pub fn on_style_load(
        mut self,
        processor: impl Fn(&LoadArgs, &BuildOptions) -> Result<Option<String>, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_style_load.push(Arc::new(processor));
        self
    }

    pub fn on_end(
        mut self,
        processor: impl Fn(&BuildResult, &BuildOptions) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.on_end.push(Arc::new(processor));
        self
    }

    pub fn on_dispose(mut self, processor: impl Fn(&BuildOptions) + Send + Sync + 'static) -> Self {
        self.on_dispose.push(Arc::new(processor));
        self
    }

    /// Finish the configuration.
    pub fn build(self) -> PluginResult<VuePlugin> {
        let executor = self.executor.ok_or(PluginError::MissingExecutor)?;
        let object = |value: Option<Value>, what: &str| match value {
            None => Ok(Value::Object(Default::default())),
            Some(value @ Value::Object(_)) => Ok(value),
            Some(other) => Err(PluginError::Config(format!(
                "{what} must be an object, got {other}"
            ))),
        };

        Ok(VuePlugin::new(VuePluginOptions {
            name: self.name.unwrap_or_else(|| "vue-plugin".to_string()),
            executor,
            template_compiler_options: object(
                self.template_compiler_options,
                "template compiler options",
            )?,
            style_preprocessor_options: object(
                self.style_preprocessor_options,
                "style preprocessor options",
            )?,
            on_start: self.on_start,
            on_vue_resolve: self.on_vue_resolve,
            on_vue_load: self.on_vue_load,
            on_style_load: self.on_style_load,
            on_end: self.on_end,
            on_dispose: self.on_dispose,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExecutor;
    use serde_json::json;

    #[test]
    fn test_executor_is_required() {
        let err = VuePlugin::builder().build().unwrap_err();
        assert!(matches!(err, PluginError::MissingExecutor));
    }

    #[test]
    fn test_defaults() {
        let plugin = VuePlugin::builder()
            .executor(Arc::new(MockExecutor::new()))
            .build()
            .unwrap();
        let options = plugin.options();
        assert_eq!(options.name, "vue-plugin");
        assert_eq!(options.template_compiler_options, json!({}));
        assert_eq!(options.style_preprocessor_options, json!({}));
        assert!(options.on_vue_load.is_empty());
    }

    #[test]
    fn test_processors_accumulate_in_order() {
        let plugin = VuePlugin::builder()
            .name("vue")
            .executor(Arc::new(MockExecutor::new()))
            .on_vue_load(|source, _, _| Ok(source))
            .on_vue_load(|source, _, _| Ok(source.to_uppercase()))
            .on_style_load(|_, _| Ok(None))
            .on_dispose(|_| {})
            .build()
            .unwrap();
        let options = plugin.options();
        assert_eq!(options.name, "vue");
        assert_eq!(options.on_vue_load.len(), 2);
        assert_eq!(options.on_style_load.len(), 1);
        assert_eq!(options.on_dispose.len(), 1);
    }

    #[test]
    fn test_pass_through_options_must_be_objects() {
        let err = VuePlugin::builder()
            .executor(Arc::new(MockExecutor::new()))
            .template_compiler_options(json!([1, 2]))
            .build()
            .unwrap_err();
        assert!(matches!(err, PluginError::Config(_)));
    }
}
