//! Vue single-file component plugin.
//!
//! The plugin compiles `.vue` files through a compiler running in an
//! embedded engine (see the `js-engine` crate) and splits each component
//! into virtual sub-modules the bundler can resolve and load:
//!
//! ```text
//! App.vue ──load──▶ entry module
//!                    ├─ import App.vue?type=script          (sfc-script)
//!                    ├─ import App.vue?type=style&index=0   (sfc-style)
//!                    └─ import App.vue?type=template        (sfc-template)
//! ```
//!
//! The compiled component travels from the entry load to the sub-module
//! loads as plugin data, so nothing is cached across files or builds.
//! Standalone `.scss`/`.sass` files are rendered to CSS by the same engine.

pub mod component;
pub mod env;
pub mod error;
pub mod options;
pub mod path_alias;
pub mod pipeline;
pub mod processors;
pub mod services;
mod style;
pub mod synth;
pub mod virtual_path;
mod vue;

#[cfg(test)]
pub(crate) mod testing;

pub use component::{
    CompiledComponent, ComponentIdentity, ScriptLang, ScriptPart, StylePart, TemplatePart,
};
pub use env::{import_meta_env, normalize_build_options, BuildMode};
pub use error::{BoxError, PluginError, PluginResult};
pub use options::{
    OnDisposeProcessor, OnEndProcessor, OnStartProcessor, OnStyleLoadProcessor,
    OnVueLoadProcessor, OnVueResolveProcessor, VuePluginBuilder, VuePluginOptions,
};
pub use path_alias::PathAliases;
pub use style::STYLE_LOADER_NAMESPACE;
pub use virtual_path::{PartKind, PartRef};

use bundler_host::{BuildOptions, Plugin, PluginBuild};
use js_engine::ServiceExecutor;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// The Vue plugin.
#[derive(Debug, Clone)]
pub struct VuePlugin {
    options: VuePluginOptions,
}

impl VuePlugin {
    /// Start configuring a plugin.
    pub fn builder() -> VuePluginBuilder {
        VuePluginBuilder::default()
    }

    pub fn new(options: VuePluginOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VuePluginOptions {
        &self.options
    }

    /// Turn the configuration into a bundler plugin.
    pub fn into_plugin(self) -> Plugin {
        let name = self.options.name.clone();
        Plugin::new(name, move |build| setup(self.options, build))
    }
}

impl From<VuePlugin> for Plugin {
    fn from(plugin: VuePlugin) -> Self {
        plugin.into_plugin()
    }
}

fn setup(options: VuePluginOptions, build: &mut dyn PluginBuild) {
    normalize_build_options(build.initial_options_mut());
    let shared = Arc::new(Shared::new(options, build.initial_options().clone()));
    debug!(
        plugin = %shared.options.name,
        prod = shared.mode.is_prod,
        ssr = shared.mode.is_ssr,
        "vue plugin set up"
    );

    let state = Arc::clone(&shared);
    build.on_start(Box::new(move |build_options| {
        state
            .options
            .on_start
            .try_for_each(|processor| processor(build_options))
            .map_err(PluginError::transform("start"))?;
        state.reload_aliases(build_options)?;
        Ok(())
    }));

    vue::register(&shared, build);
    style::register(&shared, build);

    let state = Arc::clone(&shared);
    build.on_end(Box::new(move |result| {
        state
            .options
            .on_end
            .try_for_each(|processor| processor(result, &state.build))
            .map_err(PluginError::transform("end"))?;
        Ok(())
    }));

    let state = shared;
    build.on_dispose(Box::new(move || {
        state
            .options
            .on_dispose
            .for_each(|processor| processor(&state.build));
    }));
}

/// State shared by every hook of one plugin instance.
pub(crate) struct Shared {
    pub(crate) options: VuePluginOptions,
    /// Build options as normalized at setup.
    pub(crate) build: BuildOptions,
    pub(crate) mode: BuildMode,
    aliases: RwLock<Arc<PathAliases>>,
}

impl Shared {
    pub(crate) fn new(options: VuePluginOptions, build: BuildOptions) -> Self {
        let aliases = PathAliases::from_build_options(&build).unwrap_or_else(|err| {
            warn!(error = %err, "failed to parse tsconfig path aliases");
            PathAliases::default()
        });
        Self {
            mode: BuildMode::from_define(&build.define),
            options,
            build,
            aliases: RwLock::new(Arc::new(aliases)),
        }
    }

    pub(crate) fn executor(&self) -> &dyn ServiceExecutor {
        self.options.executor.as_ref()
    }

    pub(crate) fn aliases(&self) -> Arc<PathAliases> {
        Arc::clone(&self.aliases.read())
    }

    /// Re-read the path aliases, as tsconfig may have changed between builds.
    pub(crate) fn reload_aliases(&self, build: &BuildOptions) -> PluginResult<()> {
        let aliases = PathAliases::from_build_options(build).inspect_err(|err| {
            warn!(error = %err, "failed to parse tsconfig path aliases");
        })?;
        debug!(count = aliases.len(), "loaded path aliases");
        *self.aliases.write() = Arc::new(aliases);
        Ok(())
    }
}

pub(crate) fn parent_dir(path: &str) -> PathBuf {
    Path::new(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
