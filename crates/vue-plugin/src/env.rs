//! `import.meta.env` handling over the bundler's `define` map.

use bundler_host::BuildOptions;
use indexmap::IndexMap;
use serde_json::Value;

/// The define key holding the whole env object.
pub const IMPORT_META_ENV: &str = "import.meta.env";

/// Look up `import.meta.env.<key>`.
///
/// The individual define (`import.meta.env.PROD`) wins over a key inside the
/// `import.meta.env` JSON object. Values are JSON-decoded; a defined value
/// that is not valid JSON (such as `'production'`) is present but `Null`.
pub fn import_meta_env(define: &IndexMap<String, String>, key: &str) -> Option<Value> {
    if let Some(raw) = define.get(&format!("{IMPORT_META_ENV}.{key}")) {
        return Some(serde_json::from_str(raw).unwrap_or(Value::Null));
    }

    let raw = define.get(IMPORT_META_ENV)?;
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(env)) => env.get(key).cloned(),
        _ => None,
    }
}

/// Fill in the env defines a Vue build expects without overriding user values.
pub fn normalize_build_options(options: &mut BuildOptions) {
    let define = &mut options.define;

    define
        .entry(IMPORT_META_ENV.to_string())
        .or_insert_with(|| "{}".to_string());

    for (key, default) in [
        ("MODE", "'production'"),
        ("PROD", "true"),
        ("DEV", "false"),
        ("SSR", "false"),
        ("BASE_URL", "'/'"),
    ] {
        if import_meta_env(define, key).is_none() {
            define.insert(format!("{IMPORT_META_ENV}.{key}"), default.to_string());
        }
    }

    for (flag, default) in [
        ("__VUE_OPTIONS_API__", "true"),
        ("__VUE_PROD_DEVTOOLS__", "false"),
        ("__VUE_PROD_HYDRATION_MISMATCH_DETAILS__", "false"),
    ] {
        define
            .entry(flag.to_string())
            .or_insert_with(|| default.to_string());
    }

    options.metafile = true;
}

/// Production and server-render flags of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    /// Production code generation.
    pub is_prod: bool,
    /// Server-side rendering.
    pub is_ssr: bool,
}

impl Default for BuildMode {
    fn default() -> Self {
        Self {
            is_prod: true,
            is_ssr: false,
        }
    }
}

impl BuildMode {
    /// Read the mode from `import.meta.env.PROD` and `import.meta.env.SSR`.
    /// Non-boolean values keep the defaults.
    pub fn from_define(define: &IndexMap<String, String>) -> Self {
        let flag = |key: &str, default: bool| {
            import_meta_env(define, key)
                .and_then(|v| v.as_bool())
                .unwrap_or(default)
        };
        let defaults = Self::default();
        Self {
            is_prod: flag("PROD", defaults.is_prod),
            is_ssr: flag("SSR", defaults.is_ssr),
        }
    }
}
