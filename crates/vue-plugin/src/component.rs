//! Compiled component model and identity.

use crate::error::{PluginError, PluginResult};
use bundler_host::Loader;
use js_engine::services;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix of the scope attribute injected for scoped styles.
pub const SCOPE_ID_PREFIX: &str = "data-v-";

/// Content fingerprint of a component source.
///
/// Computed from the exact source bytes on every load, so an edited file
/// always gets a new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentIdentity(u64);

impl ComponentIdentity {
    /// Fingerprint a source text.
    pub fn of(source: &str) -> Self {
        let digest = Sha256::digest(source.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(bytes))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The hex id handed to the compiler.
    pub fn hash_id(self) -> String {
        format!("{:x}", self.0)
    }

    /// The scope attribute for scoped styles.
    pub fn scope_id(self) -> String {
        format!("{SCOPE_ID_PREFIX}{}", self.hash_id())
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// The compile service's result for one component.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompiledComponent {
    /// The compiled script block.
    #[serde(default)]
    pub script: Option<ScriptPart>,
    /// The compiled template block.
    #[serde(default)]
    pub template: Option<TemplatePart>,
    /// Compiled style blocks, in source order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub styles: Vec<StylePart>,
}

/// A compiled script block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScriptPart {
    /// The generated JavaScript or TypeScript.
    pub content: String,
    /// The `lang` attribute of the block.
    #[serde(default)]
    pub lang: Option<String>,
    /// Source map of the generated code.
    #[serde(default)]
    pub map: Option<Value>,
    /// Compiler warnings.
    #[serde(default, deserialize_with = "strings_only")]
    pub warnings: Vec<String>,
    /// Whether the block uses `<script setup>`.
    #[serde(default)]
    pub setup: bool,
}

/// A compiled template block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TemplatePart {
    /// The generated render function module.
    pub code: String,
    /// Informational compiler tips.
    #[serde(default, deserialize_with = "strings_only")]
    pub tips: Vec<String>,
    /// Compile errors.
    #[serde(default, deserialize_with = "strings_only")]
    pub errors: Vec<String>,
    /// Whether the template belongs to a scoped component.
    #[serde(default)]
    pub scoped: bool,
}

/// A compiled style block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StylePart {
    /// The generated CSS.
    pub code: String,
    /// Whether selectors are scoped to the component.
    #[serde(default)]
    pub scoped: bool,
    /// Compile errors.
    #[serde(default, deserialize_with = "strings_only")]
    pub errors: Vec<String>,
}

/// Script language of a compiled script block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptLang {
    #[default]
    Js,
    Jsx,
    Ts,
    Tsx,
}

impl ScriptLang {
    /// Parse a `lang` attribute. Unknown languages are treated as JavaScript.
    pub fn from_lang(lang: Option<&str>) -> Self {
        match lang {
            Some("ts") => Self::Ts,
            Some("tsx") => Self::Tsx,
            Some("jsx") => Self::Jsx,
            _ => Self::Js,
        }
    }

    /// The loader for this language.
    pub fn loader(self) -> Loader {
        match self {
            Self::Js => Loader::Js,
            Self::Jsx => Loader::Jsx,
            Self::Ts => Loader::Ts,
            Self::Tsx => Loader::Tsx,
        }
    }
}

impl ScriptPart {
    pub fn lang(&self) -> ScriptLang {
        ScriptLang::from_lang(self.lang.as_deref())
    }
}

impl CompiledComponent {
    /// Decode a compile service result.
    pub fn decode(value: Value) -> PluginResult<Self> {
        let malformed = |reason: String| PluginError::MalformedResponse {
            service: services::COMPILE_SFC,
            reason,
        };
        if !value.is_object() {
            return Err(malformed(format!("invalid Vue SFC compilation result: {value}")));
        }
        serde_json::from_value(value)
            .map_err(|e| malformed(format!("invalid Vue SFC compilation result: {e}")))
    }

    /// Whether any style block is scoped.
    pub fn has_scoped_style(&self) -> bool {
        self.styles.iter().any(|s| s.scoped)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keep the string entries of a diagnostic list; anything else is skipped.
fn strings_only<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_identity_is_deterministic() {
        let source = "<template><div>hi</div></template>";
        assert_eq!(ComponentIdentity::of(source), ComponentIdentity::of(source));
        assert_eq!(
            ComponentIdentity::of(source).hash_id(),
            ComponentIdentity::of(&source.to_string()).hash_id()
        );
    }

    #[test]
    fn test_identity_changes_with_content() {
        let a = ComponentIdentity::of("<template><div>hi</div></template>");
        let b = ComponentIdentity::of("<template><div>hi!</div></template>");
        let c = ComponentIdentity::of("<template><div>hi</div></template>\n");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_scope_id() {
        let identity = ComponentIdentity::of("x");
        assert_eq!(identity.scope_id(), format!("data-v-{}", identity.hash_id()));
        assert_eq!(identity.to_string(), identity.hash_id());
    }

    #[test]
    fn test_decode_full_result() {
        let component = CompiledComponent::decode(json!({
            "script": {
                "content": "export default {}",
                "lang": "ts",
                "map": { "version": 3 },
                "warnings": ["unused ref", 42, null],
                "setup": true
            },
            "template": {
                "code": "export function render() {}",
                "tips": ["tip", { "msg": "object tip" }],
                "errors": [],
                "scoped": true
            },
            "styles": [
                { "code": ".a{}", "scoped": false, "errors": [] },
                { "code": ".b[data-v-1]{}", "scoped": true }
            ]
        }))
        .unwrap();

        let script = component.script.as_ref().unwrap();
        assert_eq!(script.lang(), ScriptLang::Ts);
        assert_eq!(script.warnings, vec!["unused ref"]);
        assert!(script.setup);
        assert_eq!(component.template.as_ref().unwrap().tips, vec!["tip"]);
        assert_eq!(component.styles.len(), 2);
        assert!(component.has_scoped_style());
    }

    #[test]
    fn test_decode_missing_parts() {
        let component =
            CompiledComponent::decode(json!({ "script": null, "styles": null })).unwrap();
        assert_eq!(component, CompiledComponent::default());
        assert!(!component.has_scoped_style());
    }

    #[test]
    fn test_decode_malformed() {
        for value in [json!("nope"), json!(null), json!({ "styles": [{ "scoped": true }] })] {
            let err = CompiledComponent::decode(value).unwrap_err();
            assert!(matches!(err, PluginError::MalformedResponse { .. }));
            assert!(err.to_string().contains("invalid Vue SFC compilation result"));
        }
    }

    #[test]
    fn test_script_lang_loader() {
        assert_eq!(ScriptLang::from_lang(Some("ts")).loader(), Loader::Ts);
        assert_eq!(ScriptLang::from_lang(Some("tsx")).loader(), Loader::Tsx);
        assert_eq!(ScriptLang::from_lang(Some("jsx")).loader(), Loader::Jsx);
        assert_eq!(ScriptLang::from_lang(Some("coffee")).loader(), Loader::Js);
        assert_eq!(ScriptLang::from_lang(None).loader(), Loader::Js);
    }
}
