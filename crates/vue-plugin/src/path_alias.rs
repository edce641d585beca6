//! Path aliases from tsconfig `compilerOptions.paths`.

use crate::error::{PluginError, PluginResult};
use bundler_host::path::{absolutize, clean};
use bundler_host::BuildOptions;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A single alias. Wildcard aliases (`@/*`) match by prefix and carry the
/// rest of the specifier over to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Alias {
    pattern: String,
    target: String,
    wildcard: bool,
}

/// Path aliases, ordered longest pattern first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathAliases {
    aliases: Vec<Alias>,
}

impl PathAliases {
    /// Read aliases from the build's tsconfig.
    ///
    /// Inline tsconfig JSON takes precedence over a tsconfig file. Inline
    /// targets are relative to the working directory (or the executable's
    /// directory when there is none); file targets are relative to the file.
    pub fn from_build_options(options: &BuildOptions) -> PluginResult<Self> {
        if let Some(raw) = options.tsconfig_raw.as_deref().filter(|r| !r.is_empty()) {
            let base_dir = match &options.abs_working_dir {
                Some(dir) => dir.clone(),
                None => executable_dir()?,
            };
            return Self::parse(raw, &base_dir);
        }

        if let Some(tsconfig) = &options.tsconfig {
            let content = std::fs::read_to_string(tsconfig)
                .map_err(|e| PluginError::io(tsconfig, e))?;
            let tsconfig = PathBuf::from(absolutize(
                &tsconfig.to_string_lossy(),
                &options.working_dir(),
            ));
            let base_dir = tsconfig.parent().map(Path::to_path_buf).unwrap_or_default();
            return Self::parse(&content, &base_dir);
        }

        Ok(Self::default())
    }

    /// Parse tsconfig JSON. Comments are allowed.
    pub fn parse(json: &str, base_dir: &Path) -> PluginResult<Self> {
        let tsconfig: Value = serde_json::from_str(&remove_json_comments(json))
            .map_err(|e| PluginError::Config(format!("failed to parse tsconfig: {e}")))?;

        let mut aliases = Vec::new();
        if let Some(paths) = tsconfig
            .pointer("/compilerOptions/paths")
            .and_then(Value::as_object)
        {
            for (pattern, targets) in paths {
                let Some(first) = targets
                    .as_array()
                    .and_then(|t| t.first())
                    .and_then(Value::as_str)
                else {
                    continue;
                };
                let target = clean(&base_dir.join(first)).to_string_lossy().into_owned();
                let wildcard = pattern.ends_with('*');
                aliases.push(Alias {
                    pattern: pattern.trim_end_matches('*').to_string(),
                    target: if wildcard {
                        target.trim_end_matches('*').to_string()
                    } else {
                        target
                    },
                    wildcard,
                });
            }
        }

        aliases.sort_by(|a, b| {
            (b.pattern.len(), b.wildcard as u8).cmp(&(a.pattern.len(), a.wildcard as u8))
        });
        Ok(Self { aliases })
    }

    /// Rewrite a specifier with the first matching alias.
    pub fn apply(&self, specifier: &str) -> String {
        for alias in &self.aliases {
            if alias.wildcard {
                if let Some(rest) = specifier.strip_prefix(alias.pattern.as_str()) {
                    return format!("{}{}", alias.target, rest);
                }
            } else if specifier == alias.pattern {
                return alias.target.clone();
            }
        }
        specifier.to_string()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

fn executable_dir() -> PluginResult<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| PluginError::Config(format!("cannot locate the executable: {e}")))?;
    Ok(exe.parent().map(Path::to_path_buf).unwrap_or_default())
}

/// Remove `//` and `/* */` comments outside of strings.
fn remove_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                for nc in chars.by_ref() {
                    if nc == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for nc in chars.by_ref() {
                    if prev == '*' && nc == '/' {
                        break;
                    }
                    prev = nc;
                }
            }
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TSCONFIG: &str = r#"{
  // editor settings
  "compilerOptions": {
    "baseUrl": ".",
    /* aliases */
    "paths": {
      "@/*": ["./src/*", "./fallback/*"],
      "@components/*": ["./src/components/*"],
      "~config": ["./config/index.ts"],
      "url": ["http://example.com/*"]
    }
  }
}"#;

    #[test]
    fn test_remove_json_comments_keeps_strings() {
        let json = r#"{"a": "http://x/*y*/", /* c */ "b": 1} // tail"#;
        assert_eq!(remove_json_comments(json), r#"{"a": "http://x/*y*/",  "b": 1} "#);
    }

    #[test]
    fn test_wildcard_alias() {
        let aliases = PathAliases::parse(TSCONFIG, Path::new("/project")).unwrap();
        assert_eq!(aliases.len(), 4);
        assert_eq!(aliases.apply("@/App.vue"), "/project/src/App.vue");
        assert_eq!(
            aliases.apply("@/views/Home.vue?type=script"),
            "/project/src/views/Home.vue?type=script"
        );
    }

    #[test]
    fn test_longest_alias_wins() {
        let aliases = PathAliases::parse(TSCONFIG, Path::new("/project")).unwrap();
        assert_eq!(
            aliases.apply("@components/Button.vue"),
            "/project/src/components/Button.vue"
        );
    }

    #[test]
    fn test_exact_alias_must_match_whole_specifier() {
        let aliases = PathAliases::parse(TSCONFIG, Path::new("/project")).unwrap();
        assert_eq!(aliases.apply("~config"), "/project/config/index.ts");
        assert_eq!(aliases.apply("~config/extra"), "~config/extra");
        assert_eq!(aliases.apply("./local.vue"), "./local.vue");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = PathAliases::parse("{ nope", Path::new("/")).unwrap_err();
        assert!(matches!(err, PluginError::Config(_)));
    }

    #[test]
    fn test_from_raw_uses_working_dir() {
        let options = BuildOptions {
            abs_working_dir: Some(PathBuf::from("/work")),
            tsconfig_raw: Some(r#"{"compilerOptions":{"paths":{"@/*":["src/*"]}}}"#.to_string()),
            ..Default::default()
        };
        let aliases = PathAliases::from_build_options(&options).unwrap();
        assert_eq!(aliases.apply("@/a.vue"), "/work/src/a.vue");
    }

    #[test]
    fn test_from_file_uses_file_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("app");
        std::fs::create_dir_all(&config_dir).unwrap();
        let tsconfig = config_dir.join("tsconfig.json");
        std::fs::write(&tsconfig, TSCONFIG).unwrap();

        let options = BuildOptions {
            tsconfig: Some(tsconfig),
            ..Default::default()
        };
        let aliases = PathAliases::from_build_options(&options).unwrap();
        let expected = config_dir.join("src").join("App.vue");
        assert_eq!(aliases.apply("@/App.vue"), expected.to_string_lossy());
    }

    #[test]
    fn test_no_tsconfig_means_no_aliases() {
        let aliases = PathAliases::from_build_options(&BuildOptions::default()).unwrap();
        assert!(aliases.is_empty());
        assert_eq!(aliases.apply("@/App.vue"), "@/App.vue");
    }

    #[test]
    fn test_missing_tsconfig_file() {
        let options = BuildOptions {
            tsconfig: Some(PathBuf::from("/definitely/not/tsconfig.json")),
            ..Default::default()
        };
        assert!(matches!(
            PathAliases::from_build_options(&options),
            Err(PluginError::Io { .. })
        ));
    }
}
