//! Build options handed to plugins.

use indexmap::IndexMap;
use std::path::PathBuf;

/// Options of a build, visible to every plugin during setup.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Entry points of the build.
    pub entry_points: Vec<String>,
    /// Absolute working directory.
    pub abs_working_dir: Option<PathBuf>,
    /// Global identifier replacements (values are JavaScript expressions).
    pub define: IndexMap<String, String>,
    /// Source map mode.
    pub sourcemap: SourceMapMode,
    /// Path to a tsconfig file.
    pub tsconfig: Option<PathBuf>,
    /// Inline tsconfig JSON, takes precedence over `tsconfig`.
    pub tsconfig_raw: Option<String>,
    /// Whether a metafile is produced.
    pub metafile: bool,
    /// Output directory.
    pub outdir: Option<PathBuf>,
}

impl BuildOptions {
    /// The working directory, falling back to the process's current directory.
    pub fn working_dir(&self) -> PathBuf {
        self.abs_working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// How source maps are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMapMode {
    /// No source maps.
    #[default]
    None,
    /// Linked `.map` files with a comment.
    Linked,
    /// Maps inlined into the output.
    Inline,
    /// `.map` files without a comment.
    External,
    /// Both inline and external.
    InlineAndExternal,
}

impl SourceMapMode {
    /// Whether any kind of source map is produced.
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sourcemap_enabled() {
        assert!(!SourceMapMode::None.is_enabled());
        assert!(SourceMapMode::Inline.is_enabled());
        assert!(SourceMapMode::Linked.is_enabled());
    }

    #[test]
    fn test_working_dir_prefers_explicit() {
        let options = BuildOptions {
            abs_working_dir: Some(PathBuf::from("/project")),
            ..Default::default()
        };
        assert_eq!(options.working_dir(), PathBuf::from("/project"));
    }
}
