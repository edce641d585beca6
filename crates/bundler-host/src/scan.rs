//! Import specifier scanning.
//!
//! This is a lexical scan, not a parse: it finds static `import` and
//! `export ... from` statements in scripts and `@import` rules in
//! stylesheets. Dynamic `import()` calls are ignored.
//!
//! Comments are blanked out before matching. Literals are not, so text
//! inside a string, template or regex literal that reads like an import
//! statement still matches.

use crate::hooks::{ImportKind, Loader};
use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)(?:^|[;}\s])(?:import|export)\s*(?:[\w*{}\s,$]*?\s*from\s*)?["']([^"'\n]+)["']"#)
        .expect("script import pattern is valid")
});

static CSS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?["']([^"'\n]+)["']"#).expect("css import pattern is valid")
});

/// Find the import specifiers of a module, in source order, without duplicates.
pub(crate) fn scan_imports(contents: &str, loader: Loader) -> Vec<(String, ImportKind)> {
    let (pattern, kind) = if loader.is_script() {
        (&*SCRIPT_IMPORT, ImportKind::ImportStatement)
    } else if loader == Loader::Css {
        (&*CSS_IMPORT, ImportKind::ImportRule)
    } else {
        return Vec::new();
    };

    let contents = strip_comments(contents, loader.is_script());
    let mut found: Vec<(String, ImportKind)> = Vec::new();
    for captures in pattern.captures_iter(&contents) {
        let specifier = captures[1].to_string();
        if !found.iter().any(|(s, _)| s == &specifier) {
            found.push((specifier, kind));
        }
    }
    found
}

/// Replace comments with spaces, keeping newlines so `^` anchors still
/// line up. Quoted strings are copied through untouched.
fn strip_comments(contents: &str, line_comments: bool) -> String {
    let mut out = String::with_capacity(contents.len());
    let mut chars = contents.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' | '`' => {
                out.push(c);
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if inner == c || (inner == '\n' && c != '`') {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str("  ");
                let mut last = '\0';
                for inner in chars.by_ref() {
                    out.push(if inner == '\n' { '\n' } else { ' ' });
                    if last == '*' && inner == '/' {
                        break;
                    }
                    last = inner;
                }
            }
            '/' if line_comments && chars.peek() == Some(&'/') => {
                while let Some(&inner) = chars.peek() {
                    if inner == '\n' {
                        break;
                    }
                    out.push(' ');
                    chars.next();
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}
