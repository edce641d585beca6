//! Addresses of component sub-resources.
//!
//! A sub-resource is addressed by its owner's path plus a query string:
//!
//! ```text
//! /src/App.vue?type=script
//! /src/App.vue?type=template
//! /src/App.vue?type=style&index=1
//! ```
//!
//! The `type` value, prefixed with `sfc-`, is the namespace the
//! sub-resource loads in.

use crate::error::{PluginError, PluginResult};
use std::fmt;

/// Namespace of script sub-resources.
pub const SCRIPT_NAMESPACE: &str = "sfc-script";
/// Namespace of template sub-resources.
pub const TEMPLATE_NAMESPACE: &str = "sfc-template";
/// Namespace of style sub-resources.
pub const STYLE_NAMESPACE: &str = "sfc-style";

/// Kind of a component sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Script,
    Template,
    Style,
}

impl PartKind {
    /// The `type` query value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Template => "template",
            Self::Style => "style",
        }
    }

    /// The namespace the sub-resource loads in.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Script => SCRIPT_NAMESPACE,
            Self::Template => TEMPLATE_NAMESPACE,
            Self::Style => STYLE_NAMESPACE,
        }
    }

    fn from_query(value: &str) -> Option<Self> {
        match value {
            "script" => Some(Self::Script),
            "template" => Some(Self::Template),
            "style" => Some(Self::Style),
            _ => None,
        }
    }
}

/// A reference to one sub-resource of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartRef {
    /// The kind of sub-resource.
    pub kind: PartKind,
    /// Position of the style block; `None` for script and template.
    pub index: Option<usize>,
}

impl PartRef {
    pub fn script() -> Self {
        Self {
            kind: PartKind::Script,
            index: None,
        }
    }

    pub fn template() -> Self {
        Self {
            kind: PartKind::Template,
            index: None,
        }
    }

    pub fn style(index: usize) -> Self {
        Self {
            kind: PartKind::Style,
            index: Some(index),
        }
    }

    /// The query string selecting this part.
    pub fn query(&self) -> String {
        match self.index {
            Some(index) => format!("?type={}&index={}", self.kind.as_str(), index),
            None => format!("?type={}", self.kind.as_str()),
        }
    }

    /// The path of this part of `owner`.
    pub fn path(&self, owner: &str) -> String {
        format!("{}{}", owner, self.query())
    }

    /// Decode a sub-resource path into its owner and part.
    ///
    /// Returns `Ok(None)` for paths without a `type` parameter, which
    /// address the component itself.
    pub fn parse(path: &str) -> PluginResult<Option<(&str, PartRef)>> {
        let (owner, query) = split_query(path);
        let Some(kind) = query.and_then(|q| query_param(q, "type")).filter(|t| !t.is_empty())
        else {
            return Ok(None);
        };

        let invalid = |reason: String| PluginError::InvalidPart {
            path: path.to_string(),
            reason,
        };
        let kind = PartKind::from_query(kind)
            .ok_or_else(|| invalid(format!("unknown part type `{kind}`")))?;

        let index = match kind {
            PartKind::Style => {
                let raw = query
                    .and_then(|q| query_param(q, "index"))
                    .ok_or_else(|| invalid("style parts need an `index`".to_string()))?;
                let index = raw
                    .parse::<usize>()
                    .map_err(|_| invalid(format!("`{raw}` is not a style index")))?;
                Some(index)
            }
            _ => None,
        };

        Ok(Some((owner, PartRef { kind, index })))
    }
}

impl fmt::Display for PartRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{} block {}", self.kind.as_str(), index),
            None => write!(f, "{} block", self.kind.as_str()),
        }
    }
}

/// Split a path at the first `?`.
pub fn split_query(path: &str) -> (&str, Option<&str>) {
    match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    }
}

/// The first value of a query parameter.
pub fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then_some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_part_paths() {
        assert_eq!(PartRef::script().path("/src/App.vue"), "/src/App.vue?type=script");
        assert_eq!(PartRef::template().path("/src/App.vue"), "/src/App.vue?type=template");
        assert_eq!(
            PartRef::style(1).path("/src/App.vue"),
            "/src/App.vue?type=style&index=1"
        );
        assert_eq!(PartKind::Style.namespace(), "sfc-style");
    }

    #[test]
    fn test_parse_style_index() {
        let (owner, part) = PartRef::parse("/src/App.vue?type=style&index=1")
            .unwrap()
            .unwrap();
        assert_eq!(owner, "/src/App.vue");
        assert_eq!(part, PartRef::style(1));

        let (_, part) = PartRef::parse("/src/App.vue?index=3&type=style").unwrap().unwrap();
        assert_eq!(part.index, Some(3));
    }

    #[test]
    fn test_parse_plain_component() {
        assert_eq!(PartRef::parse("/src/App.vue").unwrap(), None);
        assert_eq!(PartRef::parse("/src/App.vue?raw").unwrap(), None);
        assert_eq!(PartRef::parse("/src/App.vue?type=").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_parts() {
        assert!(matches!(
            PartRef::parse("/src/App.vue?type=i18n"),
            Err(PluginError::InvalidPart { .. })
        ));
        assert!(PartRef::parse("/src/App.vue?type=style").is_err());
        assert!(PartRef::parse("/src/App.vue?type=style&index=-1").is_err());
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param("type=style&index=0", "index"), Some("0"));
        assert_eq!(query_param("flag&type=x", "flag"), Some(""));
        assert_eq!(query_param("type=x", "index"), None);
    }
}
