//! Build messages (errors and warnings).

use serde::Serialize;

/// A message attached to a build, optionally pointing at a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// The message text.
    pub text: String,
    /// Name of the plugin that produced the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    /// Where the message applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// Location of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// The file path.
    pub file: String,
    /// The namespace of the file.
    pub namespace: String,
}

impl Message {
    /// Create a message without a location.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            plugin_name: None,
            location: None,
        }
    }

    /// Attach the message to a file in the `file` namespace.
    pub fn with_file(self, file: impl Into<String>) -> Self {
        self.with_location(file, crate::FILE_NAMESPACE)
    }

    /// Attach the message to a path in a namespace.
    pub fn with_location(mut self, file: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.location = Some(Location {
            file: file.into(),
            namespace: namespace.into(),
        });
        self
    }

    /// Record the plugin that produced the message.
    pub fn with_plugin(mut self, name: impl Into<String>) -> Self {
        self.plugin_name = Some(name.into());
        self
    }

    /// The file the message points at, if any.
    pub fn file(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.file.as_str())
    }

    /// Format the message for display.
    pub fn format(&self) -> String {
        let mut result = String::new();

        if let Some(location) = &self.location {
            result.push_str(&location.file);
            result.push_str(": ");
        }
        if let Some(plugin) = &self.plugin_name {
            result.push('[');
            result.push_str(plugin);
            result.push_str("] ");
        }
        result.push_str(&self.text);

        result
    }
}
