//! Request and response envelopes for guest services.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names of the services the bundled compiler exposes.
pub mod services {
    /// Compile a single-file component.
    pub const COMPILE_SFC: &str = "sfc.vue.compileSFC";
    /// Render a Sass/SCSS stylesheet to CSS.
    pub const SASS_RENDER_SYNC: &str = "sfc.sass.renderSync";
}

/// A call into a guest service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsRequest {
    /// Correlation id, echoed back in the response.
    pub id: String,
    /// Dotted service path, resolved against the guest's global object.
    pub service: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl JsRequest {
    /// Create a request with a fresh id.
    pub fn new(service: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            service: service.into(),
            args,
        }
    }
}

/// The result of a guest service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsResponse {
    /// Id of the request this answers.
    pub id: String,
    /// The value the service returned.
    pub result: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_ids_are_unique() {
        let a = JsRequest::new(services::COMPILE_SFC, vec![]);
        let b = JsRequest::new(services::COMPILE_SFC, vec![]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_request_envelope_shape() {
        let request = JsRequest {
            id: "1".to_string(),
            service: services::SASS_RENDER_SYNC.to_string(),
            args: vec![json!({ "data": "a{}" })],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "id": "1", "service": "sfc.sass.renderSync", "args": [{ "data": "a{}" }] })
        );
    }
}
