//! Test doubles.

use js_engine::{EngineError, EngineResult, JsRequest, JsResponse, ServiceExecutor};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

type Handler = Box<dyn Fn(&JsRequest) -> EngineResult<Value> + Send + Sync>;

/// A [`ServiceExecutor`] with a scripted handler per service.
#[derive(Default)]
pub(crate) struct MockExecutor {
    handlers: HashMap<String, Handler>,
    calls: Mutex<Vec<JsRequest>>,
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(
        mut self,
        service: &str,
        handler: impl Fn(&JsRequest) -> EngineResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(service.to_string(), Box::new(handler));
        self
    }

    /// Requests received so far.
    pub(crate) fn calls(&self) -> Vec<JsRequest> {
        self.calls.lock().clone()
    }
}

impl ServiceExecutor for MockExecutor {
    fn execute(&self, request: JsRequest) -> EngineResult<JsResponse> {
        self.calls.lock().push(request.clone());
        let handler = self.handlers.get(&request.service).ok_or_else(|| {
            EngineError::Exception(format!("service not found: {}", request.service))
        })?;
        Ok(JsResponse {
            id: request.id.clone(),
            result: handler(&request)?,
        })
    }
}

/// A stand-in for the bundled compiler, small enough to read: it splits a
/// component into its blocks with regexes and echoes them back in the
/// compile service's result shape.
pub(crate) const FAKE_COMPILER: &str = r#"
const block = (source, tag) => {
  const re = new RegExp("<" + tag + "(\\s[^>]*)?>([\\s\\S]*?)</" + tag + ">", "g");
  const found = [];
  let m;
  while ((m = re.exec(source)) !== null) {
    found.push({ attrs: m[1] || "", body: m[2].trim() });
  }
  return found;
};

var sfc = {
  vue: {
    compileSFC(id, filename, source, options) {
      if (source.includes("<broken")) {
        throw new Error("Element is missing end tag.");
      }
      const script = block(source, "script")[0];
      const template = block(source, "template")[0];
      const styles = block(source, "style");
      const render = options.isSSR ? "ssrRender" : "render";
      return {
        script: script
          ? {
              content: script.body,
              lang: /lang="ts"/.test(script.attrs) ? "ts" : "js",
              map: options.sourceMap ? { version: 3, sources: [filename] } : null,
              warnings: script.body.includes("TODO") ? ["script contains TODO"] : [],
              setup: /\bsetup\b/.test(script.attrs),
            }
          : null,
        template: template
          ? {
              code: "export function " + render + "() { return " + JSON.stringify(template.body) + "; }",
              tips: template.body.includes("v-for") ? ["v-for needs a key", 7] : [],
              errors: [],
              scoped: styles.some((s) => / scoped/.test(s.attrs)),
            }
          : null,
        styles: styles.map((s) => {
          const scoped = / scoped/.test(s.attrs);
          return {
            code: scoped ? s.body.replace("{", "[data-v-" + id + "]{") : s.body,
            scoped: scoped,
            errors: [],
          };
        }),
      };
    },
  },
  sass: {
    renderSync(options) {
      let data = options.data;
      const match = /@import\s+["']([^"']+)["'];?/.exec(data);
      if (match) {
        const target = options.sasslocation + "/" + match[1];
        if (!compilerFs.fileExists(target)) {
          throw new Error("Can't find stylesheet to import: " + match[1]);
        }
        data = data.replace(match[0], compilerFs.readFile(target));
      }
      const vars = {};
      data = data.replace(/\$(\w+):\s*([^;]+);/g, (_, name, value) => {
        vars[name] = value.trim();
        return "";
      });
      data = data.replace(/\$(\w+)/g, (_, name) => vars[name]);
      return { css: data.trim(), map: null, stats: {} };
    },
  },
};
"#;
