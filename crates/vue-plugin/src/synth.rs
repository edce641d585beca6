//! Entry module synthesis.
//!
//! The module generated for a component stitches its sub-resources back
//! together:
//!
//! ```js
//! import script from "/src/App.vue?type=script";
//! import "/src/App.vue?type=style&index=0";
//! import { render } from "/src/App.vue?type=template";
//! script.render = render;
//! script.__file = "src/App.vue";
//! script.__scopeId = "data-v-1a2b3c";
//! export * from "/src/App.vue?type=script";
//! export default script;
//! ```

use crate::component::{CompiledComponent, ComponentIdentity};
use crate::virtual_path::PartRef;
use serde_json::Value;

/// Name of the client render function.
pub const RENDER: &str = "render";
/// Name of the server render function.
pub const SSR_RENDER: &str = "ssrRender";

/// The render function name for a mode.
pub fn render_function_name(is_ssr: bool) -> &'static str {
    if is_ssr {
        SSR_RENDER
    } else {
        RENDER
    }
}

/// Generate the entry module of a compiled component owned by `owner`
/// (a POSIX path). `file` is the path recorded in `__file`, normally
/// relative to the working directory.
pub fn generate_entry_module(
    owner: &str,
    file: &str,
    identity: ComponentIdentity,
    is_ssr: bool,
    component: &CompiledComponent,
) -> String {
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&text);
        out.push('\n');
    };

    if component.script.is_some() {
        line(format!(
            "import script from {};",
            quote(&PartRef::script().path(owner))
        ));
    } else {
        line("const script = {};".to_string());
    }

    for index in 0..component.styles.len() {
        line(format!("import {};", quote(&PartRef::style(index).path(owner))));
    }

    if component.template.is_some() {
        let render = render_function_name(is_ssr);
        line(format!(
            "import {{ {render} }} from {};",
            quote(&PartRef::template().path(owner))
        ));
        line(format!("script.{render} = {render};"));
    }

    line(format!("script.__file = {};", quote(file)));
    if component.has_scoped_style() {
        line(format!("script.__scopeId = {};", quote(&identity.scope_id())));
    }
    if is_ssr {
        line("script.__ssrInlineRender = true;".to_string());
    }

    if component.script.is_some() {
        line(format!(
            "export * from {};",
            quote(&PartRef::script().path(owner))
        ));
    }
    line("export default script;".to_string());

    out
}

/// Quote a string as a JavaScript string literal.
fn quote(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ScriptPart, StylePart, TemplatePart};
    use pretty_assertions::assert_eq;

    const OWNER: &str = "/src/App.vue";
    const FILE: &str = "src/App.vue";

    fn full_component() -> CompiledComponent {
        CompiledComponent {
            script: Some(ScriptPart {
                content: "export default { name: 'App' }".to_string(),
                ..Default::default()
            }),
            template: Some(TemplatePart {
                code: "export function render() {}".to_string(),
                ..Default::default()
            }),
            styles: vec![
                StylePart {
                    code: ".a{}".to_string(),
                    ..Default::default()
                },
                StylePart {
                    code: ".b[data-v-1]{}".to_string(),
                    scoped: true,
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_full_component() {
        let identity = ComponentIdentity::of("source");
        let module = generate_entry_module(OWNER, FILE, identity, false, &full_component());

        let expected = format!(
            r#"import script from "/src/App.vue?type=script";
import "/src/App.vue?type=style&index=0";
import "/src/App.vue?type=style&index=1";
import {{ render }} from "/src/App.vue?type=template";
script.render = render;
script.__file = "src/App.vue";
script.__scopeId = "data-v-{}";
export * from "/src/App.vue?type=script";
export default script;
"#,
            identity.hash_id()
        );
        assert_eq!(module, expected);
        assert_eq!(module.matches("import script from").count(), 1);
        assert_eq!(module.matches("?type=style&index=").count(), 2);
    }

    #[test]
    fn test_without_script() {
        let component = CompiledComponent {
            script: None,
            ..full_component()
        };
        let module =
            generate_entry_module(OWNER, FILE, ComponentIdentity::of("x"), false, &component);

        assert!(module.starts_with("const script = {};\n"));
        assert!(!module.contains("?type=script"));
        assert!(module.ends_with("export default script;\n"));
    }

    #[test]
    fn test_ssr_naming() {
        let identity = ComponentIdentity::of("x");

        let ssr = generate_entry_module(OWNER, FILE, identity, true, &full_component());
        assert!(ssr.contains("import { ssrRender } from \"/src/App.vue?type=template\";"));
        assert!(ssr.contains("script.ssrRender = ssrRender;"));
        assert!(ssr.contains("script.__ssrInlineRender = true;"));
        assert!(!ssr.contains("script.render ="));

        let csr = generate_entry_module(OWNER, FILE, identity, false, &full_component());
        assert!(csr.contains("import { render } from"));
        assert!(csr.contains("script.render = render;"));
        assert!(!csr.contains("__ssrInlineRender"));
        assert!(!csr.contains("ssrRender"));
    }

    #[test]
    fn test_unscoped_has_no_scope_id() {
        let mut component = full_component();
        component.styles.iter_mut().for_each(|s| s.scoped = false);
        let module =
            generate_entry_module(OWNER, FILE, ComponentIdentity::of("x"), false, &component);
        assert!(!module.contains("__scopeId"));
    }

    #[test]
    fn test_paths_are_quoted() {
        let component = CompiledComponent::default();
        let module = generate_entry_module(
            r#"/src/it's "odd".vue"#,
            r#"src/it's "odd".vue"#,
            ComponentIdentity::of("x"),
            false,
            &component,
        );
        assert!(module.contains(r#"script.__file = "src/it's \"odd\".vue";"#));
    }
}
