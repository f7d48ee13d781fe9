//! Custom tag, attribute handler and partial registry tests.

use std::sync::Arc;

use serde_json::{json, Value};
use tessera_atelier::{
    compile, compile_with_options, AttrData, CompileOptions, Element, RenderError, RenderResult,
    Scope, TagData, TemplateRegistry, ViewCallbacks,
};

fn options(callbacks: ViewCallbacks) -> CompileOptions {
    CompileOptions::default().with_callbacks(Arc::new(callbacks))
}

fn render_with(callbacks: ViewCallbacks, template: &str, data: Value) -> String {
    compile_with_options(template, &options(callbacks))
        .unwrap()
        .view
        .render_to_string(data)
        .unwrap()
}

/// Marks each `<my-icon>` with whether it sits directly in a section.
fn nesting_probe() -> ViewCallbacks {
    let callbacks = ViewCallbacks::new();
    callbacks.register_tag(
        "my-icon",
        |el: &mut Element, data: &TagData<'_>| -> RenderResult<Option<Scope>> {
            el.set_attribute("nested", data.directly_nested.to_string());
            el.set_attribute("sub", data.subtemplate.is_some().to_string());
            Ok(None)
        },
    );
    callbacks
}

// =============================================================================
// Custom tags
// =============================================================================

mod custom_tags {
    use super::*;

    #[test]
    fn self_closing_custom_tag() {
        assert_eq!(
            render_with(nesting_probe(), "<my-icon/>", json!({})),
            r#"<my-icon nested="true" sub="false"></my-icon>"#
        );
    }

    #[test]
    fn directly_nested_depends_on_enclosing_frame() {
        assert_eq!(
            render_with(nesting_probe(), "<div><my-icon/></div>", json!({})),
            r#"<div><my-icon nested="false" sub="false"></my-icon></div>"#
        );
        assert_eq!(
            render_with(nesting_probe(), "<div>{{#a}}<my-icon/>{{/a}}</div>", json!({ "a": true })),
            r#"<div><my-icon nested="true" sub="false"></my-icon></div>"#
        );
    }

    #[test]
    fn content_is_handed_over_as_subtemplate() {
        let callbacks = ViewCallbacks::new();
        callbacks.register_tag(
            "my-card",
            |el: &mut Element, data: &TagData<'_>| -> RenderResult<Option<Scope>> {
                assert_eq!(data.template_type, "stache");
                el.set_attribute("tag", data.tag);
                Ok(Some(data.scope.add(json!({ "title": "T" }))))
            },
        );
        assert_eq!(
            render_with(callbacks, "<my-card><h1>{{title}}</h1></my-card>", json!({})),
            r#"<my-card tag="my-card"><h1>T</h1></my-card>"#
        );
    }

    #[test]
    fn ancestor_content_is_not_rendered_without_a_scope() {
        let callbacks = nesting_probe();
        assert_eq!(
            render_with(callbacks, "<my-icon><b>hidden</b></my-icon>", json!({})),
            r#"<my-icon nested="true" sub="true"></my-icon>"#
        );
    }

    #[test]
    fn content_tag_renders_in_place() {
        insta::assert_snapshot!(
            render_with(ViewCallbacks::new(), "<content>{{x}}</content>", json!({ "x": 1 })),
            @"<content>1</content>"
        );
    }

    #[test]
    fn named_templates_reach_the_enclosing_tag() {
        let callbacks = ViewCallbacks::new();
        callbacks.register_tag(
            "my-list",
            |el: &mut Element, data: &TagData<'_>| -> RenderResult<Option<Scope>> {
                let row = data
                    .templates
                    .and_then(|templates| templates.get("row"))
                    .cloned()
                    .ok_or_else(|| RenderError::Handler {
                        tag: data.tag.to_string(),
                        message: "missing row template".into(),
                    })?;
                if let Some(Value::Array(items)) = data.scope.get("items") {
                    for item in items {
                        el.append(row.render(&data.scope.add(item))?);
                    }
                }
                Ok(None)
            },
        );
        let template = r#"<my-list><view-template name="row"><li>{{.}}</li></view-template></my-list>"#;
        insta::assert_snapshot!(
            render_with(callbacks, template, json!({ "items": ["a", "b"] })),
            @"<my-list><li>a</li><li>b</li></my-list>"
        );
    }

    #[test]
    fn handler_errors_surface_at_render_time() {
        let callbacks = ViewCallbacks::new();
        callbacks.register_tag(
            "my-broken",
            |_: &mut Element, data: &TagData<'_>| -> RenderResult<Option<Scope>> {
                Err(RenderError::Handler {
                    tag: data.tag.to_string(),
                    message: "boom".into(),
                })
            },
        );
        let view = compile_with_options("<my-broken/>", &options(callbacks)).unwrap().view;
        let err = view.render_to_string(json!({})).unwrap_err();
        assert_eq!(err.to_string(), "<my-broken> handler failed: boom");
    }

    #[test]
    fn line_number_is_set_before_dispatch() {
        let callbacks = ViewCallbacks::new();
        callbacks.register_tag(
            "my-line",
            |el: &mut Element, data: &TagData<'_>| -> RenderResult<Option<Scope>> {
                let line = data.scope.template_context().line_number();
                el.set_attribute("line", line.to_string());
                Ok(None)
            },
        );
        assert_eq!(
            render_with(callbacks, "<p>\n</p><my-line/>", json!({})),
            "<p>\n</p><my-line line=\"2\"></my-line>"
        );
    }
}

// =============================================================================
// Attribute handlers
// =============================================================================

mod attribute_handlers {
    use super::*;

    #[test]
    fn handler_runs_after_attributes() {
        let callbacks = ViewCallbacks::new();
        callbacks.register_attr(
            "on:click",
            |el: &mut Element, data: &AttrData<'_>| -> RenderResult<()> {
                el.set_attribute("data-bound", data.attribute_name);
                Ok(())
            },
        );
        let compiled = compile_with_options(
            r#"<button on:click="go">x</button>"#,
            &options(callbacks),
        )
        .unwrap();
        assert!(compiled.warnings.is_empty());
        assert_eq!(
            compiled.view.render_to_string(json!({})).unwrap(),
            r#"<button on:click="go" data-bound="on:click">x</button>"#
        );
    }

    #[test]
    fn pattern_handlers_claim_bindings() {
        let callbacks = ViewCallbacks::new();
        callbacks.register_attr_pattern(
            regex::Regex::new(r":bind$").unwrap(),
            |el: &mut Element, data: &AttrData<'_>| -> RenderResult<()> {
                let key = data.attribute_name.trim_end_matches(":bind");
                let value = data.scope.get(key).map(|v| v.to_string()).unwrap_or_default();
                el.set_attribute(key, value);
                el.remove_attribute(data.attribute_name);
                Ok(())
            },
        );
        let compiled =
            compile_with_options(r#"<input value:bind="">"#, &options(callbacks)).unwrap();
        assert!(compiled.warnings.is_empty());
        assert_eq!(
            compiled.view.render_to_string(json!({ "value": 3 })).unwrap(),
            r#"<input value="3">"#
        );
    }
}

// =============================================================================
// Partials
// =============================================================================

mod partials {
    use super::*;

    #[test]
    fn global_registry_partials() {
        TemplateRegistry::global()
            .register_partial("callbacks-test-footer", "<footer>{{year}}</footer>")
            .unwrap();
        let view = compile(None, "<main></main>{{>callbacks-test-footer}}").unwrap();
        insta::assert_snapshot!(
            view.render_to_string(json!({ "year": 2024 })).unwrap(),
            @"<main></main><footer>2024</footer>"
        );
    }

    #[test]
    fn partial_with_context_expression() {
        TemplateRegistry::global()
            .register_partial("callbacks-test-card", "<i>{{name}}</i>")
            .unwrap();
        let view = compile(None, "{{>callbacks-test-card person}}").unwrap();
        insta::assert_snapshot!(
            view.render_to_string(json!({ "person": { "name": "Ada" } })).unwrap(),
            @"<i>Ada</i>"
        );
    }

    #[test]
    fn partial_name_from_scope() {
        TemplateRegistry::global()
            .register_partial("callbacks-test-dynamic", "dynamic")
            .unwrap();
        let view = compile(None, "{{>which}}").unwrap();
        insta::assert_snapshot!(
            view.render_to_string(json!({ "which": "callbacks-test-dynamic" })).unwrap(),
            @"dynamic"
        );
    }

    #[test]
    fn missing_partial_is_a_render_error() {
        let view = compile(None, "{{>callbacks-test-nowhere}}").unwrap();
        assert_eq!(
            view.render_to_string(json!({})).unwrap_err(),
            RenderError::MissingPartial {
                name: "callbacks-test-nowhere".into()
            }
        );
    }

    #[test]
    fn partials_inside_attributes_render_as_text() {
        TemplateRegistry::global()
            .register_partial("callbacks-test-cls", "big {{size}}")
            .unwrap();
        let view = compile(None, r#"<p class="{{>callbacks-test-cls}}"></p>"#).unwrap();
        assert_eq!(
            view.render_to_string(json!({ "size": "xl" })).unwrap(),
            r#"<p class="big xl"></p>"#
        );
    }
}
