//! End-to-end compile and render tests.
//!
//! Each test compiles template text with default options and checks the
//! serialized output for a given data scope.

use serde_json::{json, Value};
use tessera_atelier::{compile, Namespace, Node};

fn render(template: &str, data: Value) -> String {
    compile(None, template)
        .unwrap()
        .render_to_string(data)
        .unwrap()
}

// =============================================================================
// Static markup
// =============================================================================

mod static_markup {
    use super::*;

    #[test]
    fn round_trip_without_markers() {
        let template = r#"<div class="box"><p>Hello</p><br><!-- note --></div>"#;
        assert_eq!(render(template, json!({})), template);
        assert_eq!(render(template, json!({ "any": "thing" })), template);
    }

    #[test]
    fn entities_decode_and_re_escape() {
        let template = r#"<p title="a &amp; b">x &lt; y</p>"#;
        let view = compile(None, template).unwrap();
        let fragment = view.render_value(json!({})).unwrap();
        let p = fragment.iter().next().and_then(Node::as_element).unwrap();
        assert_eq!(p.get_attribute("title"), Some("a & b"));
        assert_eq!(p.text_content(), "x < y");
        assert_eq!(fragment.to_html(), template);
    }

    #[test]
    fn compiling_twice_renders_the_same() {
        let template = "<ul>{{#items}}<li>{{.}}</li>{{/items}}</ul>";
        let data = json!({ "items": [1, 2, 3] });
        let first = compile(None, template).unwrap();
        let second = compile(None, template).unwrap();
        assert_eq!(
            first.render_to_string(data.clone()).unwrap(),
            second.render_to_string(data).unwrap()
        );
    }

    #[test]
    fn view_renders_concurrently() {
        let view = compile(None, "<b>{{n}}</b>").unwrap();
        std::thread::scope(|s| {
            for n in 0..4 {
                let view = view.clone();
                s.spawn(move || {
                    assert_eq!(
                        view.render_to_string(json!({ "n": n })).unwrap(),
                        format!("<b>{n}</b>")
                    );
                });
            }
        });
    }
}

// =============================================================================
// Values
// =============================================================================

mod values {
    use super::*;

    #[test]
    fn escaped_and_unescaped_reads() {
        let data = json!({ "html": "<b>x</b>" });
        insta::assert_snapshot!(render("{{html}}", data.clone()), @"&lt;b&gt;x&lt;/b&gt;");
        insta::assert_snapshot!(render("{{{html}}}", data.clone()), @"<b>x</b>");
        insta::assert_snapshot!(render("{{& html}}", data), @"<b>x</b>");
    }

    #[test]
    fn missing_values_render_empty() {
        insta::assert_snapshot!(render("<p>[{{nope}}]</p>", json!({})), @"<p>[]</p>");
    }

    #[test]
    fn dotted_paths_and_parent_lookup() {
        let data = json!({ "user": { "name": "Ada" }, "items": ["x"] });
        insta::assert_snapshot!(render("{{user.name}}", data.clone()), @"Ada");
        insta::assert_snapshot!(
            render("{{#items}}{{.}}-{{../user.name}}{{/items}}", data),
            @"x-Ada"
        );
    }

    #[test]
    fn helpers_in_value_position() {
        let data = json!({ "a": 1, "b": 1 });
        insta::assert_snapshot!(render("{{eq a b}}", data.clone()), @"true");
        insta::assert_snapshot!(render(r#"{{if a "yes" "no"}}"#, data), @"yes");
    }

    #[test]
    fn comments_never_render() {
        insta::assert_snapshot!(render("a{{! hidden }}b", json!({})), @"ab");
    }
}

// =============================================================================
// Branches
// =============================================================================

mod branches {
    use super::*;

    #[test]
    fn section_with_else() {
        let template = "{{#x}}A{{else}}B{{/x}}";
        insta::assert_snapshot!(render(template, json!({ "x": true })), @"A");
        insta::assert_snapshot!(render(template, json!({ "x": false })), @"B");
        insta::assert_snapshot!(render(template, json!({ "x": [] })), @"B");
        insta::assert_snapshot!(render(template, json!({})), @"B");
    }

    #[test]
    fn inverted_section() {
        let template = "{{^items}}none{{/items}}";
        insta::assert_snapshot!(render(template, json!({ "items": [] })), @"none");
        insta::assert_snapshot!(render(template, json!({ "items": [1] })), @"");
    }

    #[test]
    fn lists_iterate_with_index() {
        assert_eq!(
            render("{{#each items}}{{@index}}:{{.}} {{/each}}", json!({ "items": ["a", "b"] })),
            "0:a 1:b "
        );
    }

    #[test]
    fn objects_push_a_frame() {
        insta::assert_snapshot!(
            render("{{#user}}{{name}}{{/user}}", json!({ "user": { "name": "Ada" } })),
            @"Ada"
        );
        insta::assert_snapshot!(
            render("{{#with user}}{{name}}{{/with}}", json!({ "user": { "name": "Lin" } })),
            @"Lin"
        );
    }

    #[test]
    fn if_and_unless_helpers() {
        let template = "{{#if on}}on{{else}}off{{/if}}|{{#unless on}}quiet{{/unless}}";
        insta::assert_snapshot!(render(template, json!({ "on": true })), @"on|");
        insta::assert_snapshot!(render(template, json!({ "on": false })), @"off|quiet");
    }

    #[test]
    fn sections_wrap_elements() {
        insta::assert_snapshot!(
            render(
                "<ul>{{#items}}<li>{{name}}</li>{{/items}}</ul>",
                json!({ "items": [{ "name": "a" }, { "name": "b" }] })
            ),
            @"<ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn nested_sections() {
        let template = "{{#rows}}[{{#cells}}{{.}}{{/cells}}]{{/rows}}";
        let data = json!({ "rows": [{ "cells": [1, 2] }, { "cells": [] }] });
        insta::assert_snapshot!(render(template, data), @"[12][]");
    }
}

// =============================================================================
// Attributes
// =============================================================================

mod attributes {
    use super::*;

    #[test]
    fn values_inside_attributes() {
        let template = r#"<a href="/u/{{id}}" class="{{#on}}active{{else}}idle{{/on}}">x</a>"#;
        assert_eq!(
            render(template, json!({ "id": 7, "on": true })),
            r#"<a href="/u/7" class="active">x</a>"#
        );
        assert_eq!(
            render(template, json!({ "id": 8, "on": false })),
            r#"<a href="/u/8" class="idle">x</a>"#
        );
    }

    #[test]
    fn branch_inside_tag() {
        let template = "<input {{#if on}}checked{{/if}}>";
        assert_eq!(render(template, json!({ "on": true })), r#"<input checked="">"#);
        assert_eq!(render(template, json!({ "on": false })), "<input>");
    }

    #[test]
    fn branch_inside_tag_with_values_and_else() {
        let template = r#"<p {{#big}}class="big {{size}}"{{else}}hidden{{/big}}>x</p>"#;
        assert_eq!(
            render(template, json!({ "big": true, "size": "xl" })),
            r#"<p class="big xl">x</p>"#
        );
        assert_eq!(
            render(template, json!({ "big": false })),
            r#"<p hidden="">x</p>"#
        );
    }

    #[test]
    fn quoted_values_in_tag_branch_stay_inside_the_attribute() {
        let template = r#"<div {{#x}}title="{{y}}"{{/x}}>t</div>"#;
        assert_eq!(
            render(template, json!({ "x": true, "y": r#"a" onclick="evil"# })),
            r#"<div title="a&quot; onclick=&quot;evil">t</div>"#
        );
        assert_eq!(
            render(template, json!({ "x": true, "y": "a & b" })),
            r#"<div title="a &amp; b">t</div>"#
        );
        assert_eq!(render(template, json!({ "x": false, "y": "z" })), "<div>t</div>");
    }

    #[test]
    fn value_read_inside_tag() {
        assert_eq!(
            render("<div {{attrs}}></div>", json!({ "attrs": r#"data-a="1""# })),
            r#"<div data-a="1"></div>"#
        );
    }
}

// =============================================================================
// Namespaces and opaque text
// =============================================================================

mod structure {
    use super::*;

    #[test]
    fn svg_namespace_propagates() {
        let view = compile(None, "<svg><g><circle></circle></g></svg><div><span></span></div>").unwrap();
        let fragment = view.render_value(json!({})).unwrap();
        let nodes = fragment.into_nodes();

        let svg = nodes[0].as_element().unwrap();
        assert_eq!(svg.namespace, Namespace::Svg);
        let g = svg.children[0].as_element().unwrap();
        assert_eq!(g.namespace, Namespace::Svg);
        assert_eq!(g.children[0].as_element().unwrap().namespace, Namespace::Svg);

        let div = nodes[1].as_element().unwrap();
        assert_eq!(div.namespace, Namespace::Html);
        assert_eq!(div.children[0].as_element().unwrap().namespace, Namespace::Html);
    }

    #[test]
    fn style_children_are_opaque_text() {
        insta::assert_snapshot!(
            render("<style>a > b { color: {{color}}; }</style>", json!({ "color": "red" })),
            @"<style>a > b { color: red; }</style>"
        );
    }

    #[test]
    fn style_values_cannot_close_the_element() {
        assert_eq!(
            render("<style>p { color: {{c}} }</style>", json!({ "c": "red</style>" })),
            r"<style>p { color: red<\/style> }</style>"
        );
    }

    #[test]
    fn sections_inside_style_stay_local() {
        let template = "<style>{{#dark}}body{}{{/dark}}</style><p>{{#dark}}x{{/dark}}</p>";
        insta::assert_snapshot!(
            render(template, json!({ "dark": true })),
            @"<style>body{}</style><p>x</p>"
        );
    }

    #[test]
    fn inline_partials() {
        let template = "{{<row}}<b>{{.}}</b>{{/row}}{{#items}}{{>row}}{{/items}}";
        let view = compile(None, template).unwrap();
        assert_eq!(view.inline_partial_names(), vec!["row"]);
        insta::assert_snapshot!(
            view.render_to_string(json!({ "items": ["a", "b"] })).unwrap(),
            @"<b>a</b><b>b</b>"
        );
    }

    #[test]
    fn template_definitions_are_not_emitted() {
        let template = r#"<view-template name="greet">Hi {{name}}</view-template>{{>greet}}"#;
        let view = compile(None, template).unwrap();
        assert!(view.inline_partial("greet").is_some());
        insta::assert_snapshot!(
            view.render_to_string(json!({ "name": "Ada" })).unwrap(),
            @"Hi Ada"
        );
    }

    #[test]
    fn bodiless_template_definition_is_dropped() {
        insta::assert_snapshot!(render(r#"<view-template name="x"/>ok"#, json!({})), @"ok");
    }

    #[test]
    fn recursion_through_scope_view() {
        let template = "{{name}}{{#children}}<ul>{{>scope.view}}</ul>{{/children}}";
        let data = json!({
            "name": "a",
            "children": [{ "name": "b", "children": [{ "name": "c", "children": [] }] }]
        });
        insta::assert_snapshot!(render(template, data), @"a<ul>b<ul>c</ul></ul>");
    }

    #[test]
    fn filename_is_exposed_on_scope() {
        let view = compile(Some("page.stache"), "{{scope.filename}}").unwrap();
        insta::assert_snapshot!(view.render_to_string(json!({})).unwrap(), @"page.stache");
    }
}

// =============================================================================
// Whitespace
// =============================================================================

mod whitespace {
    use super::*;

    #[test]
    fn whitespace_control_strips_around_markers() {
        insta::assert_snapshot!(
            render("<p>\n  {{- name -}}\n</p>", json!({ "name": "Ada" })),
            @"<p>Ada</p>"
        );
    }

    #[test]
    fn standalone_section_lines_are_removed() {
        let template = "<ul>\n{{#items}}\n<li>{{.}}</li>\n{{/items}}\n</ul>";
        assert_eq!(
            render(template, json!({ "items": ["a"] })),
            "<ul>\n<li>a</li>\n</ul>"
        );
    }
}
