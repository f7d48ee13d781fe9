//! Tokenizer event stream tests.
//!
//! These tests drive the public `tokenize` entry with a recording handler and
//! compare the flattened event stream.

use tessera_armature::{clean_line_endings, clean_whitespace_control, tokenize, Handler};

#[derive(Default)]
struct Events(Vec<String>);

impl Handler for Events {
    type Error = String;

    fn start(&mut self, tag: &str, unary: bool, _line: u32) -> Result<(), String> {
        self.0.push(format!("<{tag}{}", if unary { "/" } else { "" }));
        Ok(())
    }
    fn end(&mut self, _tag: &str, _unary: bool, _line: u32) -> Result<(), String> {
        self.0.push(">".into());
        Ok(())
    }
    fn close(&mut self, tag: &str, _line: u32) -> Result<(), String> {
        self.0.push(format!("</{tag}>"));
        Ok(())
    }
    fn attr_start(&mut self, name: &str, _line: u32) -> Result<(), String> {
        self.0.push(format!("@{name}"));
        Ok(())
    }
    fn attr_value(&mut self, value: &str, _line: u32) -> Result<(), String> {
        self.0.push(format!("={value}"));
        Ok(())
    }
    fn attr_end(&mut self, _name: &str, _line: u32) -> Result<(), String> {
        self.0.push("@end".into());
        Ok(())
    }
    fn chars(&mut self, text: &str, _line: u32) -> Result<(), String> {
        self.0.push(format!("'{text}'"));
        Ok(())
    }
    fn special(&mut self, text: &str, line: u32) -> Result<(), String> {
        if text == "fail" {
            return Err(format!("failed on line {line}"));
        }
        self.0.push(format!("{{{text}}}"));
        Ok(())
    }
    fn comment(&mut self, text: &str, _line: u32) -> Result<(), String> {
        self.0.push(format!("!{text}"));
        Ok(())
    }
}

fn stream(src: &str) -> String {
    tokenize(src, Events::default()).unwrap().0.join(" ")
}

// =============================================================================
// Markup
// =============================================================================

mod markup {
    use super::*;

    #[test]
    fn nested_elements() {
        insta::assert_snapshot!(
            stream("<div><span>hi</span></div>"),
            @"<div > <span > 'hi' </span> </div>"
        );
    }

    #[test]
    fn svg_self_closing_children() {
        insta::assert_snapshot!(
            stream(r#"<svg><g><path d="M0"/></g></svg>"#),
            @"<svg > <g > <path/ @d =M0 @end > </g> </svg>"
        );
    }

    #[test]
    fn close_tags_are_case_insensitive() {
        insta::assert_snapshot!(stream("<DIV>x</div>"), @"<DIV > 'x' </DIV>");
    }

    #[test]
    fn doctype_is_skipped() {
        insta::assert_snapshot!(stream("<!DOCTYPE html><p></p>"), @"<p > </p>");
    }
}

// =============================================================================
// Markers
// =============================================================================

mod markers {
    use super::*;

    #[test]
    fn section_around_elements() {
        insta::assert_snapshot!(
            stream("{{#items}}<li>{{name}}</li>{{/items}}"),
            @"{#items} <li > {name} </li> {/items}"
        );
    }

    #[test]
    fn marker_attached_to_tag() {
        insta::assert_snapshot!(
            stream("<input {{#if on}}checked{{/if}}>"),
            @"<input/ {#if on} @checked @end {/if} >"
        );
    }

    #[test]
    fn marker_in_unquoted_value() {
        insta::assert_snapshot!(
            stream("<a href={{url}}>x</a>"),
            @"<a @href {url} @end > 'x' </a>"
        );
    }

    #[test]
    fn gt_inside_marker_does_not_close_tag() {
        insta::assert_snapshot!(
            stream("<p {{#a}}x{{/a}}/>"),
            @"<p/ {#a} @x @end {/a} >"
        );
    }

    #[test]
    fn handler_error_stops_tokenizing() {
        let err = tokenize("a\n{{fail}}<p>", Events::default()).err();
        assert_eq!(err.as_deref(), Some("failed on line 2"));
    }
}

// =============================================================================
// Cleaning
// =============================================================================

mod cleaning {
    use super::*;

    #[test]
    fn control_then_standalone() {
        let src = "<ul>\n  {{#list}}\n    <li>{{- . -}}</li>\n  {{/list}}\n</ul>";
        let cleaned = clean_line_endings(&clean_whitespace_control(src));
        assert_eq!(cleaned, "<ul>\n{{#list}}    <li>{{ . }}</li>\n{{/list}}</ul>");
    }
}
