//! Integration tests for standalone-line trimming.
//!
//! A line holding only whitespace and a single section, inverted section,
//! comment, or delimiter tag is removed from the output entirely. Partial
//! tags keep their surrounding whitespace.

use std::sync::Arc;

use serde_json::json;
use stache_rs_template::loaders::StringLoader;
use stache_rs_template::Compiler;

fn render(source: &str, data: serde_json::Value) -> String {
    Compiler::default()
        .compile(source)
        .unwrap()
        .execute(data)
        .unwrap()
}

// ── Sections ────────────────────────────────────────────────────────

#[test]
fn test_standalone_section_lines_removed() {
    let out = render("Begin.\n{{#a}}\nInside\n{{/a}}\nEnd.\n", json!({"a": true}));
    assert_eq!(out, "Begin.\nInside\nEnd.\n");
}

#[test]
fn test_standalone_false_section_leaves_no_blank_line() {
    let out = render("Begin.\n{{#a}}\nInside\n{{/a}}\nEnd.\n", json!({"a": false}));
    assert_eq!(out, "Begin.\nEnd.\n");
}

#[test]
fn test_indented_standalone_tags() {
    let out = render("  {{#a}}\n  x\n  {{/a}}\n", json!({"a": true}));
    assert_eq!(out, "  x\n");
}

#[test]
fn test_standalone_inverted_section() {
    let out = render("{{^a}}\nnone\n{{/a}}\n", json!({"a": []}));
    assert_eq!(out, "none\n");
}

#[test]
fn test_nested_standalone_sections() {
    let out = render(
        "{{#a}}\n{{#b}}\n{{c}}\n{{/b}}\n{{/a}}\n",
        json!({"a": {"b": [{"c": 1}, {"c": 2}]}}),
    );
    assert_eq!(out, "1\n2\n");
}

#[test]
fn test_list_rows() {
    let out = render(
        "<ul>\n{{#items}}\n  <li>{{.}}</li>\n{{/items}}\n</ul>\n",
        json!({"items": ["a", "b"]}),
    );
    assert_eq!(out, "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n");
}

#[test]
fn test_crlf_line_endings() {
    let out = render("{{#a}}\r\nx\r\n{{/a}}\r\n", json!({"a": true}));
    assert_eq!(out, "x\r\n");
}

// ── Non-standalone tags ─────────────────────────────────────────────

#[test]
fn test_inline_section_keeps_whitespace() {
    let out = render(" {{#a}}x{{/a}} \n", json!({"a": true}));
    assert_eq!(out, " x \n");
}

#[test]
fn test_variables_are_never_standalone() {
    let out = render("a\n{{v}}\nb\n", json!({"v": ""}));
    assert_eq!(out, "a\n\nb\n");
}

#[test]
fn test_two_tags_on_a_line_are_not_standalone() {
    let out = render("{{#a}}{{/a}}\nx\n", json!({"a": true}));
    assert_eq!(out, "\nx\n");
}

#[test]
fn test_partial_lines_are_not_standalone() {
    let loader: StringLoader = [("item", "- {{.}}\n")].into_iter().collect();
    let template = Compiler::default()
        .with_loader(Arc::new(loader))
        .compile("{{#xs}}\n  {{>item}}\n{{/xs}}\n")
        .unwrap();
    let out = template.execute(json!({"xs": ["a", "b"]})).unwrap();
    assert_eq!(out, "  - a\n\n  - b\n\n");
}

// ── Comments and delimiters ─────────────────────────────────────────

#[test]
fn test_standalone_comment() {
    let out = render("a\n  {{! note }}\nb\n", json!({}));
    assert_eq!(out, "a\nb\n");
}

#[test]
fn test_inline_comment() {
    let out = render("a {{! note }} b\n", json!({}));
    assert_eq!(out, "a  b\n");
}

#[test]
fn test_standalone_delimiter_change() {
    let out = render("{{=<% %>=}}\n<%a%>\n", json!({"a": "A"}));
    assert_eq!(out, "A\n");
}
