//! HTML 解析与重写
//!
//! 页面先由 scraper 解析成 DOM，再按 `Rewriter` 的决定逐节点写回字符串。
//! 清洗和 iframe 展开都基于这一遍遍历，不在原始文本上做替换。

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};

static DOCUMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:!doctype|html|head|body)\b").expect("document regex"));

/// 没有结束标签的元素
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// 对一个元素的处理方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Keep,
    Drop,
    /// 用一段原样输出的 HTML 替换整个元素
    Replace(String),
}

/// 序列化时的节点级钩子
pub trait Rewriter {
    fn element(&self, _element: &ElementRef<'_>) -> Rewrite {
        Rewrite::Keep
    }

    fn keep_attr(&self, _element: &str, _attr: &str) -> bool {
        true
    }

    fn keep_comments(&self) -> bool {
        true
    }

    /// 写出文本节点，`text` 已解码
    fn text(&self, text: &str, out: &mut String) {
        escape_text(text, out);
    }
}

/// 完整文档还是片段
#[derive(Debug)]
pub struct ParsedHtml {
    html: Html,
    is_document: bool,
}

impl ParsedHtml {
    /// 有 `<html>` / `<body>` 等外层标签时按完整文档解析，否则按片段解析
    pub fn parse(source: &str) -> Self {
        let is_document = DOCUMENT_RE.is_match(source);
        let html = if is_document {
            Html::parse_document(source)
        } else {
            Html::parse_fragment(source)
        };
        Self { html, is_document }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// 按 rewriter 写回 HTML；片段不会带上解析器补出的 `<html>` 外壳
    pub fn render(&self, rewriter: &impl Rewriter) -> String {
        let mut out = String::new();
        let root = self.html.root_element();
        if self.is_document {
            write_element(root, rewriter, &mut out);
        } else {
            write_children(root, rewriter, &mut out);
        }
        out
    }
}

fn write_children(element: ElementRef<'_>, rewriter: &impl Rewriter, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            write_element(child_element, rewriter, out);
            continue;
        }
        match child.value() {
            Node::Text(text) => rewriter.text(text, out),
            Node::Comment(comment) if rewriter.keep_comments() => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, rewriter: &impl Rewriter, out: &mut String) {
    match rewriter.element(&element) {
        Rewrite::Drop => return,
        Rewrite::Replace(html) => {
            out.push_str(&html);
            return;
        }
        Rewrite::Keep => {}
    }

    let value = element.value();
    let name = value.name();
    out.push('<');
    out.push_str(name);
    for (attr, attr_value) in value.attrs() {
        if rewriter.keep_attr(name, attr) {
            out.push(' ');
            out.push_str(attr);
            out.push_str("=\"");
            escape_attr(attr_value, out);
            out.push('"');
        }
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(element, rewriter, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

pub fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

pub fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;
    impl Rewriter for Identity {}

    #[test]
    fn test_fragment_has_no_shell() {
        let parsed = ParsedHtml::parse(r#"<p class="x">a &amp; b</p><br><!-- c -->"#);
        assert_eq!(
            parsed.render(&Identity),
            r#"<p class="x">a &amp; b</p><br><!-- c -->"#
        );
    }

    #[test]
    fn test_document_keeps_shell() {
        let parsed = ParsedHtml::parse("<html><body><p>hi</p></body></html>");
        assert_eq!(
            parsed.render(&Identity),
            "<html><head></head><body><p>hi</p></body></html>"
        );
    }

    #[test]
    fn test_attribute_values_are_reescaped() {
        let parsed = ParsedHtml::parse(r#"<a href="/x?a=1&amp;b=2" title='say "hi"'>x</a>"#);
        assert_eq!(
            parsed.render(&Identity),
            r#"<a href="/x?a=1&amp;b=2" title="say &quot;hi&quot;">x</a>"#
        );
    }
}
