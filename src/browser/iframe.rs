//! iframe 展开
//!
//! 在解析后的 DOM 上把已渲染的 iframe 内容拼回父页面，不依赖浏览器

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::utils::html::{escape_attr, ParsedHtml, Rewrite, Rewriter};

static IFRAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src]").expect("iframe selector"));

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector"));

/// 一个已渲染的 iframe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinedFrame {
    /// iframe 元素的 src 属性值（已解码，与 DOM API 返回的一致）
    pub src: String,
    /// iframe 文档 body 内的 HTML
    pub html: String,
}

/// 取出 `<body>` 内部的 HTML，没有 body 时原样返回
pub fn body_of(html: &str) -> String {
    let parsed = ParsedHtml::parse(html);
    parsed
        .html()
        .select(&BODY_SELECTOR)
        .next()
        .map(|body| body.inner_html())
        .unwrap_or_else(|| html.to_string())
}

/// 把 iframe 的 src 解析为可访问的绝对地址
///
/// 空值、`about:` / `javascript:` / `data:` 等非 http(s) 地址返回 None
pub fn resolve_frame_url(page_url: &str, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let base = Url::parse(page_url).ok()?;
    let resolved = base.join(src).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// 页面中所有 iframe 的 src 属性（已解码），按文档顺序去重
pub fn iframe_sources(html: &str) -> Vec<String> {
    let parsed = ParsedHtml::parse(html);
    let mut sources: Vec<String> = Vec::new();
    for element in parsed.html().select(&IFRAME_SELECTOR) {
        if let Some(src) = element.value().attr("src") {
            if !sources.iter().any(|seen| seen == src) {
                sources.push(src.to_string());
            }
        }
    }
    sources
}

struct FrameInliner<'a> {
    frames: &'a [InlinedFrame],
}

impl Rewriter for FrameInliner<'_> {
    fn element(&self, element: &ElementRef<'_>) -> Rewrite {
        let value = element.value();
        if value.name() != "iframe" {
            return Rewrite::Keep;
        }
        let Some(src) = value.attr("src") else {
            return Rewrite::Keep;
        };
        match self.frames.iter().find(|frame| frame.src == src) {
            Some(frame) => {
                let mut div = String::from(r#"<div data-iframe-src=""#);
                escape_attr(src, &mut div);
                div.push_str("\">");
                div.push_str(&frame.html);
                div.push_str("</div>");
                Rewrite::Replace(div)
            }
            None => Rewrite::Keep,
        }
    }
}

/// 用渲染后的内容替换对应的 `<iframe>` 元素
///
/// 按解码后的 src 匹配；没有匹配内容的 iframe 保持原样
pub fn inline_iframes(html: &str, frames: &[InlinedFrame]) -> String {
    if frames.is_empty() {
        return html.to_string();
    }
    ParsedHtml::parse(html).render(&FrameInliner { frames })
}
