//! HTML 清洗 - 业务能力层
//!
//! 在交给生成服务之前压缩页面体积：去掉脚本/样式/元数据、
//! 去掉展示属性、折叠空白，再按字符数截断。结果是确定性的。

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use crate::utils::html::{escape_text, ParsedHtml, Rewrite, Rewriter};

/// 截断标记
pub const TRUNCATION_MARKER: &str = "...[truncated]";

/// 整个丢弃的元素
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "meta", "link"];

/// 只影响展示的属性
const PRESENTATION_ATTRS: &[&str] = &["class", "style", "id"];

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

struct Normalizer;

impl Rewriter for Normalizer {
    fn element(&self, element: &ElementRef<'_>) -> Rewrite {
        if DROPPED_ELEMENTS.contains(&element.value().name()) {
            Rewrite::Drop
        } else {
            Rewrite::Keep
        }
    }

    fn keep_attr(&self, _element: &str, attr: &str) -> bool {
        !PRESENTATION_ATTRS.contains(&attr)
    }

    fn keep_comments(&self) -> bool {
        false
    }

    /// 标签之间的纯空白直接丢弃，其余空白折叠成一个空格
    fn text(&self, text: &str, out: &mut String) {
        if text.trim().is_empty() {
            return;
        }
        escape_text(&WHITESPACE_RE.replace_all(text, " "), out);
    }
}

/// 清洗 HTML 并截断到 `max_chars` 个字符
pub fn normalize_html(html: &str, max_chars: usize) -> String {
    let cleaned = ParsedHtml::parse(html).render(&Normalizer);
    truncate_chars(cleaned.trim(), max_chars)
}

/// 按字符（不是字节）截断，截断时追加标记
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
