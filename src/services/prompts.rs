//! 提示词
//!
//! 每个分类一段系统提示词，用户消息由页面来源拼出

use crate::infrastructure::Source;
use crate::models::Category;

const PERSON_PROMPT: &str = "You extract structured profile data from a university faculty or staff page. \
Return exactly one person: the subject of the page, not people mentioned in navigation or related links. \
Split the name into preNominal (e.g. \"Dr.\", \"Prof.\"), firstName, middleName, lastName and postNominal (e.g. \"PhD\"). \
Copy position, department, contact details and image URLs verbatim from the page. \
Put the biography and research summary into content as plain text. \
Never invent values; omit optional fields that the page does not state.";

const NEWS_PROMPT: &str = "You extract a single news article from a university news page. \
name is the headline. slug is a lowercase, hyphen-separated identifier derived from the headline with no spaces. \
content is the article body as a rich-text tree of headings, paragraphs, lists, quotes, links and images, \
in reading order, excluding navigation, footers and related-article teasers. \
Use ISO 8601 (YYYY-MM-DD) for publishDate when the page states one. \
List embedded video or iframe sources in iframeLinks. Never invent values.";

const HOME_PROMPT: &str = "You extract the structure of a university or department home page. \
title is the site or page title. Capture the hero banner, each content section with its heading, \
a one or two sentence summary and its links, the linked news items, and the primary navigation links. \
Use absolute URLs as they appear in the page. Never invent values.";

/// 分类对应的系统提示词
pub fn system_prompt(category: Category) -> &'static str {
    match category {
        Category::Person => PERSON_PROMPT,
        Category::News => NEWS_PROMPT,
        Category::Home => HOME_PROMPT,
    }
}

/// 根据页面来源构造用户消息
pub fn user_message(source: &Source) -> String {
    match source {
        Source::Url { url } => format!(
            "Extract the data from the page at this URL: {url}\n\nReturn only the JSON object."
        ),
        Source::Html { url, html } => format!(
            "Extract the data from the following page.\n\nPage URL: {url}\n\nHTML:\n{html}\n\nReturn only the JSON object."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_category_has_distinct_prompt() {
        let prompts: Vec<&str> = Category::ALL.iter().map(|c| system_prompt(*c)).collect();
        assert_eq!(prompts.len(), 3);
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        assert!(system_prompt(Category::News).contains("slug"));
    }

    #[test]
    fn test_user_message_embeds_html() {
        let source = Source::Html {
            url: "https://example.edu/p/jane".to_string(),
            html: "<h1>Jane Doe</h1>".to_string(),
        };
        let message = user_message(&source);
        assert!(message.contains("https://example.edu/p/jane"));
        assert!(message.contains("<h1>Jane Doe</h1>"));
    }

    #[test]
    fn test_user_message_for_url_source() {
        let source = Source::Url {
            url: "https://example.edu".to_string(),
        };
        assert!(user_message(&source).contains("https://example.edu"));
    }
}
