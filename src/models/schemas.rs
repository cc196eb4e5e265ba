//! 三种分类的结构约束
//!
//! 这些类型只是校验边界，不是有独立生命周期的领域对象。
//! 发给生成服务的 JSON Schema 由 schemars 从这里生成，
//! 返回对象反序列化成功并通过 `validate()` 才算结构校验通过。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ValidationError;
use crate::models::category::Category;

/// SEO 元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadata {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// 图片引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// 带文字的链接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkRef {
    pub label: String,
    pub url: String,
}

/// 联系方式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,
    /// 个人主页、ORCID、Google Scholar、LinkedIn 等
    #[serde(default)]
    pub links: Vec<LinkRef>,
}

/// 人物页
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// 称谓前缀，如 "Dr."、"Prof."
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_nominal: Option<String>,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    /// 称谓后缀，如 "PhD"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_nominal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub seo: SeoMetadata,
    #[serde(default)]
    pub contact: ContactInfo,
    /// 简介、研究方向等自由文本
    #[serde(default)]
    pub content: String,
}

impl Person {
    /// 完整姓名（含称谓）
    pub fn display_name(&self) -> String {
        [
            self.pre_nominal.as_deref(),
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// 富文本节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RichTextKind {
    Paragraph,
    Heading,
    List,
    ListItem,
    Quote,
    Link,
    Image,
    Text,
}

/// 富文本内容树
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: RichTextKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 链接或图片地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// 标题层级 1-6
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default)]
    pub children: Vec<RichTextNode>,
}

/// 新闻页
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    pub content: Vec<RichTextNode>,
    /// ISO-8601 日期
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoMetadata>,
    /// 文章中嵌入的视频 / 地图等 iframe 地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_links: Option<Vec<String>>,
}

/// 主页首屏
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeroSection {
    pub heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// 主页内容区块
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageSection {
    pub heading: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub links: Vec<LinkRef>,
}

/// 主页
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero: Option<HeroSection>,
    #[serde(default)]
    pub sections: Vec<PageSection>,
    #[serde(default)]
    pub news_links: Vec<LinkRef>,
    #[serde(default)]
    pub navigation: Vec<LinkRef>,
}

/// 结构约束
pub trait SchemaContract: Sized + serde::de::DeserializeOwned + JsonSchema {
    const NAME: &'static str;

    /// serde 覆盖不到的必填约束
    fn validate(&self) -> Result<(), String>;
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("必填字段 {} 为空", field))
    } else {
        Ok(())
    }
}

impl SchemaContract for Person {
    const NAME: &'static str = "Person";

    fn validate(&self) -> Result<(), String> {
        require("firstName", &self.first_name)?;
        require("lastName", &self.last_name)
    }
}

impl SchemaContract for News {
    const NAME: &'static str = "News";

    fn validate(&self) -> Result<(), String> {
        require("name", &self.name)?;
        require("slug", &self.slug)?;
        if self.slug.chars().any(char::is_whitespace) {
            return Err(format!("slug '{}' 不能包含空白字符", self.slug));
        }
        if self.content.is_empty() {
            return Err("content 不能为空".to_string());
        }
        Ok(())
    }
}

impl SchemaContract for HomePage {
    const NAME: &'static str = "HomePage";

    fn validate(&self) -> Result<(), String> {
        require("title", &self.title)
    }
}

fn parse_contract<T: SchemaContract>(value: JsonValue) -> Result<T, ValidationError> {
    let parsed: T = serde_json::from_value(value).map_err(|e| ValidationError::SchemaMismatch {
        schema: T::NAME.to_string(),
        message: e.to_string(),
    })?;
    parsed
        .validate()
        .map_err(|message| ValidationError::SchemaMismatch {
            schema: T::NAME.to_string(),
            message,
        })?;
    Ok(parsed)
}

fn schema_value<T: JsonSchema>() -> JsonValue {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

/// 按分类区分的抽取数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "data", rename_all = "lowercase")]
pub enum CategoryData {
    Person(Person),
    News(News),
    Home(HomePage),
}

impl CategoryData {
    /// 按分类校验生成服务返回的对象
    pub fn from_value(category: Category, value: JsonValue) -> Result<Self, ValidationError> {
        match category {
            Category::Person => parse_contract(value).map(CategoryData::Person),
            Category::News => parse_contract(value).map(CategoryData::News),
            Category::Home => parse_contract(value).map(CategoryData::Home),
        }
    }

    /// 分类对应的 JSON Schema
    pub fn json_schema(category: Category) -> JsonValue {
        match category {
            Category::Person => schema_value::<Person>(),
            Category::News => schema_value::<News>(),
            Category::Home => schema_value::<HomePage>(),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            CategoryData::Person(_) => Category::Person,
            CategoryData::News(_) => Category::News,
            CategoryData::Home(_) => Category::Home,
        }
    }

    /// 结果标题
    pub fn title(&self) -> String {
        match self {
            CategoryData::Person(person) => person.display_name(),
            CategoryData::News(news) => news.name.trim().to_string(),
            CategoryData::Home(home) => home.title.trim().to_string(),
        }
    }

    /// 是否满足所属分类的结构约束
    pub fn is_valid(&self) -> bool {
        match self {
            CategoryData::Person(p) => p.validate().is_ok(),
            CategoryData::News(n) => n.validate().is_ok(),
            CategoryData::Home(h) => h.validate().is_ok(),
        }
    }

    pub fn as_person(&self) -> Option<&Person> {
        match self {
            CategoryData::Person(p) => Some(p),
            _ => None,
        }
    }
}
