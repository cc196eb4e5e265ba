use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 抽取目标分类（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// 人物页（教师 / 员工简介）
    Person,
    /// 新闻页
    News,
    /// 主页
    Home,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Person, Category::News, Category::Home];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Person => "person",
            Category::News => "news",
            Category::Home => "home",
        }
    }

    /// 发送给生成服务的结构名称
    pub fn schema_name(&self) -> &'static str {
        match self {
            Category::Person => "Person",
            Category::News => "News",
            Category::Home => "HomePage",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "person" => Ok(Category::Person),
            "news" => Ok(Category::News),
            "home" => Ok(Category::Home),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}
