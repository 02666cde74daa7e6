use serde::{Deserialize, Serialize};

/// 新闻条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    /// 原文链接，可能是占位符
    pub url: String,
    pub published_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl NewsItem {
    /// 新闻接口对已删除文章返回的占位标题
    pub const REMOVED_TITLE: &'static str = "[Removed]";

    /// 标题、摘要非空且不是已删除文章
    pub fn is_displayable(&self) -> bool {
        let title = self.title.trim();
        !title.is_empty() && title != Self::REMOVED_TITLE && !self.summary.trim().is_empty()
    }
}
