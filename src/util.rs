use chrono::{SecondsFormat, Utc};

// 保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// 当前 UTC 时间，RFC 3339 格式
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// 截断过长的响应内容，用于日志
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

// 从数据源返回的文本中提取JSON
pub mod json_utils {
    use crate::errors::FetchError;
    use log::debug;
    use serde_json::Value;

    const FENCE: &str = "```";

    /// 取出第一个 ``` 代码块中的内容，没有代码块时原样返回
    pub fn strip_code_fences(text: &str) -> &str {
        let start = match text.find(FENCE) {
            Some(idx) => idx + FENCE.len(),
            None => return text,
        };

        // 跳过语言标记，例如 ```json
        let rest = &text[start..];
        let content_start = match rest.find('\n') {
            Some(nl) if rest[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => nl + 1,
            _ => 0,
        };
        let content = &rest[content_start..];

        match content.find(FENCE) {
            Some(end) => &content[..end],
            None => content,
        }
    }

    /// 截取第一个 `{` 或 `[` 到最后一个对应闭合符号之间的内容并解析
    pub fn extract_json(text: &str) -> Result<Value, FetchError> {
        let fenced = strip_code_fences(text);
        match extract_span(fenced) {
            Ok(value) => Ok(value),
            // 代码块之外也可能有完整JSON
            Err(e) if fenced.len() != text.len() => {
                debug!("Fenced block did not parse ({}), retrying on full text", e);
                extract_span(text)
            }
            Err(e) => Err(e),
        }
    }

    fn extract_span(text: &str) -> Result<Value, FetchError> {
        let mut openers: Vec<(usize, char)> = ['{', '[']
            .iter()
            .filter_map(|&c| text.find(c).map(|idx| (idx, c)))
            .collect();
        openers.sort_by_key(|&(idx, _)| idx);

        if openers.is_empty() {
            return Err(FetchError::JsonParse("no JSON object or array found".to_string()));
        }

        let mut last_err = None;
        for (start, opener) in openers {
            let closer = if opener == '{' { '}' } else { ']' };
            let end = match text.rfind(closer) {
                Some(end) if end > start => end,
                _ => {
                    last_err = Some(FetchError::JsonParse(format!(
                        "unterminated JSON starting with '{}'",
                        opener
                    )));
                    continue;
                }
            };

            match serde_json::from_str::<Value>(&text[start..=end]) {
                Ok(value) => return Ok(value),
                Err(e) => last_err = Some(FetchError::JsonParse(e.to_string())),
            }
        }

        Err(last_err.unwrap_or_else(|| FetchError::JsonParse("no JSON found".to_string())))
    }

}
