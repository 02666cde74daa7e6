use serde::Serialize;
use std::fmt;

/// 数据来源标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// 第一个数据源成功返回
    Live,
    /// 后续备用数据源返回
    Fallback,
    /// 所有数据源失败，本地合成
    Mock,
}

impl Provenance {
    /// 根据数据源在降级链中的位置确定标记
    pub fn for_position(index: usize) -> Self {
        if index == 0 {
            Provenance::Live
        } else {
            Provenance::Fallback
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Fallback => "fallback",
            Provenance::Mock => "mock",
        }
    }

    /// 界面角标文字
    pub fn badge(&self) -> &'static str {
        match self {
            Provenance::Live => "LIVE",
            _ => "DEMO",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次获取的结果：数据加来源标记
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult<T> {
    pub data: T,
    pub provenance: Provenance,
    /// 产生数据的数据源名称，本地合成时为 "synthesizer"
    pub source: String,
}

impl<T> FetchResult<T> {
    pub const SYNTHESIZER: &'static str = "synthesizer";

    pub fn new(data: T, provenance: Provenance, source: &str) -> Self {
        Self {
            data,
            provenance,
            source: source.to_string(),
        }
    }

    pub fn mock(data: T) -> Self {
        Self::new(data, Provenance::Mock, Self::SYNTHESIZER)
    }

    pub fn is_live(&self) -> bool {
        self.provenance == Provenance::Live
    }
}
