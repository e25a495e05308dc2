use regex::Regex;

// 子模块声明
pub mod builder;
pub mod classifier;
pub mod fallback;
pub mod selector;


/// 章节切分策略
///
/// 一份文档只能由一种策略统一切分，不支持混用
#[derive(Debug, Clone)]
pub enum SegmentationStrategy {
    /// 缩进策略：缩进与正文参考缩进不同的行即为标题
    Indent {
        /// 正文段落的参考缩进（前缀中出现最多的缩进）
        reference_indent: String,
    },
    /// 标志词策略：按"第x章"等标志词识别标题，
    /// 可携带管理员指定的自定义正则覆盖内置规则
    Signifier { pattern: Option<Regex> },
}

/// 把规范化文本拆成非空行序列
///
/// 纯空白行在这里被丢弃，下游所有组件都以"看不到空行"为前提
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// 取一行的前导空白前缀（可能为空串）
pub fn line_indent(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}
