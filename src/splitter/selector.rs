use super::classifier::TitleClassifier;
use super::{line_indent, SegmentationStrategy};
use tracing::debug;

/// 切分策略选择器
///
/// 只统计文档前若干行（有界开销），据此为整本书决定一种切分策略。
/// 前缀之外的部分默认遵循同样的排版约定，不再回头检查
pub struct StrategySelector {
    /// 参与统计的前缀行数
    analyze_line_count: usize,
    /// 标题行数量阈值
    title_signifier_count: usize,
}

impl StrategySelector {
    pub fn new(analyze_line_count: usize, title_signifier_count: usize) -> Self {
        Self {
            analyze_line_count,
            title_signifier_count,
        }
    }

    /// 为整份文档选择切分策略
    ///
    /// # 参数
    /// - `lines`: 全部非空行（只读取前 analyze_line_count 行）
    /// - `classifier`: 标题行分类器
    ///
    /// 判定顺序：
    /// 1. 前缀恰好两种缩进，且参考缩进之外的行数达到阈值 →
    ///    缩进策略（正文缩进整齐、离群缩进就是标题，这是最强信号）
    /// 2. 标志词标题行数达到阈值，或前缀只有一种缩进
    ///    （缩进完全没有信号）→ 标志词策略
    /// 3. 否则仍然退回缩进策略
    pub fn select(&self, lines: &[&str], classifier: &TitleClassifier) -> SegmentationStrategy {
        let prefix = &lines[..lines.len().min(self.analyze_line_count)];

        let indent_map = indent_frequency(prefix);
        debug!("缩进统计表: {:?}", indent_map);

        let (reference_indent, reference_count) = most_frequent(&indent_map);

        // 完美缩进：只有正文缩进和标题缩进两种，离群行足够多
        if indent_map.len() == 2 && prefix.len() - reference_count >= self.title_signifier_count {
            debug!(
                "前{}行中缩进离群行数量: {}",
                prefix.len(),
                prefix.len() - reference_count
            );
            return SegmentationStrategy::Indent {
                reference_indent: reference_indent.to_string(),
            };
        }

        // 统计整个前缀中符合标志词启发式的行数（不做任何预过滤）
        let signifier_count = prefix
            .iter()
            .filter(|line| classifier.is_title(line))
            .count();
        debug!("前{}行中标志词标题行数量: {}", prefix.len(), signifier_count);

        if signifier_count >= self.title_signifier_count || indent_map.len() == 1 {
            return SegmentationStrategy::Signifier { pattern: None };
        }

        // 两边阈值都没达到时静默退回缩进策略
        SegmentationStrategy::Indent {
            reference_indent: reference_indent.to_string(),
        }
    }

    /// 计算前缀中的参考缩进（出现最多的缩进）
    ///
    /// 供强制缩进切分的调用方单独取用
    pub fn reference_indent(&self, lines: &[&str]) -> String {
        let prefix = &lines[..lines.len().min(self.analyze_line_count)];
        let indent_map = indent_frequency(prefix);
        most_frequent(&indent_map).0.to_string()
    }
}

/// 构建缩进出现频次表，保持首次出现的顺序
fn indent_frequency<'a>(prefix: &[&'a str]) -> Vec<(&'a str, usize)> {
    let mut map: Vec<(&str, usize)> = Vec::new();
    for line in prefix {
        let indent = line_indent(line);
        match map.iter_mut().find(|(known, _)| *known == indent) {
            Some((_, count)) => *count += 1,
            None => map.push((indent, 1)),
        }
    }
    map
}

/// 取频次最高的缩进
///
/// 并列时先出现者胜出，后来的同频缩进不会顶替它
fn most_frequent<'a>(indent_map: &[(&'a str, usize)]) -> (&'a str, usize) {
    let mut most = ("", 0);
    for &(indent, count) in indent_map {
        if count > most.1 {
            most = (indent, count);
        }
    }
    most
}
