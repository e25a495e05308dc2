use crate::error::{Result, ShelfError};
use regex::{Regex, RegexBuilder};

/// 自定义标志词正则的编译大小上限，防止病态模式耗尽内存
const SIGNIFIER_PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// 标题行分类器
///
/// 判断一行在结构上是否像章节标题。内置启发式规则：
/// 行内去空白后足够短，并且带有数字/中文数字 + 章节标志词，
/// 或者带有"番外"、"特别篇"这类内容标记
pub struct TitleClassifier {
    /// 标题行去空白后的最大字数
    max_title_wordcount: usize,
    /// 内置标志词模式列表
    signifier_patterns: Vec<Regex>,
}

impl TitleClassifier {
    /// 创建分类器
    ///
    /// 短行 + 编号短语是这个语料里跨文档最稳的标题信号；
    /// 任意长的行一律视为正文，哪怕里面恰好出现数字
    pub fn new(max_title_wordcount: usize) -> Self {
        let signifier_patterns = vec![
            // 第x章 / x回 / x话 / "1."、"1、" 等编号格式
            Regex::new(r"[1-9一二三四五六七八九十]+(章|回|幕|话|节|\.|、|:|：|，| )+").unwrap(),
            // 番外
            Regex::new(r"番外").unwrap(),
            // 特别篇
            Regex::new(r"特别篇").unwrap(),
        ];

        Self {
            max_title_wordcount,
            signifier_patterns,
        }
    }

    /// 按内置启发式判断一行是否为标题行
    pub fn is_title(&self, line: &str) -> bool {
        let stripped_len = line.chars().filter(|c| !c.is_whitespace()).count();
        if stripped_len > self.max_title_wordcount {
            return false;
        }
        self.signifier_patterns
            .iter()
            .any(|pattern| pattern.is_match(line))
    }

    /// 判断一行是否为标题行
    ///
    /// # 参数
    /// - `line`: 待判断的行
    /// - `pattern`: 自定义正则；提供时完全覆盖内置规则，长度限制也不生效
    pub fn is_title_line(&self, line: &str, pattern: Option<&Regex>) -> bool {
        match pattern {
            Some(custom) => custom.is_match(line),
            None => self.is_title(line),
        }
    }
}

/// 编译管理员提供的自定义标志词正则
///
/// 编译失败或超出大小上限返回 Validation 错误，
/// 匹配本身由 regex 引擎保证线性时间
pub fn compile_signifier(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .size_limit(SIGNIFIER_PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|e| ShelfError::Validation(format!("非法的标志词正则 {:?}: {}", pattern, e)))
}
