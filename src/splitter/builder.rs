use super::classifier::TitleClassifier;
use super::{line_indent, SegmentationStrategy};
use crate::model::Chapter;

/// 章节构建器
///
/// 拿到全部非空行和选定的策略后，单次正向扫描把文本划分成有序章节。
/// 每一行都恰好落入一个章节：要么成为标题，要么进入正文
pub struct ChapterBuilder<'a> {
    classifier: &'a TitleClassifier,
}

impl<'a> ChapterBuilder<'a> {
    pub fn new(classifier: &'a TitleClassifier) -> Self {
        Self { classifier }
    }

    /// 构建章节列表（orderId 从 0 开始）
    ///
    /// # 参数
    /// - `lines`: 全部非空行
    /// - `strategy`: 本书统一使用的切分策略
    ///
    /// 首个累积章节使用哨兵标题"开始"，承接第一个标题行之前的内容；
    /// 循环结束后末尾缓存区无条件落盘，正文尾部绝不丢失
    pub fn build(&self, lines: &[&str], strategy: &SegmentationStrategy) -> Vec<Chapter> {
        let mut chapters = Vec::new();

        // 缓存区数据
        let mut tmp_title = "开始".to_string();
        let mut tmp_content = String::new();
        let mut tmp_order_id: u32 = 0;

        for line in lines {
            if self.is_chapter_title(line, strategy) {
                // 先处理缓存区
                chapters.push(Chapter {
                    order_id: tmp_order_id,
                    title: tmp_title,
                    wordcount: tmp_content.chars().count(),
                    content: tmp_content,
                });
                tmp_title = line.trim().to_string();
                tmp_content = String::new();
                tmp_order_id += 1;
            } else {
                tmp_content.push_str(line.trim());
                tmp_content.push('\n');
            }
        }

        // 最后处理末尾缓存区
        chapters.push(Chapter {
            order_id: tmp_order_id,
            title: tmp_title,
            wordcount: tmp_content.chars().count(),
            content: tmp_content,
        });

        chapters
    }

    /// 按策略判断一行是否为章节标题
    fn is_chapter_title(&self, line: &str, strategy: &SegmentationStrategy) -> bool {
        match strategy {
            SegmentationStrategy::Indent { reference_indent } => {
                line_indent(line) != reference_indent
            }
            SegmentationStrategy::Signifier { pattern } => {
                self.classifier.is_title_line(line, pattern.as_ref())
            }
        }
    }
}
