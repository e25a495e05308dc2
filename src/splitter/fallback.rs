use crate::model::{number_with_commas, Chapter};

/// 兜底分块切分器
///
/// 完全没有结构标记的文档走这条路：不做任何结构推断，
/// 按累计字数切成定长块，标题用块序号合成。
/// 由调用方显式选择，不参与策略推断
pub struct FallbackSegmenter {
    /// 单块字数上限
    max_chunk_wordcount: usize,
}

impl FallbackSegmenter {
    pub fn new(max_chunk_wordcount: usize) -> Self {
        Self { max_chunk_wordcount }
    }

    /// 按累计字数切块（orderId 从 0 开始）
    ///
    /// 每一行恰好被消费一次；累计字数达到上限即封块，
    /// 循环结束后末尾缓存区无条件落盘，不足上限的最后一块照常保留
    pub fn segment(&self, lines: &[&str]) -> Vec<Chapter> {
        let mut chapters = Vec::new();

        let mut tmp_content = String::new();
        let mut tmp_wordcount = 0usize;
        let mut tmp_order_id: u32 = 0;

        for line in lines {
            let trimmed = line.trim();
            tmp_content.push_str(trimmed);
            tmp_content.push('\n');
            tmp_wordcount += trimmed.chars().count() + 1;

            if tmp_wordcount >= self.max_chunk_wordcount {
                chapters.push(Self::make_chapter(tmp_order_id, tmp_content, tmp_wordcount));
                tmp_content = String::new();
                tmp_wordcount = 0;
                tmp_order_id += 1;
            }
        }

        chapters.push(Self::make_chapter(tmp_order_id, tmp_content, tmp_wordcount));
        chapters
    }

    fn make_chapter(order_id: u32, content: String, wordcount: usize) -> Chapter {
        Chapter {
            order_id,
            // 标题为 1 起始的块序号，千位加逗号
            title: number_with_commas(order_id as usize + 1),
            content,
            wordcount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_boundary() {
        // 3 行各 40 字（共 120），上限 100：恰好 2 章，
        // 第一章字数 >= 100，第二章承接剩余部分
        let line = "安".repeat(40);
        let lines: Vec<&str> = vec![&line, &line, &line];
        let segmenter = FallbackSegmenter::new(100);
        let chapters = segmenter.segment(&lines);

        assert_eq!(chapters.len(), 2);
        assert!(chapters[0].wordcount >= 100);
        assert_eq!(chapters[1].wordcount, 0);
    }

    #[test]
    fn test_short_document_is_single_chunk() {
        let lines = vec!["很短的一行", "另一行"];
        let segmenter = FallbackSegmenter::new(100);
        let chapters = segmenter.segment(&lines);

        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "1");
        assert_eq!(chapters[0].content, "很短的一行\n另一行\n");
    }

    #[test]
    fn test_synthetic_titles_are_running_index() {
        let line = "字".repeat(10);
        let lines: Vec<&str> = (0..6).map(|_| line.as_str()).collect();
        let segmenter = FallbackSegmenter::new(20);
        let chapters = segmenter.segment(&lines);

        let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
        // 每 2 行满 22 字封一块，6 行 → 3 块 + 末尾空块
        assert_eq!(titles, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_every_line_consumed_once() {
        let lines = vec!["  第一行", "第二行", "  第三行", "第四行"];
        let segmenter = FallbackSegmenter::new(10);
        let chapters = segmenter.segment(&lines);

        let rejoined: String = chapters.iter().map(|c| c.content.as_str()).collect();
        let expected: String = lines.iter().map(|l| format!("{}\n", l.trim())).collect();
        assert_eq!(rejoined, expected);
    }

    #[test]
    fn test_order_id_density() {
        let line = "字".repeat(30);
        let lines: Vec<&str> = (0..10).map(|_| line.as_str()).collect();
        let segmenter = FallbackSegmenter::new(50);
        let chapters = segmenter.segment(&lines);
        for (i, chapter) in chapters.iter().enumerate() {
            assert_eq!(chapter.order_id, i as u32);
        }
    }
}
