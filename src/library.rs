use crate::config::AppConfig;
use crate::encoding::{DetectMode, EncodingResolver};
use crate::error::{Result, ShelfError};
use crate::model::{with_wordcount_header, Chapter, NovelRecord, TocItem};
use crate::splitter::fallback::FallbackSegmenter;
use crate::splitter::split_lines;
use crate::store::NovelStore;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// 小说详情：元信息 + 目录
#[derive(Debug, Clone, Serialize)]
pub struct NovelInfo {
    pub meta: NovelRecord,
    pub toc: Vec<TocItem>,
}

/// 书库查询服务
///
/// 只读路径：详情、单章、整本下载。fallback 为真时不走库里的
/// 章节集，而是按标题找回原始文件做定长分块（无结构文档专用）
pub struct NovelLibrary<'a> {
    config: &'a AppConfig,
    store: &'a NovelStore,
}

impl<'a> NovelLibrary<'a> {
    pub fn new(config: &'a AppConfig, store: &'a NovelStore) -> Self {
        Self { config, store }
    }

    /// 小说详情与目录
    pub fn novel_info(&self, novel_id: i64, fallback: bool) -> Result<NovelInfo> {
        let record = self.require_novel(novel_id)?;
        let toc = if fallback {
            let chapters = self.read_fallback_chapters(&record)?;
            chapters.iter().map(TocItem::from).collect()
        } else {
            self.store.toc_by_novel_id(novel_id)?
        };
        Ok(NovelInfo { meta: record, toc })
    }

    /// 取单章，正文前附加字数行（纯变换，不改动存储值）
    pub fn chapter(&self, novel_id: i64, order_id: u32, fallback: bool) -> Result<Chapter> {
        let chapter = if fallback {
            let record = self.require_novel(novel_id)?;
            self.read_fallback_chapters(&record)?
                .into_iter()
                .find(|c| c.order_id == order_id)
        } else {
            self.store.chapter_by_order_id(novel_id, order_id)?
        };
        let chapter = chapter
            .ok_or_else(|| ShelfError::Validation(format!("章节不存在: {}", order_id)))?;
        Ok(with_wordcount_header(&chapter))
    }

    /// 整本下载
    ///
    /// # 参数
    /// - `raw`: 直接返回用入库编码重读出来的规范化全文
    /// - `fallback`: 用定长分块结果拼接
    pub fn download(&self, novel_id: i64, fallback: bool, raw: bool) -> Result<String> {
        let record = self.require_novel(novel_id)?;
        if raw {
            return self.read_normalized_text(&record);
        }
        let chapters = if fallback {
            self.read_fallback_chapters(&record)?
        } else {
            self.store.bulk_chapters_by_novel_id(novel_id)?
        };
        let mut text = String::new();
        for chapter in &chapters {
            let displayed = with_wordcount_header(chapter);
            text.push_str("# ");
            text.push_str(&displayed.title);
            text.push('\n');
            text.push_str(&displayed.content);
            text.push('\n');
        }
        Ok(text)
    }

    fn require_novel(&self, novel_id: i64) -> Result<NovelRecord> {
        self.store
            .find_novel_by_id(novel_id)?
            .ok_or_else(|| ShelfError::Validation(format!("novelId 不存在: {}", novel_id)))
    }

    /// 从磁盘找回原始文件，用入库时记录的编码重读出规范化全文
    ///
    /// 复用记录下来的编码而不是重新检测，保证与当初切章的
    /// 字节解读口径完全一致
    fn read_normalized_text(&self, record: &NovelRecord) -> Result<String> {
        let file = locate_novel_file(&self.config.fallback_novel_directory, &record.meta.title)?;
        let bytes = fs::read(&file)?;
        let resolver = EncodingResolver::new(self.config.crude_encoding_detect_sample_size);
        let info = resolver.resolve(&bytes, DetectMode::Full, Some(&record.meta.encoding))?;
        Ok(info.text)
    }

    /// fallback 路径：原始文件重读后按累计字数定长分块
    fn read_fallback_chapters(&self, record: &NovelRecord) -> Result<Vec<Chapter>> {
        let text = self.read_normalized_text(record)?;
        let lines = split_lines(&text);
        let segmenter = FallbackSegmenter::new(self.config.split_chapter_wordcount);
        Ok(segmenter.segment(&lines))
    }
}

/// 在目录下按标题（文件名去扩展名）查找 txt 原始文件
pub fn locate_novel_file(directory: &Path, title: &str) -> Result<PathBuf> {
    for entry in walkdir::WalkDir::new(directory) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("txt") {
            continue;
        }
        if path.file_stem().and_then(|s| s.to_str()) == Some(title) {
            return Ok(entry.into_path());
        }
    }
    Err(ShelfError::SourceNotFound(title.to_string()))
}
