use crate::config::AppConfig;
use crate::encoding::{DetectMode, EncodingResolver};
use crate::error::{Result, ShelfError};
use crate::library::locate_novel_file;
use crate::model::NovelMeta;
use crate::splitter::builder::ChapterBuilder;
use crate::splitter::classifier::{compile_signifier, TitleClassifier};
use crate::splitter::selector::StrategySelector;
use crate::splitter::{split_lines, SegmentationStrategy};
use crate::store::NovelStore;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 导入选项
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// 目标为文件夹时递归遍历子文件夹
    pub recursive: bool,
    /// 导入时附加的标签
    pub tags: Vec<String>,
    /// 覆盖已存在同标题的小说
    pub overwrite: bool,
    /// 强制使用缩进策略切分
    pub force_indent: bool,
}

/// 单个文件的导入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// 已入库（携带小说 id 与章节数）
    Imported { novel_id: i64, chapter_count: usize },
    /// 同标题已存在且未要求覆盖，跳过
    SkippedExisting,
}

/// 批量导入的汇总
#[derive(Debug, Default, Clone)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 导入器
///
/// 驱动完整管线：读字节 → 编码解析 → 拆非空行 → 选策略 →
/// 构建章节 → 一次事务覆盖入库。批量导入时单个文件失败
/// 只记日志并继续，绝不中断整批
pub struct Importer<'a> {
    config: &'a AppConfig,
    store: &'a mut NovelStore,
    resolver: EncodingResolver,
    classifier: TitleClassifier,
    selector: StrategySelector,
}

impl<'a> Importer<'a> {
    pub fn new(config: &'a AppConfig, store: &'a mut NovelStore) -> Self {
        Self {
            resolver: EncodingResolver::new(config.crude_encoding_detect_sample_size),
            classifier: TitleClassifier::new(config.max_title_wordcount),
            selector: StrategySelector::new(
                config.analyze_line_count,
                config.title_signifier_count,
            ),
            config,
            store,
        }
    }

    /// 导入一个文件或文件夹
    pub fn import_path(&mut self, path: &Path, options: &ImportOptions) -> Result<ImportSummary> {
        if !path.exists() {
            return Err(ShelfError::Validation(format!(
                "文件或文件夹不存在: {}",
                path.display()
            )));
        }

        let files = collect_files(path, options.recursive)?;
        let mut summary = ImportSummary::default();
        for file in &files {
            match self.import_file(file, options) {
                Ok(ImportOutcome::Imported { novel_id, chapter_count }) => {
                    debug!(
                        "已导入 {} (id={}, {} 章)",
                        file.display(),
                        novel_id,
                        chapter_count
                    );
                    summary.imported += 1;
                }
                Ok(ImportOutcome::SkippedExisting) => {
                    debug!("跳过已存在: {}", file.display());
                    summary.skipped += 1;
                }
                // 单文件失败隔离：记日志，继续下一个
                Err(e) => {
                    warn!("导入失败 {}: {}", file.display(), e);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// 导入单个 txt 文件
    pub fn import_file(&mut self, path: &Path, options: &ImportOptions) -> Result<ImportOutcome> {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ShelfError::Validation(format!("无法从文件名取书名: {}", path.display()))
            })?
            .to_string();

        let existing_id = self.store.find_novel_id_by_title(&title)?;
        if existing_id.is_some() && !options.overwrite {
            return Ok(ImportOutcome::SkippedExisting);
        }
        debug!("开始处理: {}", title);

        let bytes = fs::read(path)?;
        // 批量导入用粗略检测，采样大小来自配置
        let info = self.resolver.resolve(&bytes, DetectMode::Crude, None)?;
        let lines = split_lines(&info.text);

        let strategy = if options.force_indent {
            SegmentationStrategy::Indent {
                reference_indent: self.selector.reference_indent(&lines),
            }
        } else {
            self.selector.select(&lines, &self.classifier)
        };
        debug!("采用策略: {:?}", strategy);

        let chapters = ChapterBuilder::new(&self.classifier).build(&lines, &strategy);
        let meta = derive_meta(existing_id, title, &info.text, &lines, &info.encoding_name);

        let novel_id = self
            .store
            .overwrite_novel(&meta, &options.tags, &chapters)?;
        Ok(ImportOutcome::Imported {
            novel_id,
            chapter_count: chapters.len(),
        })
    }

    /// 用管理员指定的标志词正则重新切分一本已入库的小说
    ///
    /// 从磁盘按标题找回原始文件，并复用入库时记录的编码重读，
    /// 保证与当初切章的字节解读口径一致
    pub fn resplit_with_signifier(&mut self, novel_id: i64, pattern: &str) -> Result<usize> {
        let compiled = compile_signifier(pattern)?;
        let record = self
            .store
            .find_novel_by_id(novel_id)?
            .ok_or_else(|| ShelfError::Validation(format!("novelId 不存在: {}", novel_id)))?;

        let file = locate_novel_file(&self.config.fallback_novel_directory, &record.meta.title)?;
        let bytes = fs::read(&file)?;
        let info = self
            .resolver
            .resolve(&bytes, DetectMode::Full, Some(&record.meta.encoding))?;
        let lines = split_lines(&info.text);

        let strategy = SegmentationStrategy::Signifier {
            pattern: Some(compiled),
        };
        let chapters = ChapterBuilder::new(&self.classifier).build(&lines, &strategy);

        let mut meta = derive_meta(
            Some(novel_id),
            record.meta.title,
            &info.text,
            &lines,
            &info.encoding_name,
        );
        // 重切分不是一次新的导入，保留原导入时间
        meta.time = record.meta.time;

        self.store.overwrite_novel(&meta, &record.tags, &chapters)?;
        Ok(chapters.len())
    }
}

/// 从规范化文本与非空行序列导出小说元信息
///
/// intro 与 wordcount 永远从切章用的同一份文本重新计算
fn derive_meta(
    id: Option<i64>,
    title: String,
    text: &str,
    lines: &[&str],
    encoding_name: &str,
) -> NovelMeta {
    let wordcount = text.chars().filter(|c| !c.is_whitespace()).count();
    let intro: String = lines
        .iter()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .chars()
        .take(300)
        .collect();
    NovelMeta {
        id,
        title,
        intro,
        wordcount,
        encoding: encoding_name.to_string(),
        time: Utc::now().timestamp(),
    }
}

/// 展开导入目标为文件列表
fn collect_files(path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    if recursive {
        for entry in walkdir::WalkDir::new(path) {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("txt")
            {
                files.push(entry.into_path());
            }
        }
    } else {
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_config(dir: &Path) -> AppConfig {
        AppConfig {
            db_path: dir.join("shelf.db"),
            fallback_novel_directory: dir.to_path_buf(),
            analyze_line_count: 100,
            title_signifier_count: 3,
            max_title_wordcount: 30,
            split_chapter_wordcount: 200,
            crude_encoding_detect_sample_size: 4096,
        }
    }

    fn write_novel(dir: &Path, name: &str, chapters: usize) -> PathBuf {
        let path = dir.join(format!("{}.txt", name));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "  楔子的内容。").unwrap();
        for i in 1..=chapters {
            writeln!(file, "  第{}章 标题", i).unwrap();
            writeln!(file, "  这里是正文内容。").unwrap();
            writeln!(file, "  又是一段正文。").unwrap();
        }
        path
    }

    #[test]
    fn test_import_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut store = NovelStore::open_in_memory().unwrap();
        let path = write_novel(dir.path(), "测试小说", 4);

        let mut importer = Importer::new(&config, &mut store);
        let outcome = importer
            .import_file(&path, &ImportOptions::default())
            .unwrap();
        let ImportOutcome::Imported { novel_id, chapter_count } = outcome else {
            panic!("期望导入成功");
        };
        // 哨兵章 + 4 个正式章节
        assert_eq!(chapter_count, 5);

        let record = store.find_novel_by_id(novel_id).unwrap().unwrap();
        assert_eq!(record.meta.title, "测试小说");
        assert_eq!(record.meta.encoding, "UTF-8");
        assert!(record.meta.intro.starts_with("楔子的内容。"));
        assert!(record.meta.intro.chars().count() <= 300);

        let toc = store.toc_by_novel_id(novel_id).unwrap();
        assert_eq!(toc[1].title, "第1章 标题");
    }

    #[test]
    fn test_import_skips_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut store = NovelStore::open_in_memory().unwrap();
        let path = write_novel(dir.path(), "测试小说", 2);

        let mut importer = Importer::new(&config, &mut store);
        importer
            .import_file(&path, &ImportOptions::default())
            .unwrap();
        let second = importer
            .import_file(&path, &ImportOptions::default())
            .unwrap();
        assert_eq!(second, ImportOutcome::SkippedExisting);

        let overwrite = importer
            .import_file(
                &path,
                &ImportOptions {
                    overwrite: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(matches!(overwrite, ImportOutcome::Imported { .. }));
    }

    #[test]
    fn test_batch_import_skip_and_continue() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut store = NovelStore::open_in_memory().unwrap();
        write_novel(dir.path(), "好书", 2);
        // 空文件：编码解析报错，但不应中断整批
        fs::File::create(dir.path().join("坏书.txt")).unwrap();

        let mut importer = Importer::new(&config, &mut store);
        let summary = importer
            .import_path(dir.path(), &ImportOptions::default())
            .unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn test_recursive_collect_only_txt() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("子目录");
        fs::create_dir(&sub).unwrap();
        write_novel(&sub, "深层小说", 1);
        fs::write(dir.path().join("说明.md"), "不是小说").unwrap();

        let files = collect_files(dir.path(), true).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("子目录/深层小说.txt"));
    }

    #[test]
    fn test_force_indent_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut store = NovelStore::open_in_memory().unwrap();

        // 标题顶格、正文缩进，但标题也带"第x章"字样；
        // 强制缩进切分时必须走缩进路径
        let path = dir.path().join("缩进书.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "第一章 顶格标题").unwrap();
        writeln!(file, "  正文一。").unwrap();
        writeln!(file, "  正文二。").unwrap();
        writeln!(file, "第二章 顶格标题").unwrap();
        writeln!(file, "  正文三。").unwrap();

        let mut importer = Importer::new(&config, &mut store);
        let outcome = importer
            .import_file(
                &path,
                &ImportOptions {
                    force_indent: true,
                    ..Default::default()
                },
            )
            .unwrap();
        let ImportOutcome::Imported { novel_id, chapter_count } = outcome else {
            panic!("期望导入成功");
        };
        assert_eq!(chapter_count, 3);
        let toc = store.toc_by_novel_id(novel_id).unwrap();
        assert_eq!(toc[1].title, "第一章 顶格标题");
    }

    #[test]
    fn test_resplit_with_custom_signifier() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let mut store = NovelStore::open_in_memory().unwrap();

        let path = dir.path().join("自定义书.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "=== 上篇 ===").unwrap();
        writeln!(file, "  正文一。").unwrap();
        writeln!(file, "=== 下篇 ===").unwrap();
        writeln!(file, "  正文二。").unwrap();
        drop(file);

        let mut importer = Importer::new(&config, &mut store);
        let ImportOutcome::Imported { novel_id, .. } = importer
            .import_file(&path, &ImportOptions::default())
            .unwrap()
        else {
            panic!("期望导入成功");
        };

        let count = importer.resplit_with_signifier(novel_id, "^===").unwrap();
        assert_eq!(count, 3);
        drop(importer);
        let toc = store.toc_by_novel_id(novel_id).unwrap();
        assert_eq!(toc[1].title, "=== 上篇 ===");
        assert_eq!(toc[2].title, "=== 下篇 ===");

        let mut importer = Importer::new(&config, &mut store);
        // 非法正则在任何写入发生前被拒绝
        assert!(matches!(
            importer.resplit_with_signifier(novel_id, "(坏正则"),
            Err(ShelfError::Validation(_))
        ));
    }
}
