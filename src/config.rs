use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 应用配置
///
/// 从 TOML 配置文件一次性读入并校验。所有数值字段都是启动期常量，
/// 解析失败或取值非法时直接报错退出，绝不静默使用默认值。
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// SQLite 数据库文件路径
    pub db_path: PathBuf,
    /// fallback 模式下按标题查找原始 txt 的目录
    pub fallback_novel_directory: PathBuf,
    /// 策略判定阶段分析的行数（文档前缀大小）
    pub analyze_line_count: usize,
    /// 判定阈值：前缀中标题行达到该数量才认为信号可靠
    pub title_signifier_count: usize,
    /// 标题行去空白后的最大字数，超过即视为正文
    pub max_title_wordcount: usize,
    /// fallback 分块的单章字数上限
    pub split_chapter_wordcount: usize,
    /// 粗略编码检测的采样字节数
    pub crude_encoding_detect_sample_size: usize,
}

impl AppConfig {
    /// 从指定路径加载并校验配置
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 校验数值字段
    ///
    /// 所有计数与阈值必须为正，0 值一律视为配置错误
    fn validate(&self) -> Result<()> {
        if self.analyze_line_count == 0 {
            bail!("analyze_line_count 必须大于 0");
        }
        if self.title_signifier_count == 0 {
            bail!("title_signifier_count 必须大于 0");
        }
        if self.max_title_wordcount == 0 {
            bail!("max_title_wordcount 必须大于 0");
        }
        if self.split_chapter_wordcount == 0 {
            bail!("split_chapter_wordcount 必须大于 0");
        }
        if self.crude_encoding_detect_sample_size == 0 {
            bail!("crude_encoding_detect_sample_size 必须大于 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const VALID: &str = r#"
db_path = "shelf.db"
fallback_novel_directory = "novels"
analyze_line_count = 100
title_signifier_count = 3
max_title_wordcount = 30
split_chapter_wordcount = 5000
crude_encoding_detect_sample_size = 4096
"#;

    #[test]
    fn test_load_valid_config() {
        let file = write_config(VALID);
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.analyze_line_count, 100);
        assert_eq!(config.title_signifier_count, 3);
        assert_eq!(config.max_title_wordcount, 30);
        assert_eq!(config.split_chapter_wordcount, 5000);
        assert_eq!(config.crude_encoding_detect_sample_size, 4096);
    }

    #[test]
    fn test_missing_field_is_fatal() {
        let file = write_config("db_path = \"shelf.db\"\n");
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_zero_threshold_is_fatal() {
        let content = VALID.replace("title_signifier_count = 3", "title_signifier_count = 0");
        let file = write_config(&content);
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_unparsable_number_is_fatal() {
        let content = VALID.replace("analyze_line_count = 100", "analyze_line_count = \"abc\"");
        let file = write_config(&content);
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(AppConfig::load(Path::new("/nonexistent/shelf.toml")).is_err());
    }
}
