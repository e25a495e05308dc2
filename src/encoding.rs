use crate::error::{Result, ShelfError};
use encoding_rs::{Encoding, GBK, UTF_8};

/// 编码检测模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectMode {
    /// 粗略检测：只对文件开头的采样字节做检测，适合批量导入大文件
    Crude,
    /// 完整检测：对全部字节做检测，置信度更高
    Full,
}

/// 编码解析结果
///
/// text 为规范化后的 UTF-8 文本；encoding_name 随小说持久化，
/// 之后重读同一原始文件时必须复用，保证章节切分口径一致
#[derive(Debug, Clone)]
pub struct EncodingInfo {
    pub text: String,
    pub encoding_name: String,
}

/// 编码解析器
///
/// 检测原始字节的字符编码并解码为规范化 UTF-8 文本，
/// 支持 UTF-8（含 BOM）、GBK 等常见编码
pub struct EncodingResolver {
    /// 粗略检测的采样字节数
    crude_sample_size: usize,
}

impl EncodingResolver {
    pub fn new(crude_sample_size: usize) -> Self {
        Self { crude_sample_size }
    }

    /// 解析字节序列
    ///
    /// # 参数
    /// - `bytes`: 原始字节
    /// - `mode`: 检测模式（粗略/完整）
    /// - `assumed_encoding`: 指定编码名时完全跳过检测，
    ///   用于重读已经记录过编码的文档
    ///
    /// # 返回
    /// 规范化文本与实际使用的编码名
    pub fn resolve(
        &self,
        bytes: &[u8],
        mode: DetectMode,
        assumed_encoding: Option<&str>,
    ) -> Result<EncodingInfo> {
        if bytes.is_empty() {
            return Err(ShelfError::Encoding("没有可读取的字节".to_string()));
        }

        let encoding = match assumed_encoding {
            Some(label) => Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| ShelfError::Validation(format!("未知的编码名: {}", label)))?,
            None => {
                let sample = match mode {
                    DetectMode::Crude => &bytes[..bytes.len().min(self.crude_sample_size)],
                    DetectMode::Full => bytes,
                };
                self.detect_encoding(sample)
            }
        };

        // decode 自带 BOM 嗅探，返回实际使用的编码
        let (content, used_encoding, had_errors) = encoding.decode(bytes);
        if had_errors {
            return Err(ShelfError::Encoding(format!(
                "使用 {} 解码失败，文件可能存在乱码",
                used_encoding.name()
            )));
        }

        Ok(EncodingInfo {
            text: normalize(&content),
            encoding_name: used_encoding.name().to_string(),
        })
    }

    /// 检测字节样本的编码
    fn detect_encoding(&self, sample: &[u8]) -> &'static Encoding {
        // 1. 检查 BOM (Byte Order Mark)
        if let Some((encoding, _bom_length)) = Encoding::for_bom(sample) {
            return encoding;
        }

        // 2. 尝试 UTF-8 解码
        match std::str::from_utf8(sample) {
            Ok(_) => return UTF_8,
            // 采样截断了末尾的多字节序列，前面全部合法即视为 UTF-8
            Err(e) if e.error_len().is_none() => return UTF_8,
            Err(_) => {}
        }

        // 3. 检测是否为 GBK
        if looks_like_gbk(sample) {
            return GBK;
        }

        // 4. 默认使用 UTF-8
        UTF_8
    }
}

/// 检测字节序列是否像 GBK 编码
///
/// GBK 编码特征：
/// - 第一字节范围：0x81-0xFE
/// - 第二字节范围：0x40-0xFE
fn looks_like_gbk(bytes: &[u8]) -> bool {
    let mut gbk_pairs = 0;
    let mut total_pairs = 0;

    let mut i = 0;
    while i < bytes.len().saturating_sub(1) {
        let b1 = bytes[i];
        let b2 = bytes[i + 1];

        // ASCII 字符直接跳过
        if b1 < 0x80 {
            i += 1;
            continue;
        }

        total_pairs += 1;

        if (0x81..=0xFE).contains(&b1) && (0x40..=0xFE).contains(&b2) {
            gbk_pairs += 1;
            i += 2; // 跳过这一对字节
        } else {
            i += 1;
        }
    }

    // 超过 50% 的非 ASCII 字节对符合 GBK 规则，则认为是 GBK
    total_pairs > 0 && (gbk_pairs as f32 / total_pairs as f32) > 0.5
}

/// 规范化文本
///
/// 全角空格和制表符统一替换为半角空格，去掉所有回车符。
/// 下游的缩进比较依赖这一步保证空白表示一致
fn normalize(content: &str) -> String {
    content
        .chars()
        .filter(|&c| c != '\r')
        .map(|c| if c == '\u{3000}' || c == '\t' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // GBK 编码的 "测试"
    const GBK_CESHI: &[u8] = &[0xB2, 0xE2, 0xCA, 0xD4];

    #[test]
    fn test_detect_utf8() {
        let resolver = EncodingResolver::new(4096);
        let info = resolver
            .resolve("测试文本".as_bytes(), DetectMode::Full, None)
            .unwrap();
        assert_eq!(info.encoding_name, "UTF-8");
        assert_eq!(info.text, "测试文本");
    }

    #[test]
    fn test_detect_gbk() {
        let resolver = EncodingResolver::new(4096);
        let info = resolver.resolve(GBK_CESHI, DetectMode::Full, None).unwrap();
        assert_eq!(info.encoding_name, "GBK");
        assert_eq!(info.text, "测试");
    }

    #[test]
    fn test_detect_utf8_bom() {
        let resolver = EncodingResolver::new(4096);
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("带BOM的文本".as_bytes());
        let info = resolver.resolve(&bytes, DetectMode::Full, None).unwrap();
        assert_eq!(info.encoding_name, "UTF-8");
        assert_eq!(info.text, "带BOM的文本");
    }

    #[test]
    fn test_crude_mode_samples_prefix() {
        // 采样只覆盖 ASCII 前缀，后面的 GBK 字节不参与检测，
        // 但解码仍然作用于全部字节
        let resolver = EncodingResolver::new(4);
        let mut bytes = b"abcd".to_vec();
        bytes.extend_from_slice(GBK_CESHI);
        // 以 UTF-8 解码 GBK 字节必然报错
        let result = resolver.resolve(&bytes, DetectMode::Crude, None);
        assert!(matches!(result, Err(ShelfError::Encoding(_))));
        // 完整检测则能正确识别为 GBK
        let info = resolver.resolve(&bytes, DetectMode::Full, None).unwrap();
        assert_eq!(info.encoding_name, "GBK");
        assert_eq!(info.text, "abcd测试");
    }

    #[test]
    fn test_crude_mode_truncated_utf8_tail() {
        // 采样边界截断 "试" 的多字节序列，依然应判为 UTF-8
        let bytes = "试试".as_bytes();
        let resolver = EncodingResolver::new(4);
        let info = resolver.resolve(bytes, DetectMode::Crude, None).unwrap();
        assert_eq!(info.encoding_name, "UTF-8");
    }

    #[test]
    fn test_assumed_encoding_skips_detection() {
        let resolver = EncodingResolver::new(4096);
        let info = resolver
            .resolve(GBK_CESHI, DetectMode::Full, Some("GBK"))
            .unwrap();
        assert_eq!(info.encoding_name, "GBK");
        assert_eq!(info.text, "测试");
    }

    #[test]
    fn test_encoding_reuse_yields_identical_text() {
        // 第一次检测，第二次用记录下来的编码名，结果必须完全一致
        let resolver = EncodingResolver::new(4096);
        let first = resolver.resolve(GBK_CESHI, DetectMode::Full, None).unwrap();
        let second = resolver
            .resolve(GBK_CESHI, DetectMode::Full, Some(&first.encoding_name))
            .unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.encoding_name, second.encoding_name);
    }

    #[test]
    fn test_unknown_assumed_encoding_is_validation_error() {
        let resolver = EncodingResolver::new(4096);
        let result = resolver.resolve(b"abc", DetectMode::Full, Some("no-such-codec"));
        assert!(matches!(result, Err(ShelfError::Validation(_))));
    }

    #[test]
    fn test_decode_failure_is_encoding_error() {
        let resolver = EncodingResolver::new(4096);
        let result = resolver.resolve(GBK_CESHI, DetectMode::Full, Some("utf-8"));
        assert!(matches!(result, Err(ShelfError::Encoding(_))));
    }

    #[test]
    fn test_empty_bytes_is_encoding_error() {
        let resolver = EncodingResolver::new(4096);
        let result = resolver.resolve(&[], DetectMode::Full, None);
        assert!(matches!(result, Err(ShelfError::Encoding(_))));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize("　缩进\t正文\r\n"), " 缩进 正文\n");
        assert_eq!(normalize("无变化"), "无变化");
    }

    #[test]
    fn test_looks_like_gbk() {
        assert!(looks_like_gbk(GBK_CESHI));
        assert!(!looks_like_gbk(b"Hello World"));
        assert!(!looks_like_gbk(b"This is a test"));
    }
}
