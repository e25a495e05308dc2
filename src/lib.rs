//! Novel Shelf
//!
//! txt 小说导入、章节切分与本地书库。核心是一条结构推断管线：
//! 检测编码 → 规范化文本 → 决定切分策略 → 切出带标题的章节 →
//! 统计字数，全程不依赖人工标注。

pub mod config;
pub mod encoding;
pub mod error;
pub mod import;
pub mod library;
pub mod model;
pub mod splitter;
pub mod store;

pub use config::AppConfig;
pub use encoding::{DetectMode, EncodingInfo, EncodingResolver};
pub use error::{Result, ShelfError};
pub use import::{ImportOptions, ImportOutcome, ImportSummary, Importer};
pub use library::{NovelInfo, NovelLibrary};
pub use model::{Chapter, NovelMeta, NovelRecord, TagInfo, TocItem};
pub use splitter::SegmentationStrategy;
pub use store::NovelStore;
