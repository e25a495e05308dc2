use serde::{Deserialize, Serialize};

/// 小说元信息
///
/// intro 与 wordcount 均由切分时使用的同一份规范化文本导出，
/// 不允许单独设置；encoding 随文档持久化，供后续重读复用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelMeta {
    /// 数据库 ID（入库前为 None）
    pub id: Option<i64>,
    /// 小说标题（取自文件名）
    pub title: String,
    /// 简介：规范化文本的前 300 字
    pub intro: String,
    /// 全书字数（去除所有空白后的字符数）
    pub wordcount: usize,
    /// 检测到的编码名
    pub encoding: String,
    /// 导入时间（Unix 秒）
    pub time: i64,
}

/// 章节
///
/// orderId 从 0 开始、按文档顺序稠密递增，是章节在一本小说内的唯一身份。
/// novelId 归属由持久化层在写入时填充，切分阶段不关心
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// 章节序号（0 起始）
    pub order_id: u32,
    /// 章节标题
    pub title: String,
    /// 章节正文
    pub content: String,
    /// 正文字符数
    pub wordcount: usize,
}

/// 目录项
///
/// Chapter 去掉 content 的轻量投影，用于列目录时不传输正文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocItem {
    pub order_id: u32,
    pub title: String,
    pub wordcount: usize,
}

impl From<&Chapter> for TocItem {
    fn from(chapter: &Chapter) -> Self {
        Self {
            order_id: chapter.order_id,
            title: chapter.title.clone(),
            wordcount: chapter.wordcount,
        }
    }
}

/// 小说记录：元信息加标签，查询接口的返回单位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelRecord {
    pub meta: NovelMeta,
    pub tags: Vec<String>,
}

/// 标签及其被使用的次数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub count: i64,
}

/// 在章节正文前加上字数行，返回新值
///
/// 纯变换：展示用，绝不修改已存储的章节
pub fn with_wordcount_header(chapter: &Chapter) -> Chapter {
    Chapter {
        order_id: chapter.order_id,
        title: chapter.title.clone(),
        content: format!(
            "【字数：{}】\n{}",
            number_with_commas(chapter.wordcount),
            chapter.content
        ),
        wordcount: chapter.wordcount,
    }
}

/// 逗号分隔的标签串转数组，去掉空项与首尾空白
pub fn tags_to_array(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// 数字按千位加逗号
pub fn number_with_commas(value: usize) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}
