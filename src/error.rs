use thiserror::Error;

/// 书库错误类型
///
/// 覆盖导入与查询两条路径上的所有失败情况
#[derive(Error, Debug)]
pub enum ShelfError {
    /// 编码检测到的编码无法完整解码，或者输入为空
    #[error("编码错误: {0}")]
    Encoding(String),
    /// 按标题找不到对应的原始 txt 文件（fallback 重切分路径）
    #[error("找不到原始文件: {0}")]
    SourceNotFound(String),
    /// 边界校验失败（非法正则、缺少字段等），发生在管线执行之前
    #[error("参数校验失败: {0}")]
    Validation(String),
    #[error("IO 错误")]
    Io(#[from] std::io::Error),
    #[error("数据库错误")]
    Db(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ShelfError>;
