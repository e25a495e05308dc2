use crate::error::Result;
use crate::model::{Chapter, NovelMeta, NovelRecord, TagInfo, TocItem};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// 本地书库
///
/// 持有显式的 SQLite 连接句柄（不用全局单例），负责小说、章节、
/// 标签三张表的全部读写。标签名到 id 的映射表由书库自己持有，
/// 懒加载、可失效，不暴露给其他模块
pub struct NovelStore {
    conn: Connection,
    /// 标签名 -> id 缓存；None 表示尚未加载或已失效
    tag2id: Option<HashMap<String, i64>>,
}

impl NovelStore {
    /// 打开（或创建）书库数据库
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// 内存数据库，测试用
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS novels (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL UNIQUE,
                intro TEXT NOT NULL,
                wordcount INTEGER NOT NULL,
                encoding TEXT NOT NULL,
                time INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chapters (
                id INTEGER PRIMARY KEY,
                novelId INTEGER NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                wordcount INTEGER NOT NULL,
                orderId INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chapters_novel_order
                ON chapters (novelId, orderId);
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS tagmap (
                novelId INTEGER NOT NULL,
                tagId INTEGER NOT NULL,
                UNIQUE (novelId, tagId)
            );",
        )?;
        Ok(Self { conn, tag2id: None })
    }

    /// 按标题查找小说 id
    pub fn find_novel_id_by_title(&self, title: &str) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT id FROM novels WHERE title = ?1", [title], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(id)
    }

    /// 覆盖式写入一本小说
    ///
    /// 元信息、标签关联、章节集在同一事务内落库：
    /// 旧章节与旧标签关联先删后写，绝不出现新旧章节并存的中间态。
    /// meta.id 为 Some 时更新既有记录，否则新建
    ///
    /// # 返回
    /// 小说 id
    pub fn overwrite_novel(
        &mut self,
        meta: &NovelMeta,
        tags: &[String],
        chapters: &[Chapter],
    ) -> Result<i64> {
        // 标签实体是全局的，可在事务外先补齐
        let tag_ids = self.ensure_tags(tags)?;

        let tx = self.conn.transaction()?;
        let novel_id = match meta.id {
            Some(id) => {
                tx.execute(
                    "UPDATE novels SET intro = ?1, wordcount = ?2, encoding = ?3, time = ?4
                     WHERE id = ?5",
                    params![meta.intro, meta.wordcount as i64, meta.encoding, meta.time, id],
                )?;
                tx.execute("DELETE FROM chapters WHERE novelId = ?1", [id])?;
                tx.execute("DELETE FROM tagmap WHERE novelId = ?1", [id])?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO novels (title, intro, wordcount, encoding, time)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        meta.title,
                        meta.intro,
                        meta.wordcount as i64,
                        meta.encoding,
                        meta.time
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        {
            let mut stmt = tx.prepare(
                "INSERT INTO chapters (novelId, title, content, wordcount, orderId)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for chapter in chapters {
                stmt.execute(params![
                    novel_id,
                    chapter.title,
                    chapter.content,
                    chapter.wordcount as i64,
                    chapter.order_id
                ])?;
            }
        }
        {
            let mut stmt = tx.prepare("INSERT INTO tagmap (novelId, tagId) VALUES (?1, ?2)")?;
            for tag_id in &tag_ids {
                stmt.execute(params![novel_id, tag_id])?;
            }
        }
        tx.commit()?;
        Ok(novel_id)
    }

    /// 按 id 查小说（含标签）
    pub fn find_novel_by_id(&self, novel_id: i64) -> Result<Option<NovelRecord>> {
        let meta = self
            .conn
            .query_row(
                "SELECT id, title, intro, wordcount, encoding, time
                 FROM novels WHERE id = ?1",
                [novel_id],
                row_to_meta,
            )
            .optional()?;
        match meta {
            Some(meta) => {
                let tags = self.tags_of_novel(novel_id)?;
                Ok(Some(NovelRecord { meta, tags }))
            }
            None => Ok(None),
        }
    }

    /// 列出小说，支持搜索
    ///
    /// 搜索串按空格拆词：`#`开头的是标签条件（必须全部拥有），
    /// 其余词是标题的模糊匹配条件，全部取交集
    pub fn list_novels(&self, search: &str) -> Result<Vec<NovelRecord>> {
        let terms: Vec<&str> = search.split(' ').filter(|t| !t.is_empty()).collect();
        let tag_terms: Vec<&str> = terms
            .iter()
            .filter(|t| t.starts_with('#'))
            .map(|t| &t[1..])
            .filter(|t| !t.is_empty())
            .collect();
        let keyword_terms: Vec<String> = terms
            .iter()
            .filter(|t| !t.starts_with('#'))
            .map(|t| t.replace('%', ""))
            .filter(|t| !t.is_empty())
            .collect();

        let mut sql = String::from(
            "SELECT id, title, intro, wordcount, encoding, time FROM novels WHERE 1=1",
        );
        let mut args: Vec<rusqlite::types::Value> = Vec::new();
        for keyword in &keyword_terms {
            sql.push_str(&format!(" AND title LIKE ?{}", args.len() + 1));
            args.push(format!("%{}%", keyword).into());
        }
        if !tag_terms.is_empty() {
            let placeholders: Vec<String> = tag_terms
                .iter()
                .enumerate()
                .map(|(i, _)| format!("?{}", args.len() + i + 1))
                .collect();
            sql.push_str(&format!(
                " AND id IN (SELECT tm.novelId FROM tagmap tm
                     JOIN tags t ON t.id = tm.tagId
                     WHERE t.name IN ({})
                     GROUP BY tm.novelId HAVING COUNT(tm.novelId) = {})",
                placeholders.join(","),
                tag_terms.len()
            ));
            for tag in &tag_terms {
                args.push(tag.to_string().into());
            }
        }
        sql.push_str(" ORDER BY time DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let metas = stmt
            .query_map(rusqlite::params_from_iter(args), row_to_meta)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(metas.len());
        for meta in metas {
            let tags = self.tags_of_novel(meta.id.unwrap_or_default())?;
            records.push(NovelRecord { meta, tags });
        }
        Ok(records)
    }

    /// 查目录（不带正文）
    pub fn toc_by_novel_id(&self, novel_id: i64) -> Result<Vec<TocItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT orderId, title, wordcount FROM chapters
             WHERE novelId = ?1 ORDER BY orderId ASC",
        )?;
        let toc = stmt
            .query_map([novel_id], |row| {
                Ok(TocItem {
                    order_id: row.get::<_, i64>(0)? as u32,
                    title: row.get(1)?,
                    wordcount: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(toc)
    }

    /// 按小说 id 与章节序号查单章
    pub fn chapter_by_order_id(&self, novel_id: i64, order_id: u32) -> Result<Option<Chapter>> {
        let chapter = self
            .conn
            .query_row(
                "SELECT orderId, title, content, wordcount FROM chapters
                 WHERE novelId = ?1 AND orderId = ?2",
                params![novel_id, order_id],
                row_to_chapter,
            )
            .optional()?;
        Ok(chapter)
    }

    /// 整本拉取全部章节（下载用）
    pub fn bulk_chapters_by_novel_id(&self, novel_id: i64) -> Result<Vec<Chapter>> {
        let mut stmt = self.conn.prepare(
            "SELECT orderId, title, content, wordcount FROM chapters
             WHERE novelId = ?1 ORDER BY orderId ASC",
        )?;
        let chapters = stmt
            .query_map([novel_id], row_to_chapter)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(chapters)
    }

    /// 列出全部标签及使用次数
    pub fn list_tags(&self) -> Result<Vec<TagInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name, COUNT(tm.novelId) FROM tags t
             LEFT JOIN tagmap tm ON tm.tagId = t.id
             GROUP BY t.id ORDER BY t.name ASC",
        )?;
        let tags = stmt
            .query_map([], |row| {
                Ok(TagInfo {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    /// 重设一本小说的标签
    pub fn update_tags(&mut self, novel_id: i64, tags: &[String]) -> Result<()> {
        let tag_ids = self.ensure_tags(tags)?;
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM tagmap WHERE novelId = ?1", [novel_id])?;
        {
            let mut stmt = tx.prepare("INSERT INTO tagmap (novelId, tagId) VALUES (?1, ?2)")?;
            for tag_id in &tag_ids {
                stmt.execute(params![novel_id, tag_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// 补齐标签实体并返回对应 id
    ///
    /// 有新建时缓存失效并重新加载
    fn ensure_tags(&mut self, tags: &[String]) -> Result<Vec<i64>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let mut created = false;
        for tag in tags {
            let inserted = self
                .conn
                .execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", [tag])?;
            created |= inserted > 0;
        }
        if created {
            self.invalidate_tag_cache();
        }
        let map = self.tag_id_map()?;
        Ok(tags.iter().filter_map(|tag| map.get(tag).copied()).collect())
    }

    /// 标签名 -> id 映射，懒加载
    fn tag_id_map(&mut self) -> Result<&HashMap<String, i64>> {
        if self.tag2id.is_none() {
            let map = {
                let mut stmt = self.conn.prepare("SELECT name, id FROM tags")?;
                let map = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<std::result::Result<HashMap<_, _>, _>>()?;
                map
            };
            self.tag2id = Some(map);
        }
        Ok(self.tag2id.get_or_insert_with(HashMap::new))
    }

    /// 使标签缓存失效，下次访问时重新从库里加载
    pub fn invalidate_tag_cache(&mut self) {
        self.tag2id = None;
    }

    fn tags_of_novel(&self, novel_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM tags t
             JOIN tagmap tm ON tm.tagId = t.id
             WHERE tm.novelId = ?1 ORDER BY t.name ASC",
        )?;
        let tags = stmt
            .query_map([novel_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }
}

fn row_to_meta(row: &rusqlite::Row<'_>) -> rusqlite::Result<NovelMeta> {
    Ok(NovelMeta {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        intro: row.get(2)?,
        wordcount: row.get::<_, i64>(3)? as usize,
        encoding: row.get(4)?,
        time: row.get(5)?,
    })
}

fn row_to_chapter(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        order_id: row.get::<_, i64>(0)? as u32,
        title: row.get(1)?,
        content: row.get(2)?,
        wordcount: row.get::<_, i64>(3)? as usize,
    })
}
