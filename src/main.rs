use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use novel_shelf::model::tags_to_array;
use novel_shelf::{AppConfig, ImportOptions, Importer, NovelLibrary, NovelStore};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "novelshelf", about = "txt 小说导入、章节切分与本地书库")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "novelshelf.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 导入文件或文件夹，请保证仅有 txt 文件
    Import {
        /// 指定文件或文件夹
        file: PathBuf,
        /// file 为文件夹时递归遍历子文件夹
        #[arg(short, long)]
        recursive: bool,
        /// 打标签，逗号分隔。例如：A,B,C
        #[arg(short, long)]
        tags: Option<String>,
        /// 覆盖已经存在同标题的小说
        #[arg(short, long)]
        overwrite: bool,
        /// 强制使用缩进方式切分章节
        #[arg(short, long)]
        indent: bool,
    },
    /// 列出小说，支持搜索（#标签 与标题关键词，空格分隔）
    List {
        #[arg(default_value = "")]
        search: String,
    },
    /// 查看小说详情与目录
    Info {
        novel_id: i64,
        /// 不读库里的章节集，按原始文件定长分块
        #[arg(long)]
        fallback: bool,
    },
    /// 读取单章
    Chapter {
        novel_id: i64,
        order_id: u32,
        #[arg(long)]
        fallback: bool,
    },
    /// 整本下载为文本
    Download {
        novel_id: i64,
        #[arg(long)]
        fallback: bool,
        /// 返回按入库编码重读的规范化全文
        #[arg(long)]
        raw: bool,
    },
    /// 列出全部标签
    Tags,
    /// 重设一本小说的标签
    Retag { novel_id: i64, tags: String },
    /// 用自定义标志词正则重新切分一本小说
    Resplit { novel_id: i64, signifier: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    let mut store = NovelStore::open(&config.db_path).context("打开书库数据库失败")?;

    match cli.command {
        Command::Import {
            file,
            recursive,
            tags,
            overwrite,
            indent,
        } => {
            let options = ImportOptions {
                recursive,
                tags: tags.as_deref().map(tags_to_array).unwrap_or_default(),
                overwrite,
                force_indent: indent,
            };
            let mut importer = Importer::new(&config, &mut store);
            let summary = importer.import_path(&file, &options)?;
            println!(
                "导入完成：成功 {}，跳过 {}，失败 {}",
                summary.imported, summary.skipped, summary.failed
            );
        }
        Command::List { search } => {
            let novels = store.list_novels(&search)?;
            println!("{}", serde_json::to_string_pretty(&novels)?);
        }
        Command::Info { novel_id, fallback } => {
            let library = NovelLibrary::new(&config, &store);
            let info = library.novel_info(novel_id, fallback)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Chapter {
            novel_id,
            order_id,
            fallback,
        } => {
            let library = NovelLibrary::new(&config, &store);
            let chapter = library.chapter(novel_id, order_id, fallback)?;
            println!("{}", serde_json::to_string_pretty(&chapter)?);
        }
        Command::Download {
            novel_id,
            fallback,
            raw,
        } => {
            let library = NovelLibrary::new(&config, &store);
            print!("{}", library.download(novel_id, fallback, raw)?);
        }
        Command::Tags => {
            let tags = store.list_tags()?;
            println!("{}", serde_json::to_string_pretty(&tags)?);
        }
        Command::Retag { novel_id, tags } => {
            store.update_tags(novel_id, &tags_to_array(&tags))?;
            println!("标签已更新");
        }
        Command::Resplit { novel_id, signifier } => {
            let mut importer = Importer::new(&config, &mut store);
            let count = importer.resplit_with_signifier(novel_id, &signifier)?;
            println!("重切分完成，共 {} 章", count);
        }
    }

    Ok(())
}
