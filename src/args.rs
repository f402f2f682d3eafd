use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// graphdi - 对象图解析演示
#[derive(Parser, Debug)]
#[command(name = "graphdi")]
#[command(about = "Resolve a sample object graph and report container statistics")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// 容器配置文件（TOML）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出解析细节
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 以 JSON 输出统计信息
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 解析一个类型
    Resolve {
        /// 类型键
        type_key: String,
        /// 解析次数
        #[arg(long, default_value_t = 2)]
        repeat: usize,
        /// 以单例注册
        #[arg(long)]
        singleton: bool,
    },
    /// 列出演示图中的类
    Classes,
}
