//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use crate::config::{DummyCount, TransformConfig};
use crate::constants::{DEFAULT_BITS_PER_CHANNEL, DEFAULT_CHUNK_BYTE_SIZE};
use clap::{ArgAction, Args, Parser};
use std::path::PathBuf;

/// 一款基于 LSB (最低有效位) 隐写术的命令行工具，把任意文件分散隐藏到一组无损格式图像 (如 PNG, WEBP) 中。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "一款基于 LSB (最低有效位) 隐写术的命令行工具，把任意文件分散隐藏到一组无损格式图像 (如 PNG, WEBP) 中，并可选地压缩、加密、插入伪装数据与置乱。"
)]
pub struct Cli {
    /// 输出更详细的日志 (可重复使用，如 -vv)。
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 把文件隐藏进一组载体图像 (图像会被原地修改)。
    Encode(EncodeArgs),

    /// 从载体图像中恢复隐藏的文件。
    Decode(DecodeArgs),

    /// 清零载体图像的全部存储位，抹去此前隐藏的内容。
    Clean(CleanArgs),

    /// 计算一组载体图像的存储容量。
    Capacity(CleanArgs),

    /// 计算文件在给定参数下编码后需要的存储空间。
    EncodedSize(EncodedSizeArgs),

    /// 生成一个随机种子字符串。
    RandomSeed(RandomSeedArgs),
}

/// 编码与解码两端必须完全一致的变换参数。
#[derive(Args, Debug, Clone)]
pub struct TransformArgs {
    /// 有序的载体图像列表，编码与解码时顺序必须相同。
    #[arg(short, long, required = true, value_delimiter = ',', num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// 加密口令；为空则不加密。
    #[arg(short, long, env = "LSB_VAULT_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// 在加密前压缩数据。
    #[arg(short, long)]
    pub compress: bool,

    /// 伪装数据组数，或 `auto` 由首尾图像尺寸推导。
    #[arg(long, default_value = "0")]
    pub dummies: DummyCount,

    /// 位置乱所用的随机种子；为空则不置乱。
    #[arg(short, long, env = "LSB_VAULT_SEED", default_value = "", hide_env_values = true)]
    pub seed: String,

    /// 口令哈希的额外迭代次数。
    #[arg(long, default_value_t = 0)]
    pub hash_iterations: u32,

    /// 每个颜色通道使用的最低有效位数 (1-8)。
    #[arg(short, long, default_value_t = DEFAULT_BITS_PER_CHANNEL)]
    pub bits_per_channel: u8,
}

impl TransformArgs {
    /// 转换为库使用的变换配置。
    pub fn transform_config(&self) -> TransformConfig {
        TransformConfig::default()
            .with_password(self.password.clone())
            .with_compression(self.compress)
            .with_random_seed(self.seed.clone())
            .with_hash_iterations(self.hash_iterations)
            .with_bits_per_channel(self.bits_per_channel)
    }
}

/// 'encode' 命令所需的参数。
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// 要隐藏的文件路径。
    #[arg(short, long)]
    pub file: PathBuf,

    /// 源文件切块的字节数。
    #[arg(long, default_value_t = DEFAULT_CHUNK_BYTE_SIZE)]
    pub chunk_size: usize,

    #[command(flatten)]
    pub transform: TransformArgs,
}

/// 'decode' 命令所需的参数。
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// 恢复出的文件的保存路径。
    #[arg(short, long)]
    pub output: PathBuf,

    /// 如果输出文件已存在，则强制覆盖。
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub transform: TransformArgs,
}

/// 'clean' 与 'capacity' 命令所需的参数。
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// 载体图像列表。
    #[arg(short, long, required = true, value_delimiter = ',', num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// 每个颜色通道使用的最低有效位数 (1-8)。
    #[arg(short, long, default_value_t = DEFAULT_BITS_PER_CHANNEL)]
    pub bits_per_channel: u8,
}

/// 'encoded-size' 命令所需的参数。
#[derive(Args, Debug)]
pub struct EncodedSizeArgs {
    /// 要估算的文件路径。
    #[arg(short, long)]
    pub file: PathBuf,

    /// 源文件切块的字节数。
    #[arg(long, default_value_t = DEFAULT_CHUNK_BYTE_SIZE)]
    pub chunk_size: usize,

    #[command(flatten)]
    pub transform: TransformArgs,
}

/// 'random-seed' 命令所需的参数。
#[derive(Args, Debug)]
pub struct RandomSeedArgs {
    /// 种子长度 (字符数)。
    #[arg(short, long, default_value_t = 32)]
    pub length: usize,
}
