//! # 错误类型模块
//!
//! 隐写核心的所有失败都通过 [`StegoError`] 表达。
//! 调用方可以借助 [`StegoError::kind`] 按错误类别分支，而不必解析错误信息文本。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 隐写编码、解码过程中可能出现的错误。
#[derive(Error, Debug)]
pub enum StegoError {
    /// 变换管线在解码方向上失败 (密文、填充、Base64 或解压缩错误)。
    /// 通常意味着密码、种子或其他参数与编码时不一致。
    #[error("Transformation failed: {0}")]
    Transformation(String),

    /// 写入时载体图像的剩余容量不足。
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// 定位或读取的位置超出了所有载体图像的总容量。
    #[error("Exhausted cover images: requested {requested} more bits but only {available} remain")]
    ExhaustedImages { requested: u64, available: u64 },

    /// 首张载体图像放不下块表。
    #[error(
        "The leading cover image cannot hold the chunk table: {required} bits required, {available} bits available"
    )]
    InsufficientTableSpace { required: u64, available: u64 },

    /// 块表超出了线格式所能表示的范围。
    #[error("Chunk table error: {0}")]
    ChunkTable(String),

    /// 会话配置无效。
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 载体图像加载或保存失败。
    #[error("Unable to process image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 管线中的后台线程发生了 panic。
    #[error("A pipeline worker thread panicked")]
    WorkerPanicked,
}

/// [`StegoError`] 的类别标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transformation,
    ImageProcessing,
    ExhaustedImages,
    InsufficientTableSpace,
    ChunkTable,
    InvalidConfig,
    Image,
    Io,
    WorkerPanicked,
}

impl StegoError {
    /// 返回错误的类别。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transformation(_) => ErrorKind::Transformation,
            Self::ImageProcessing(_) => ErrorKind::ImageProcessing,
            Self::ExhaustedImages { .. } => ErrorKind::ExhaustedImages,
            Self::InsufficientTableSpace { .. } => ErrorKind::InsufficientTableSpace,
            Self::ChunkTable(_) => ErrorKind::ChunkTable,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Image { .. } => ErrorKind::Image,
            Self::Io(_) => ErrorKind::Io,
            Self::WorkerPanicked => ErrorKind::WorkerPanicked,
        }
    }

    pub(crate) fn transformation(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Transformation(format!("{context}: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, StegoError>;
