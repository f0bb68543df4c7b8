//! # lsb_vault 库
//!
//! 本库把任意文件按块切分，经可逆变换 (压缩、加密、伪装数据、位置乱) 后，
//! 写入一组无损载体图像像素通道的最低有效位，并能无损地恢复。

// 声明库包含的所有模块。

pub mod bits;
pub mod chunking;
pub mod cli;
pub mod compression;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod random;
pub mod steganography;
pub mod store;
pub mod table;
pub mod transform;

pub use config::{DecodeOptions, DummyCount, EncodeOptions, TransformConfig};
pub use error::{ErrorKind, Result, StegoError};
pub use pipeline::{DecodeReport, EncodeReport, NoopObserver, SessionObserver, decode, encode};
pub use store::{ImageFileLoader, PixelBitStore};
