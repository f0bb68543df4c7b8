//! # 会话配置
//!
//! 编码与解码两端必须使用完全一致的配置；任何不一致都不会被结构性地检测出来。

use crate::constants::{DEFAULT_BITS_PER_CHANNEL, DEFAULT_CHUNK_BYTE_SIZE};
use crate::error::{Result, StegoError};
use std::path::PathBuf;
use std::str::FromStr;

/// 变换管线的参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    /// 为空表示不加密。
    pub password: String,
    pub use_compression: bool,
    /// 为 0 表示不插入伪装数据。
    pub dummy_count: usize,
    /// 为空表示不做位置乱。
    pub random_seed: String,
    /// 口令基础哈希之外额外的拉伸轮数。
    pub additional_hash_iterations: u32,
    /// 每个颜色通道使用的最低有效位数 (1..=8)。
    pub bits_per_channel: u8,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            password: String::new(),
            use_compression: false,
            dummy_count: 0,
            random_seed: String::new(),
            additional_hash_iterations: 0,
            bits_per_channel: DEFAULT_BITS_PER_CHANNEL,
        }
    }
}

impl TransformConfig {
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_compression(mut self, use_compression: bool) -> Self {
        self.use_compression = use_compression;
        self
    }

    pub fn with_dummy_count(mut self, dummy_count: usize) -> Self {
        self.dummy_count = dummy_count;
        self
    }

    pub fn with_random_seed(mut self, seed: impl Into<String>) -> Self {
        self.random_seed = seed.into();
        self
    }

    pub fn with_hash_iterations(mut self, iterations: u32) -> Self {
        self.additional_hash_iterations = iterations;
        self
    }

    pub fn with_bits_per_channel(mut self, bits: u8) -> Self {
        self.bits_per_channel = bits;
        self
    }

    /// 检查参数是否在允许范围内。
    pub fn validate(&self) -> Result<()> {
        if !(1..=8).contains(&self.bits_per_channel) {
            return Err(StegoError::InvalidConfig(format!(
                "Bits per channel must be between 1 and 8, got {}",
                self.bits_per_channel
            )));
        }
        Ok(())
    }
}

/// 伪装数据组数：显式指定，或由首尾载体图像的像素数自动推导。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyCount {
    Explicit(usize),
    Auto,
}

impl Default for DummyCount {
    fn default() -> Self {
        Self::Explicit(0)
    }
}

impl FromStr for DummyCount {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse::<usize>()
            .map(Self::Explicit)
            .map_err(|_| format!("expected a non-negative number or 'auto', got '{s}'"))
    }
}

/// 编码会话的输入。
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub source: PathBuf,
    pub cover_images: Vec<PathBuf>,
    pub chunk_byte_size: usize,
    pub dummy_count: DummyCount,
    pub transform: TransformConfig,
}

impl EncodeOptions {
    pub fn new(source: impl Into<PathBuf>, cover_images: Vec<PathBuf>) -> Self {
        Self {
            source: source.into(),
            cover_images,
            chunk_byte_size: DEFAULT_CHUNK_BYTE_SIZE,
            dummy_count: DummyCount::default(),
            transform: TransformConfig::default(),
        }
    }
}

/// 解码会话的输入。
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub destination: PathBuf,
    pub cover_images: Vec<PathBuf>,
    pub dummy_count: DummyCount,
    pub transform: TransformConfig,
}

impl DecodeOptions {
    pub fn new(destination: impl Into<PathBuf>, cover_images: Vec<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            cover_images,
            dummy_count: DummyCount::default(),
            transform: TransformConfig::default(),
        }
    }
}

/// 载体图像序列不能为空。
pub(crate) fn ensure_cover_images(images: &[PathBuf]) -> Result<()> {
    if images.is_empty() {
        return Err(StegoError::InvalidConfig(
            "At least one cover image is required".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_count_parses_numbers_and_auto() {
        assert_eq!("0".parse::<DummyCount>(), Ok(DummyCount::Explicit(0)));
        assert_eq!("42".parse::<DummyCount>(), Ok(DummyCount::Explicit(42)));
        assert_eq!("AUTO".parse::<DummyCount>(), Ok(DummyCount::Auto));
        assert!("-3".parse::<DummyCount>().is_err());
    }

    #[test]
    fn bits_per_channel_range() {
        assert!(TransformConfig::default().validate().is_ok());
        assert!(TransformConfig::default().with_bits_per_channel(8).validate().is_ok());
        assert!(TransformConfig::default().with_bits_per_channel(0).validate().is_err());
        assert!(TransformConfig::default().with_bits_per_channel(9).validate().is_err());
    }
}
