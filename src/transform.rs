//! # 可逆变换管线
//!
//! 编码顺序：压缩 → Base64 → 加密 → 转为位序列 → 插入伪装数据 → 位置乱。
//! 解码严格按相反顺序执行，因此对任意输入与配置都有
//! `decode(encode(bytes, cfg), cfg) == bytes`。

use crate::bits::{ScrambleParams, bits_to_bytes, bytes_to_bits, scramble, unscramble};
use crate::compression::{compress, decompress};
use crate::config::TransformConfig;
use crate::constants::{AUTO_DUMMY_MAX, AUTO_DUMMY_MIN, CONTENT_ITERATION_MULTIPLIER};
use crate::crypto::{decrypt, encrypt};
use crate::error::{Result, StegoError};
use crate::random::SeededIndexGenerator;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

fn content_params(config: &TransformConfig) -> ScrambleParams<'_> {
    ScrambleParams {
        dummy_count: config.dummy_count,
        seed: &config.random_seed,
        iteration_multiplier: CONTENT_ITERATION_MULTIPLIER,
    }
}

/// 把一个内容块编码为待写入像素的位序列。
pub fn encode(bytes: &[u8], config: &TransformConfig) -> Result<Vec<bool>> {
    let payload = if config.use_compression {
        compress(bytes)?
    } else {
        bytes.to_vec()
    };

    let mut text = BASE64.encode(payload);
    if !config.password.is_empty() {
        text = encrypt(&text, &config.password, config.additional_hash_iterations);
    }

    let bits = scramble(bytes_to_bits(text.as_bytes()), &content_params(config))?;
    log::trace!("Encoded {} bytes into {} bits", bytes.len(), bits.len());
    Ok(bits)
}

/// [`encode`] 的逆操作。
///
/// 配置与编码时不一致并不保证出错：错误的口令通常会返回
/// [`StegoError::Transformation`]，而错误的伪装组数或种子可能只是得到错误的内容。
pub fn decode(bits: Vec<bool>, config: &TransformConfig) -> Result<Vec<u8>> {
    let bits = unscramble(bits, &content_params(config))?;
    let mut text = String::from_utf8(bits_to_bytes(&bits)?)
        .map_err(|e| StegoError::transformation("Decoded payload is not text", e))?;

    if !config.password.is_empty() {
        text = decrypt(&text, &config.password, config.additional_hash_iterations)?;
    }

    let payload = BASE64
        .decode(text.as_bytes())
        .map_err(|e| StegoError::transformation("Payload is not valid base64", e))?;

    if config.use_compression {
        decompress(&payload)
    } else {
        Ok(payload)
    }
}

/// 计算一段数据在给定配置下编码后的位长度，不触碰任何图像。
pub fn encoded_bit_length(bytes: &[u8], config: &TransformConfig) -> Result<u64> {
    encode(bytes, config).map(|bits| bits.len() as u64)
}

/// 由首尾两张载体图像的像素数推导伪装数据组数，结果落在 `[100, 1000)`。
pub fn auto_dummy_count(first_pixels: u64, last_pixels: u64) -> usize {
    let mut generator = SeededIndexGenerator::from_phrase(&format!("{first_pixels}{last_pixels}"));
    AUTO_DUMMY_MIN + generator.next(AUTO_DUMMY_MAX - AUTO_DUMMY_MIN - 1)
}
