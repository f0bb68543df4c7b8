//! DEFLATE 压缩，在编码前缩小载荷体积。

use crate::error::{Result, StegoError};
use flate2::Compression;
use flate2::read::{DeflateDecoder, DeflateEncoder};
use std::io::Read;

/// 以最高压缩级别压缩数据。
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(data, Compression::best());
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| StegoError::transformation("Compression failed", e))?;
    Ok(compressed)
}

/// 解压由 [`compress`] 生成的数据。
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| StegoError::transformation("Decompression failed", e))?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_text_and_empty() {
        for data in [&b""[..], b"a", b"Hello, World! This is a test of compression."] {
            assert_eq!(decompress(&compress(data).unwrap()).unwrap(), data);
        }
    }

    #[test]
    fn repetitive_data_shrinks() {
        let data = vec![b'z'; 10_000];
        let compressed = compress(&data).unwrap();
        assert!(compressed.len() < data.len() / 10);
    }

    #[test]
    fn garbage_fails_to_decompress() {
        let result = decompress(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(StegoError::Transformation(_))));
    }
}
