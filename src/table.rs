//! # 块表编解码
//!
//! 块表位于首张载体图像的最开始，是唯一持久化的二进制格式：
//!
//! ```text
//! | 18 位块数 N | N × 33 位块长度 |
//! ```
//!
//! 整数均为高位在前的无符号数。配置了随机种子时，头部与表体各自独立地经过与内容相同的
//! 置乱原语 (伪装组数固定为 0，迭代倍数固定为 1000)。表中没有任何校验：
//! 错误的种子只会得到荒谬的块数，进而耗尽图像容量或得到无意义的长度列表。

use crate::bits::{ScrambleParams, push_uint, read_uint, scramble, unscramble};
use crate::chunking::table_bit_size;
use crate::constants::{
    MAX_CHUNK_BITS, MAX_CHUNK_COUNT, TABLE_ENTRY_BITS, TABLE_HEADER_BITS,
    TABLE_ITERATION_MULTIPLIER,
};
use crate::error::{Result, StegoError};
use crate::store::{AccessMode, GridLoader, PixelBitStore};
use std::path::PathBuf;

fn table_params(random_seed: &str) -> ScrambleParams<'_> {
    ScrambleParams {
        dummy_count: 0,
        seed: random_seed,
        iteration_multiplier: TABLE_ITERATION_MULTIPLIER,
    }
}

/// 把块长度列表序列化为块表位序列 (已按种子置乱)。
pub fn serialize(chunk_lengths: &[u64], random_seed: &str) -> Result<Vec<bool>> {
    if chunk_lengths.len() > MAX_CHUNK_COUNT {
        return Err(StegoError::ChunkTable(format!(
            "{} chunks exceed the table limit of {MAX_CHUNK_COUNT}",
            chunk_lengths.len()
        )));
    }
    if let Some(&too_long) = chunk_lengths.iter().find(|&&len| len > MAX_CHUNK_BITS) {
        return Err(StegoError::ChunkTable(format!(
            "Chunk of {too_long} bits exceeds the {TABLE_ENTRY_BITS}-bit length field"
        )));
    }

    let params = table_params(random_seed);

    let mut header = Vec::with_capacity(TABLE_HEADER_BITS);
    push_uint(&mut header, chunk_lengths.len() as u64, TABLE_HEADER_BITS);

    let mut body = Vec::with_capacity(TABLE_ENTRY_BITS * chunk_lengths.len());
    for &len in chunk_lengths {
        push_uint(&mut body, len, TABLE_ENTRY_BITS);
    }

    let mut bits = scramble(header, &params)?;
    bits.extend(scramble(body, &params)?);
    Ok(bits)
}

/// 把块表写入首张载体图像的起始位置，覆盖此前预留的空间。
pub fn write<L: GridLoader>(
    images: &[PathBuf],
    loader: L,
    chunk_lengths: &[u64],
    random_seed: &str,
    bits_per_channel: u8,
) -> Result<()> {
    let bits = serialize(chunk_lengths, random_seed)?;
    let mut store = PixelBitStore::open(images, loader, AccessMode::Write, bits_per_channel)?;

    let available = store.current_image_capacity()?;
    if (bits.len() as u64) > available {
        return Err(StegoError::InsufficientTableSpace {
            required: bits.len() as u64,
            available,
        });
    }

    let mut written = 0;
    while written < bits.len() {
        written += store.write(&bits[written..])?;
    }
    store.finish()?;

    log::debug!(
        "Wrote chunk table with {} entries ({} bits)",
        chunk_lengths.len(),
        bits.len()
    );
    Ok(())
}

/// 从存储的当前位置读取完整的块表。
pub fn read_from<L: GridLoader>(
    store: &mut PixelBitStore<L>,
    random_seed: &str,
) -> Result<Vec<u64>> {
    let params = table_params(random_seed);

    let header = unscramble(store.read(TABLE_HEADER_BITS as u64)?, &params)?;
    let count = read_uint(&header) as usize;
    log::debug!("Chunk table header announces {count} chunks");

    let body_bits = (table_bit_size(count) - TABLE_HEADER_BITS) as u64;
    let body = unscramble(store.read(body_bits)?, &params)?;

    Ok(body.chunks_exact(TABLE_ENTRY_BITS).map(read_uint).collect())
}

/// 从首张载体图像读取块表。
pub fn read<L: GridLoader>(
    images: &[PathBuf],
    loader: L,
    random_seed: &str,
    bits_per_channel: u8,
) -> Result<Vec<u64>> {
    let mut store = PixelBitStore::open(images, loader, AccessMode::Read, bits_per_channel)?;
    read_from(&mut store, random_seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_without_seed_is_plain_fields() {
        let bits = serialize(&[5, 1], "").unwrap();
        assert_eq!(bits.len(), 18 + 2 * 33);
        assert_eq!(read_uint(&bits[..18]), 2);
        assert_eq!(read_uint(&bits[18..51]), 5);
        assert_eq!(read_uint(&bits[51..]), 1);
    }

    #[test]
    fn seed_scrambles_without_changing_size() {
        let plain = serialize(&[1234, 99_999, 7], "").unwrap();
        let seeded = serialize(&[1234, 99_999, 7], "random-seed").unwrap();
        assert_eq!(plain.len(), seeded.len());
        assert_ne!(plain, seeded);
    }

    #[test]
    fn limits_are_enforced() {
        assert!(serialize(&[MAX_CHUNK_BITS], "").is_ok());
        assert!(matches!(
            serialize(&[MAX_CHUNK_BITS + 1], ""),
            Err(StegoError::ChunkTable(_))
        ));
        let too_many = vec![1u64; MAX_CHUNK_COUNT + 1];
        assert!(matches!(serialize(&too_many, ""), Err(StegoError::ChunkTable(_))));
    }
}
