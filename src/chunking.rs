//! # 分块计算
//!
//! 根据源文件大小和块字节数，计算块的数量以及块表在首张载体图像中需要预留的位数。

use crate::constants::{MAX_CHUNK_COUNT, TABLE_ENTRY_BITS, TABLE_HEADER_BITS};
use crate::error::{Result, StegoError};

/// 一次编码会话的分块方案。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_byte_size: usize,
    pub chunk_count: usize,
}

impl ChunkPlan {
    /// 为长度为 `file_len` 字节的文件计算分块方案。
    ///
    /// # Errors
    ///
    /// * `chunk_byte_size` 为 0。
    /// * 块数超过块表头部能表示的上限。
    pub fn new(file_len: u64, chunk_byte_size: usize) -> Result<Self> {
        if chunk_byte_size == 0 {
            return Err(StegoError::InvalidConfig(
                "Chunk byte size must be greater than zero".into(),
            ));
        }

        let chunk_count = file_len.div_ceil(chunk_byte_size as u64);
        if chunk_count > MAX_CHUNK_COUNT as u64 {
            return Err(StegoError::ChunkTable(format!(
                "{chunk_count} chunks exceed the table limit of {MAX_CHUNK_COUNT}; use a larger chunk size"
            )));
        }

        Ok(Self {
            chunk_byte_size,
            chunk_count: chunk_count as usize,
        })
    }

    /// 块表 (头部 + 所有表项) 所需的位数。
    pub fn table_bits(&self) -> usize {
        table_bit_size(self.chunk_count)
    }
}

/// 记录 `chunk_count` 个块所需的块表位数。
pub fn table_bit_size(chunk_count: usize) -> usize {
    TABLE_HEADER_BITS + TABLE_ENTRY_BITS * chunk_count
}
