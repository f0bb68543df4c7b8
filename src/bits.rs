//! # 位序列工具
//!
//! 编码后的块以位序列 (`Vec<bool>`) 表示。本模块负责字节与位之间的转换、
//! 定宽无符号整数的读写，以及基于种子的伪装数据插入与位置乱 (两者合称“置乱”)。

use crate::constants::{DEFAULT_DUMMY_SEED, DUMMY_GROUP_BITS};
use crate::error::{Result, StegoError};
use crate::random::SeededIndexGenerator;

/// 置乱参数：伪装数据组数、随机种子与迭代倍数。
#[derive(Debug, Clone, Copy)]
pub struct ScrambleParams<'a> {
    pub dummy_count: usize,
    pub seed: &'a str,
    pub iteration_multiplier: usize,
}

/// 把字节序列展开为位序列，每字节 8 位，高位在前。
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
        .collect()
}

/// 把位序列压缩回字节序列。长度必须是 8 的倍数。
pub fn bits_to_bytes(bits: &[bool]) -> Result<Vec<u8>> {
    if bits.len() % 8 != 0 {
        return Err(StegoError::Transformation(format!(
            "Bit sequence of length {} is not byte aligned",
            bits.len()
        )));
    }

    Ok(bits
        .chunks_exact(8)
        .map(|octet| octet.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
        .collect())
}

/// 把 `value` 的低 `width` 位追加到 `out`，高位在前。
pub fn push_uint(out: &mut Vec<bool>, value: u64, width: usize) {
    out.extend((0..width).rev().map(|shift| (value >> shift) & 1 == 1));
}

/// 把高位在前的位序列解释为无符号整数。
pub fn read_uint(bits: &[bool]) -> u64 {
    bits.iter().fold(0u64, |acc, &bit| (acc << 1) | bit as u64)
}

/// 按参数插入伪装数据并打乱位顺序。
pub fn scramble(mut bits: Vec<bool>, params: &ScrambleParams) -> Result<Vec<bool>> {
    if params.dummy_count > 0 {
        bits = insert_dummies(&bits, params.dummy_count, dummy_seed(params.seed))?;
    }
    if !params.seed.is_empty() {
        permute(&mut bits, params.seed, params.iteration_multiplier);
    }
    Ok(bits)
}

/// [`scramble`] 的逆操作。
pub fn unscramble(mut bits: Vec<bool>, params: &ScrambleParams) -> Result<Vec<bool>> {
    if !params.seed.is_empty() {
        unpermute(&mut bits, params.seed, params.iteration_multiplier);
    }
    if params.dummy_count > 0 {
        bits = remove_dummies(&bits, params.dummy_count, dummy_seed(params.seed))?;
    }
    Ok(bits)
}

fn dummy_seed(seed: &str) -> &str {
    if seed.is_empty() {
        DEFAULT_DUMMY_SEED
    } else {
        seed
    }
}

/// 一次插入的伪装组在最终序列中的位置 (以组为单位) 和内容。
struct DummyGroup {
    slot: usize,
    value: u8,
}

/// 重放插入过程，计算每个伪装组在最终序列中的组位置。
///
/// 每次插入位置取自 `[0, 当前组数]`，插在该位置及之后的已有伪装组都向后移动一组。
fn dummy_layout(base_groups: usize, count: usize, seed: &str) -> Vec<DummyGroup> {
    let mut generator = SeededIndexGenerator::from_phrase(seed);
    let mut groups: Vec<DummyGroup> = Vec::with_capacity(count);

    for inserted in 0..count {
        let slot = generator.next(base_groups + inserted);
        let value = generator.next_byte();
        for group in groups.iter_mut().filter(|g| g.slot >= slot) {
            group.slot += 1;
        }
        groups.push(DummyGroup { slot, value });
    }

    groups.sort_unstable_by_key(|g| g.slot);
    groups
}

fn insert_dummies(bits: &[bool], count: usize, seed: &str) -> Result<Vec<bool>> {
    if bits.len() % DUMMY_GROUP_BITS != 0 {
        return Err(StegoError::Transformation(format!(
            "Cannot insert dummy groups into {} bits; length must be a multiple of {DUMMY_GROUP_BITS}",
            bits.len()
        )));
    }

    let base_groups = bits.len() / DUMMY_GROUP_BITS;
    let layout = dummy_layout(base_groups, count, seed);
    let mut out = Vec::with_capacity(bits.len() + count * DUMMY_GROUP_BITS);
    let mut payload = bits.chunks_exact(DUMMY_GROUP_BITS);
    let mut dummies = layout.iter().peekable();

    for slot in 0..base_groups + count {
        match dummies.next_if(|g| g.slot == slot) {
            Some(group) => push_uint(&mut out, group.value as u64, DUMMY_GROUP_BITS),
            None => {
                if let Some(group) = payload.next() {
                    out.extend_from_slice(group);
                }
            }
        }
    }

    Ok(out)
}

fn remove_dummies(bits: &[bool], count: usize, seed: &str) -> Result<Vec<bool>> {
    let dummy_bits = count * DUMMY_GROUP_BITS;
    if bits.len() < dummy_bits || bits.len() % DUMMY_GROUP_BITS != 0 {
        return Err(StegoError::Transformation(format!(
            "{} bits cannot contain {count} dummy groups",
            bits.len()
        )));
    }

    let total_groups = bits.len() / DUMMY_GROUP_BITS;
    let layout = dummy_layout(total_groups - count, count, seed);
    let mut dummies = layout.iter().map(|g| g.slot).peekable();
    let mut out = Vec::with_capacity(bits.len() - dummy_bits);

    for (slot, group) in bits.chunks_exact(DUMMY_GROUP_BITS).enumerate() {
        if dummies.next_if_eq(&slot).is_none() {
            out.extend_from_slice(group);
        }
    }

    Ok(out)
}

/// Fisher-Yates 置换所用的交换目标序列，第 `k` 项对应位置 `len - 1 - k`。
fn swap_targets(len: usize, seed: &str, iteration_multiplier: usize) -> Vec<usize> {
    let mut generator = SeededIndexGenerator::from_phrase(seed);
    generator.discard(iteration_multiplier);
    (1..len).rev().map(|i| generator.next(i)).collect()
}

fn permute(bits: &mut [bool], seed: &str, iteration_multiplier: usize) {
    let targets = swap_targets(bits.len(), seed, iteration_multiplier);
    for (i, &j) in (1..bits.len()).rev().zip(&targets) {
        bits.swap(i, j);
    }
}

fn unpermute(bits: &mut [bool], seed: &str, iteration_multiplier: usize) {
    let targets = swap_targets(bits.len(), seed, iteration_multiplier);
    for (i, &j) in (1..bits.len()).zip(targets.iter().rev()) {
        bits.swap(i, j);
    }
}
