/// 每个内容块默认读取的字节数 (128 KiB)。
/// 源文件按此大小切分，最后一块可以更短。
pub const DEFAULT_CHUNK_BYTE_SIZE: usize = 131_072;

/// 块表头部的位宽，记录块的数量。
/// 18 位最多可以表示 262,143 个块。
pub const TABLE_HEADER_BITS: usize = 18;

/// 块表中每一项的位宽，记录对应块编码后的位长度。
pub const TABLE_ENTRY_BITS: usize = 33;

/// 块表能够记录的最大块数。
pub const MAX_CHUNK_COUNT: usize = (1 << TABLE_HEADER_BITS) - 1;

/// 单个块编码后允许的最大位长度。
pub const MAX_CHUNK_BITS: u64 = (1 << TABLE_ENTRY_BITS) - 1;

/// 块表置乱时使用的固定迭代倍数，与内容路径的参数刻意不同。
pub const TABLE_ITERATION_MULTIPLIER: usize = 1000;

/// 内容路径置乱时使用的迭代倍数。
pub const CONTENT_ITERATION_MULTIPLIER: usize = 1;

/// 未提供随机种子时，伪装数据插入所用的默认种子。
pub const DEFAULT_DUMMY_SEED: &str = "lsb-vault-dummy-seed";

/// 自动推导伪装数据组数时的下限 (含)。
pub const AUTO_DUMMY_MIN: usize = 100;

/// 自动推导伪装数据组数时的上限 (不含)。
pub const AUTO_DUMMY_MAX: usize = 1000;

/// 每组伪装数据的位数。
pub const DUMMY_GROUP_BITS: usize = 8;

/// 每个像素参与隐写的颜色通道数 (R, G, B)，Alpha 通道永远不被修改。
pub const CHANNELS_PER_PIXEL: usize = 3;

/// 每个通道默认使用的最低有效位数量。
pub const DEFAULT_BITS_PER_CHANNEL: u8 = 1;

/// 编码与解码线程之间有界队列的容量。
pub const PIPELINE_QUEUE_CAPACITY: usize = 2;
