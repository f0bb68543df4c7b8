use crate::constants::CHANNELS_PER_PIXEL;

/// 一个存储槽在图像中的位置：像素坐标、通道 (0 = R, 1 = G, 2 = B) 以及通道内的位序号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAddress {
    pub x: u32,
    pub y: u32,
    pub channel: usize,
    pub bit: u8,
}

/// 把图像内的槽偏移换算为像素位置。像素按行遍历，`x` 变化最快。
pub fn locate(offset: u64, width: u32, bits_per_channel: u8) -> SlotAddress {
    let slots_per_pixel = CHANNELS_PER_PIXEL as u64 * bits_per_channel as u64;
    let pixel = offset / slots_per_pixel;
    let within = offset % slots_per_pixel;

    SlotAddress {
        x: (pixel % width as u64) as u32,
        y: (pixel / width as u64) as u32,
        channel: (within / bits_per_channel as u64) as usize,
        bit: (within % bits_per_channel as u64) as u8,
    }
}

pub fn modify(value: u8, bit: u8, set: bool) -> u8 {
    let mask = 1u8 << bit;
    if set { value | mask } else { value & !mask }
}

pub fn recover(value: u8, bit: u8) -> bool {
    (value >> bit) & 1 == 1
}

/// 清零通道值中用于存储的低 `bits_per_channel` 位。
pub fn scrub(value: u8, bits_per_channel: u8) -> u8 {
    if bits_per_channel >= 8 {
        0
    } else {
        value & !((1u8 << bits_per_channel) - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_walks_rgb_then_pixels() {
        assert_eq!(locate(0, 4, 1), SlotAddress { x: 0, y: 0, channel: 0, bit: 0 });
        assert_eq!(locate(2, 4, 1), SlotAddress { x: 0, y: 0, channel: 2, bit: 0 });
        assert_eq!(locate(3, 4, 1), SlotAddress { x: 1, y: 0, channel: 0, bit: 0 });
        assert_eq!(locate(12, 4, 1), SlotAddress { x: 0, y: 1, channel: 0, bit: 0 });
        assert_eq!(locate(7, 4, 2), SlotAddress { x: 1, y: 0, channel: 0, bit: 1 });
    }

    #[test]
    fn modify_and_recover_single_bits() {
        assert_eq!(modify(0b1111_0000, 0, true), 0b1111_0001);
        assert_eq!(modify(0b1111_0001, 0, false), 0b1111_0000);
        assert_eq!(modify(0, 1, true), 0b10);
        assert!(recover(0b10, 1));
        assert!(!recover(0b10, 0));
    }

    #[test]
    fn scrub_clears_only_storage_bits() {
        assert_eq!(scrub(0xFF, 1), 0xFE);
        assert_eq!(scrub(0xFF, 3), 0xF8);
        assert_eq!(scrub(0xFF, 8), 0);
    }
}
