//! # 像素位存储
//!
//! 把有序的载体图像序列呈现为一条可定位的位流：每个非 Alpha 通道的低位就是一个存储槽。
//! 图像按需加载，切换到下一张图像前先保存上一张；同一遍历中每张图像至多加载一次、保存一次。
//!
//! 核心只依赖 [`PixelGrid`] / [`GridLoader`] 这一窄接口，具体的图像编解码由
//! [`ImageFileLoader`] 借助 `image` 库完成。

use crate::constants::CHANNELS_PER_PIXEL;
use crate::error::{Result, StegoError};
use crate::steganography::{locate, modify, recover, scrub};
use image::{ColorType, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

/// 可读写的 RGBA 像素网格。
pub trait PixelGrid {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn pixel(&self, x: u32, y: u32) -> [u8; 4];
    fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]);
}

impl PixelGrid for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.get_pixel(x, y).0
    }

    fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.put_pixel(x, y, Rgba(rgba));
    }
}

/// 没有 Alpha 通道的网格，读出时 Alpha 视为 255，写入时忽略。
impl PixelGrid for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let Rgb([r, g, b]) = *self.get_pixel(x, y);
        [r, g, b, u8::MAX]
    }

    fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        self.put_pixel(x, y, Rgb([rgba[0], rgba[1], rgba[2]]));
    }
}

/// 按路径加载、保存像素网格。
pub trait GridLoader {
    type Grid: PixelGrid;

    fn load(&self, path: &Path) -> Result<Self::Grid>;
    fn save(&self, grid: &Self::Grid, path: &Path) -> Result<()>;

    /// 图像的宽和高。默认实现加载整张图像，加载器能只读文件头时应当覆盖它。
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        let grid = self.load(path)?;
        Ok((grid.width(), grid.height()))
    }
}

/// 从图像文件解码出的载体网格。
///
/// 8 位 RGB 与 RGBA 图像保持原有的颜色类型，保存后只有存储位发生变化。
/// 其它颜色类型 (灰度、16 位、浮点) 会被转换为 8 位 RGBA 后再写回，
/// 因此保存后的文件在存储位之外也会不同。
pub enum CoverGrid {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

impl CoverGrid {
    pub fn color_type(&self) -> ColorType {
        match self {
            Self::Rgb(_) => ColorType::Rgb8,
            Self::Rgba(_) => ColorType::Rgba8,
        }
    }
}

impl PixelGrid for CoverGrid {
    fn width(&self) -> u32 {
        match self {
            Self::Rgb(img) => PixelGrid::width(img),
            Self::Rgba(img) => PixelGrid::width(img),
        }
    }

    fn height(&self) -> u32 {
        match self {
            Self::Rgb(img) => PixelGrid::height(img),
            Self::Rgba(img) => PixelGrid::height(img),
        }
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        match self {
            Self::Rgb(img) => PixelGrid::pixel(img, x, y),
            Self::Rgba(img) => PixelGrid::pixel(img, x, y),
        }
    }

    fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        match self {
            Self::Rgb(img) => PixelGrid::set_pixel(img, x, y, rgba),
            Self::Rgba(img) => PixelGrid::set_pixel(img, x, y, rgba),
        }
    }
}

/// 基于 `image` 库的文件加载器，格式由扩展名决定。
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileLoader;

impl ImageFileLoader {
    fn image_error(path: &Path) -> impl FnOnce(image::ImageError) -> StegoError + '_ {
        move |source| StegoError::Image {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl GridLoader for ImageFileLoader {
    type Grid = CoverGrid;

    fn load(&self, path: &Path) -> Result<CoverGrid> {
        let image = image::open(path).map_err(Self::image_error(path))?;
        Ok(match image {
            DynamicImage::ImageRgb8(img) => CoverGrid::Rgb(img),
            DynamicImage::ImageRgba8(img) => CoverGrid::Rgba(img),
            other => {
                log::warn!(
                    "Cover image {} has color type {:?}; it will be saved as 8-bit RGBA",
                    path.display(),
                    other.color()
                );
                CoverGrid::Rgba(other.to_rgba8())
            }
        })
    }

    fn save(&self, grid: &CoverGrid, path: &Path) -> Result<()> {
        let saved = match grid {
            CoverGrid::Rgb(img) => img.save(path),
            CoverGrid::Rgba(img) => img.save(path),
        };
        saved.map_err(Self::image_error(path))
    }

    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        image::image_dimensions(path).map_err(Self::image_error(path))
    }
}

/// 单张图像的存储容量 (位)。
pub fn grid_capacity<G: PixelGrid>(grid: &G, bits_per_channel: u8) -> u64 {
    grid.width() as u64 * grid.height() as u64 * CHANNELS_PER_PIXEL as u64 * bits_per_channel as u64
}

/// 存储的访问模式。写模式下被写入过的图像会在离开时保存。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

struct LoadedImage<G> {
    index: usize,
    grid: G,
    capacity: u64,
    dirty: bool,
}

/// 覆盖整个载体图像序列的位流。
///
/// 不是线程安全的：每个会话只在一个线程上使用它。
pub struct PixelBitStore<L: GridLoader = ImageFileLoader> {
    images: Vec<PathBuf>,
    loader: L,
    mode: AccessMode,
    bits_per_channel: u8,
    current: Option<LoadedImage<L::Grid>>,
    next_index: usize,
    offset: u64,
    used: Vec<PathBuf>,
}

impl<L: GridLoader> PixelBitStore<L> {
    /// 在载体图像序列的起点打开一条位流。图像在首次访问时才加载。
    pub fn open(
        images: &[PathBuf],
        loader: L,
        mode: AccessMode,
        bits_per_channel: u8,
    ) -> Result<Self> {
        crate::config::ensure_cover_images(images)?;
        if !(1..=8).contains(&bits_per_channel) {
            return Err(StegoError::InvalidConfig(format!(
                "Bits per channel must be between 1 and 8, got {bits_per_channel}"
            )));
        }

        Ok(Self {
            images: images.to_vec(),
            loader,
            mode,
            bits_per_channel,
            current: None,
            next_index: 0,
            offset: 0,
            used: Vec::new(),
        })
    }

    /// 光标所在图像的路径 (尚未加载任何图像时为 `None`)。
    pub fn current_image(&self) -> Option<&Path> {
        self.current.as_ref().map(|img| self.images[img.index].as_path())
    }

    /// 光标所在图像的总容量 (位)，必要时加载该图像。
    pub fn current_image_capacity(&mut self) -> Result<u64> {
        Ok(if self.ensure_current()? {
            self.current.as_ref().map_or(0, |img| img.capacity)
        } else {
            0
        })
    }

    /// 光标向前移动 `bits` 个槽，可以跨越图像边界。
    ///
    /// # Errors
    ///
    /// 偏移超出剩余总容量时返回 [`StegoError::ExhaustedImages`]。
    pub fn seek(&mut self, bits: u64) -> Result<()> {
        let mut pending = bits;
        loop {
            if !self.ensure_current()? {
                return Err(self.exhausted(bits, pending));
            }
            let remaining = self.remaining_in_current();
            if pending <= remaining {
                self.offset += pending;
                return Ok(());
            }
            pending -= remaining;
            self.offset += remaining;
            if !self.advance_image()? {
                return Err(self.exhausted(bits, pending));
            }
        }
    }

    /// 在当前图像的剩余容量内尽可能多地写入，返回实际写入的位数。
    ///
    /// 当前图像已写满时先切换到下一张图像。调用方需要循环调用直到全部写完。
    ///
    /// # Errors
    ///
    /// 后续再无任何容量时返回 [`StegoError::ImageProcessing`]。
    pub fn write(&mut self, bits: &[bool]) -> Result<usize> {
        if self.mode != AccessMode::Write {
            return Err(StegoError::InvalidConfig(
                "Pixel store was opened read-only".into(),
            ));
        }
        if bits.is_empty() {
            return Ok(0);
        }

        loop {
            if !self.ensure_current()? {
                return Err(self.out_of_space(bits.len()));
            }
            if self.remaining_in_current() > 0 {
                break;
            }
            if !self.advance_image()? {
                return Err(self.out_of_space(bits.len()));
            }
        }

        let count = (self.remaining_in_current() as usize).min(bits.len());
        let bits_per_channel = self.bits_per_channel;
        let start = self.offset;
        let Some(img) = self.current.as_mut() else {
            return Ok(0);
        };

        if !img.dirty {
            img.dirty = true;
            self.used.push(self.images[img.index].clone());
        }

        let width = img.grid.width();
        for (i, &bit) in bits[..count].iter().enumerate() {
            let slot = locate(start + i as u64, width, bits_per_channel);
            let mut rgba = img.grid.pixel(slot.x, slot.y);
            rgba[slot.channel] = modify(rgba[slot.channel], slot.bit, bit);
            img.grid.set_pixel(slot.x, slot.y, rgba);
        }

        self.offset += count as u64;
        Ok(count)
    }

    /// 读取 `count` 位，必要时跨越图像边界。
    ///
    /// # Errors
    ///
    /// 剩余总容量不足时返回 [`StegoError::ExhaustedImages`]。
    pub fn read(&mut self, count: u64) -> Result<Vec<bool>> {
        let mut out = Vec::new();
        let mut pending = count;

        while pending > 0 {
            if !self.ensure_current()? {
                return Err(self.exhausted(count, pending));
            }
            let remaining = self.remaining_in_current();
            if remaining == 0 {
                if !self.advance_image()? {
                    return Err(self.exhausted(count, pending));
                }
                continue;
            }

            let take = remaining.min(pending);
            let start = self.offset;
            // 请求的位数来自块表，可能远超实际容量，只按当前图像预留
            out.reserve(take as usize);
            if let Some(img) = self.current.as_ref() {
                let width = img.grid.width();
                out.extend((0..take).map(|i| {
                    let slot = locate(start + i, width, self.bits_per_channel);
                    recover(img.grid.pixel(slot.x, slot.y)[slot.channel], slot.bit)
                }));
            }
            self.offset += take;
            pending -= take;
        }

        Ok(out)
    }

    /// 保存仍未保存的图像，返回写入过的图像列表。
    pub fn finish(mut self) -> Result<Vec<PathBuf>> {
        self.flush_current()?;
        Ok(std::mem::take(&mut self.used))
    }

    fn remaining_in_current(&self) -> u64 {
        self.current
            .as_ref()
            .map_or(0, |img| img.capacity - self.offset)
    }

    /// 确保光标处有已加载的图像；序列已经走完时返回 `false`。
    fn ensure_current(&mut self) -> Result<bool> {
        if self.current.is_some() {
            return Ok(true);
        }
        self.load_next()
    }

    fn advance_image(&mut self) -> Result<bool> {
        self.flush_current()?;
        self.load_next()
    }

    fn load_next(&mut self) -> Result<bool> {
        let Some(path) = self.images.get(self.next_index) else {
            return Ok(false);
        };

        let grid = self.loader.load(path)?;
        let capacity = grid_capacity(&grid, self.bits_per_channel);
        log::debug!(
            "Loaded cover image {} ({}x{}, {} bits)",
            path.display(),
            grid.width(),
            grid.height(),
            capacity
        );

        self.current = Some(LoadedImage {
            index: self.next_index,
            grid,
            capacity,
            dirty: false,
        });
        self.next_index += 1;
        self.offset = 0;
        Ok(true)
    }

    fn flush_current(&mut self) -> Result<()> {
        if let Some(img) = self.current.take() {
            if img.dirty {
                let path = &self.images[img.index];
                self.loader.save(&img.grid, path)?;
                log::debug!("Saved cover image {}", path.display());
            }
        }
        Ok(())
    }

    fn exhausted(&self, requested: u64, pending: u64) -> StegoError {
        StegoError::ExhaustedImages {
            requested,
            available: requested - pending,
        }
    }

    fn out_of_space(&self, pending: usize) -> StegoError {
        StegoError::ImageProcessing(format!(
            "Not enough space in the cover images: {pending} bits could not be stored after {} image(s)",
            self.images.len()
        ))
    }
}

impl<L: GridLoader> Drop for PixelBitStore<L> {
    fn drop(&mut self) {
        if let Err(err) = self.flush_current() {
            log::warn!("Failed to save cover image while closing the pixel store: {err}");
        }
    }
}

/// 每张载体图像的存储容量 (位)。
pub fn image_capacities<L: GridLoader>(
    images: &[PathBuf],
    loader: &L,
    bits_per_channel: u8,
) -> Result<Vec<(PathBuf, u64)>> {
    images
        .iter()
        .map(|path| {
            let grid = loader.load(path)?;
            Ok((path.clone(), grid_capacity(&grid, bits_per_channel)))
        })
        .collect()
}

/// 图像的像素总数。
pub fn pixel_count<L: GridLoader>(loader: &L, path: &Path) -> Result<u64> {
    let (width, height) = loader.dimensions(path)?;
    Ok(width as u64 * height as u64)
}

/// 清零所有载体图像的全部存储槽，抹去此前隐藏的任何内容。
pub fn clean_all<L: GridLoader>(
    images: &[PathBuf],
    loader: &L,
    bits_per_channel: u8,
) -> Result<()> {
    crate::config::ensure_cover_images(images)?;

    for path in images {
        let mut grid = loader.load(path)?;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let mut rgba = grid.pixel(x, y);
                for value in rgba.iter_mut().take(CHANNELS_PER_PIXEL) {
                    *value = scrub(*value, bits_per_channel);
                }
                grid.set_pixel(x, y, rgba);
            }
        }
        loader.save(&grid, path)?;
        log::info!("Cleaned cover image {}", path.display());
    }

    Ok(())
}
