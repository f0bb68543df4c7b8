use image::{ColorType, ImageBuffer, Rgb, Rgba};
use lsb_vault::{
    DummyCount, ErrorKind, ImageFileLoader, PixelBitStore,
    constants::MAX_CHUNK_BITS,
    pipeline::resolve_dummy_count,
    store::{AccessMode, CoverGrid, GridLoader, image_capacities},
    table,
    transform::auto_dummy_count,
};
use rand::{Rng, RngCore};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// 创建一个带有随机像素的测试图像
fn create_test_image(path: &Path, width: u32, height: u32) {
    let mut img_buf = ImageBuffer::new(width, height);
    let mut raw_pixels = vec![0u8; (width * height * 4) as usize];
    rand::rng().fill_bytes(&mut raw_pixels);

    img_buf
        .pixels_mut()
        .zip(raw_pixels.chunks_exact(4))
        .for_each(|(pixel, chunk)| {
            *pixel = Rgba([chunk[0], chunk[1], chunk[2], 255]);
        });

    img_buf.save(path).expect("Failed to create test image.");
}

fn covers(dir: &Path, sizes: &[(u32, u32)]) -> Vec<PathBuf> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| {
            let path = dir.join(format!("cover_{i}.png"));
            create_test_image(&path, w, h);
            path
        })
        .collect()
}

fn random_bits(len: usize) -> Vec<bool> {
    let mut rng = rand::rng();
    (0..len).map(|_| rng.random_bool(0.5)).collect()
}

fn write_all(store: &mut PixelBitStore, bits: &[bool]) -> lsb_vault::Result<usize> {
    let mut written = 0;
    let mut calls = 0;
    while written < bits.len() {
        written += store.write(&bits[written..])?;
        calls += 1;
    }
    Ok(calls)
}

/// 验证写满全部容量恰好成功，且可以完整读回
#[test]
fn test_exact_capacity_roundtrip() -> anyhow::Result<()> {
    let dir = tempdir()?;
    // 4x4 与 2x3 像素，每通道 1 位：48 + 18 位
    let images = covers(dir.path(), &[(4, 4), (2, 3)]);
    let bits = random_bits(66);

    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Write, 1)?;
    let calls = write_all(&mut store, &bits)?;
    assert_eq!(calls, 2, "One write call per image.");
    assert_eq!(store.finish()?, images);

    let mut reader = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Read, 1)?;
    assert_eq!(reader.read(66)?, bits);

    Ok(())
}

/// 验证超出总容量时写入失败
#[test]
fn test_exceeding_capacity_fails() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(4, 4), (2, 3)]);

    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Write, 1)?;
    let err = write_all(&mut store, &random_bits(67)).expect_err("one bit too many");
    assert_eq!(err.kind(), ErrorKind::ImageProcessing);

    Ok(())
}

/// 验证写入只返回当前图像能容纳的位数
#[test]
fn test_write_is_bounded_by_current_image() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(4, 4), (4, 4)]);

    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Write, 1)?;
    store.seek(40)?;
    assert_eq!(store.write(&random_bits(20))?, 8);
    assert_eq!(store.current_image(), Some(images[0].as_path()));
    assert_eq!(store.write(&random_bits(12))?, 12);
    assert_eq!(store.current_image(), Some(images[1].as_path()));

    Ok(())
}

/// 验证定位与读取越界时报告图像耗尽
#[test]
fn test_seek_and_read_past_end() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(4, 4)]);

    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Read, 1)?;
    store.seek(48)?;
    let err = store.read(1).expect_err("nothing left");
    assert_eq!(err.kind(), ErrorKind::ExhaustedImages);

    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Read, 1)?;
    let err = store.seek(49).expect_err("seek past end");
    assert_eq!(err.kind(), ErrorKind::ExhaustedImages);

    Ok(())
}

/// 验证只读存储拒绝写入
#[test]
fn test_read_only_store_rejects_writes() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(4, 4)]);

    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Read, 1)?;
    assert!(store.write(&[true]).is_err());

    Ok(())
}

/// 验证多位通道的容量与读写
#[test]
fn test_multiple_bits_per_channel() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(5, 5)]);

    let capacities = image_capacities(&images, &ImageFileLoader, 3)?;
    assert_eq!(capacities[0].1, 5 * 5 * 3 * 3);

    let bits = random_bits(225);
    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Write, 3)?;
    write_all(&mut store, &bits)?;
    drop(store);

    let mut reader = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Read, 3)?;
    assert_eq!(reader.read(225)?, bits);

    Ok(())
}

/// 验证块表在有无种子时都能原样读回
#[test]
fn test_chunk_table_roundtrip() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(30, 30)]);
    let mut rng = rand::rng();

    for seed in ["", "random-seed"] {
        for count in [0usize, 1, 2, 17, 40] {
            let mut lengths: Vec<u64> = (0..count)
                .map(|_| rng.random_range(0..=MAX_CHUNK_BITS))
                .collect();
            if count >= 2 {
                lengths[0] = 0;
                lengths[1] = MAX_CHUNK_BITS;
            }

            table::write(&images, ImageFileLoader, &lengths, seed, 1)?;
            assert_eq!(table::read(&images, ImageFileLoader, seed, 1)?, lengths);
        }
    }

    Ok(())
}

/// 验证块表放不进首张图像时拒绝写入
#[test]
fn test_chunk_table_needs_leading_image_space() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(4, 4), (100, 100)]);

    let err = table::write(&images, ImageFileLoader, &[1, 2], "", 1)
        .expect_err("84 bits > 48 bits");
    assert_eq!(err.kind(), ErrorKind::InsufficientTableSpace);

    Ok(())
}

/// 验证请求远超容量的读取只会报告图像耗尽，而不会预先分配整段内存
#[test]
fn test_huge_read_is_exhausted_without_preallocating() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(4, 4), (2, 3)]);

    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Read, 1)?;
    let err = store.read(MAX_CHUNK_BITS).expect_err("far beyond 66 bits");
    assert_eq!(err.kind(), ErrorKind::ExhaustedImages);

    Ok(())
}

/// 验证 RGB 载体图像写回后仍是 RGB，且数据可以读回
#[test]
fn test_rgb_cover_keeps_color_type() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("rgb.png");
    let mut raw_pixels = vec![0u8; 6 * 6 * 3];
    rand::rng().fill_bytes(&mut raw_pixels);
    ImageBuffer::<Rgb<u8>, _>::from_raw(6, 6, raw_pixels)
        .expect("buffer size matches")
        .save(&path)?;
    let images = vec![path.clone()];

    let grid = ImageFileLoader.load(&path)?;
    assert_eq!(grid.color_type(), ColorType::Rgb8);
    assert!(matches!(grid, CoverGrid::Rgb(_)));

    let bits = random_bits(108);
    let mut store = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Write, 1)?;
    write_all(&mut store, &bits)?;
    store.finish()?;

    assert_eq!(image::open(&path)?.color(), ColorType::Rgb8);
    let mut reader = PixelBitStore::open(&images, ImageFileLoader, AccessMode::Read, 1)?;
    assert_eq!(reader.read(108)?, bits);

    Ok(())
}

/// 记录完整加载次数的加载器
#[derive(Default)]
struct CountingLoader {
    loads: Cell<usize>,
}

impl GridLoader for CountingLoader {
    type Grid = CoverGrid;

    fn load(&self, path: &Path) -> lsb_vault::Result<CoverGrid> {
        self.loads.set(self.loads.get() + 1);
        ImageFileLoader.load(path)
    }

    fn save(&self, grid: &CoverGrid, path: &Path) -> lsb_vault::Result<()> {
        ImageFileLoader.save(grid, path)
    }

    fn dimensions(&self, path: &Path) -> lsb_vault::Result<(u32, u32)> {
        ImageFileLoader.dimensions(path)
    }
}

/// 验证自动伪装组数只读取图像尺寸，不解码像素
#[test]
fn test_auto_dummy_count_reads_only_dimensions() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let images = covers(dir.path(), &[(7, 5), (3, 2), (9, 4)]);
    let loader = CountingLoader::default();

    let count = resolve_dummy_count(&images, &loader, DummyCount::Auto)?;
    assert_eq!(count, auto_dummy_count(35, 36));
    assert_eq!(loader.loads.get(), 0);

    Ok(())
}
