//! # 命令处理逻辑模块
//!
//! 包含处理各个子命令的高级业务逻辑。
//! 本模块负责校验参数、调用隐写核心的编码与解码管线，并向用户报告结果。

use crate::cli::{CleanArgs, DecodeArgs, EncodeArgs, EncodedSizeArgs, RandomSeedArgs};
use crate::config::{DecodeOptions, EncodeOptions};
use crate::pipeline::{self, SessionObserver};
use crate::store::{ImageFileLoader, clean_all, image_capacities};
use anyhow::{Context, Result};
use colored::Colorize;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::io::{self, Write};
use std::path::Path;

/// 在终端上显示进度的观察者。
struct ConsoleProgress;

impl SessionObserver for ConsoleProgress {
    fn image_loaded(&mut self, path: &Path) {
        log::info!("Using cover image {}", path.display());
    }

    fn chunk_stored(&mut self, index: usize, total: usize, _bits: u64) {
        print_progress("Encoding", index, total);
    }

    fn chunk_restored(&mut self, index: usize, total: usize) {
        print_progress("Decoding", index, total);
    }
}

fn print_progress(label: &str, index: usize, total: usize) {
    print!(
        "\r{label} chunk {}/{}",
        index.to_string().green().bold(),
        total.to_string().green()
    );
    if index == total {
        println!();
    }
    let _ = io::stdout().flush();
}

/// 确认所有载体图像都存在。
fn ensure_images_exist(images: &[std::path::PathBuf]) -> Result<()> {
    for image in images {
        anyhow::ensure!(
            image.is_file(),
            "Cover image does not exist: {}",
            image.to_string_lossy().red().bold()
        );
    }
    Ok(())
}

/// 处理 'Encode' 命令的执行逻辑。
///
/// 负责检查源文件与载体图像、调用编码管线把文件写入图像，
/// 最后报告实际使用了哪些图像。
///
/// # Arguments
///
/// * `args` - 包含源文件、载体图像与变换参数的 `EncodeArgs` 结构体。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 源文件或任一载体图像不存在。
/// * 首张图像放不下块表，或全部图像的容量不足。
/// * 读取源文件或读写图像失败。
pub fn handle_encode(args: EncodeArgs) -> Result<()> {
    anyhow::ensure!(
        args.file.is_file(),
        "Unable to read file to encode: {}",
        args.file.to_string_lossy().red().bold()
    );
    ensure_images_exist(&args.transform.images)?;

    let mut options = EncodeOptions::new(&args.file, args.transform.images.clone());
    options.chunk_byte_size = args.chunk_size;
    options.dummy_count = args.transform.dummies;
    options.transform = args.transform.transform_config();

    let report = pipeline::encode(&options, ImageFileLoader, &mut ConsoleProgress).with_context(|| {
        format!(
            "Failed to hide {} in the cover images. \nThe images may be too small or unreadable.",
            args.file.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "The file has been successfully hidden ({} bits in {} chunk(s)).",
        report.stored_bits.to_string().green().bold(),
        report.chunk_lengths.len().to_string().green()
    );
    println!("Cover images used:");
    for image in &report.used_images {
        println!("  {}", image.to_string_lossy().green().bold());
    }

    Ok(())
}

/// 处理 'Decode' 命令的执行逻辑。
///
/// 负责检查覆盖保护、调用解码管线从图像中恢复文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 输出文件已存在且未指定 `--force`。
/// * 参数与编码时不一致导致变换失败 (并不保证一定失败)。
/// * 读写图像或输出文件失败。
pub fn handle_decode(args: DecodeArgs) -> Result<()> {
    anyhow::ensure!(
        args.force || !args.output.exists(),
        "Output file already exists: {}. \nUse --force to overwrite it.",
        args.output.to_string_lossy().red().bold()
    );
    ensure_images_exist(&args.transform.images)?;

    let mut options = DecodeOptions::new(&args.output, args.transform.images.clone());
    options.dummy_count = args.transform.dummies;
    options.transform = args.transform.transform_config();

    let report = pipeline::decode(&options, ImageFileLoader, &mut ConsoleProgress).with_context(|| {
        "Failed to recover the hidden file. \nThe password, seed, dummy count or image order may not match the ones used to encode."
    })?;

    println!(
        "The file has been successfully recovered ({} bytes) and saved: {}",
        report.bytes_written.to_string().green().bold(),
        args.output.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'Clean' 命令：清零载体图像的全部存储位。
pub fn handle_clean(args: CleanArgs) -> Result<()> {
    ensure_images_exist(&args.images)?;
    clean_all(&args.images, &ImageFileLoader, args.bits_per_channel)
        .context("Failed to clean the cover images")?;

    println!(
        "{} cover image(s) have been cleaned.",
        args.images.len().to_string().green().bold()
    );
    Ok(())
}

/// 处理 'Capacity' 命令：报告每张图像与总的存储容量。
pub fn handle_capacity(args: CleanArgs) -> Result<()> {
    ensure_images_exist(&args.images)?;
    let capacities = image_capacities(&args.images, &ImageFileLoader, args.bits_per_channel)
        .context("Failed to read the cover images")?;

    let mut total = 0u64;
    for (path, bits) in &capacities {
        total += bits;
        println!(
            "{}: {} bits ({} bytes)",
            path.to_string_lossy().green(),
            bits.to_string().green().bold(),
            (bits / 8).to_string().green()
        );
    }
    println!(
        "Total: {} bits ({} bytes)",
        total.to_string().green().bold(),
        (total / 8).to_string().green().bold()
    );
    Ok(())
}

/// 处理 'EncodedSize' 命令：估算文件编码后需要的空间。
pub fn handle_encoded_size(args: EncodedSizeArgs) -> Result<()> {
    anyhow::ensure!(
        args.file.is_file(),
        "Unable to read file: {}",
        args.file.to_string_lossy().red().bold()
    );

    let mut options = EncodeOptions::new(&args.file, args.transform.images.clone());
    options.chunk_byte_size = args.chunk_size;
    options.dummy_count = args.transform.dummies;
    options.transform = args.transform.transform_config();

    let estimate = pipeline::estimate(&options, &ImageFileLoader)
        .context("Failed to calculate the encoded size")?;

    println!(
        "Chunks: {}, table: {} bits, content: {} bits",
        estimate.chunk_count.to_string().green(),
        estimate.table_bits.to_string().green(),
        estimate.content_bits.to_string().green()
    );
    println!(
        "Total: {} bits ({} bytes)",
        estimate.total_bits().to_string().green().bold(),
        estimate.total_bits().div_ceil(8).to_string().green().bold()
    );
    Ok(())
}

/// 处理 'RandomSeed' 命令：打印一个随机种子。
pub fn handle_random_seed(args: RandomSeedArgs) -> Result<()> {
    anyhow::ensure!(args.length > 0, "Seed length must be greater than zero");

    let seed: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(args.length)
        .map(char::from)
        .collect();
    println!("{seed}");
    Ok(())
}
