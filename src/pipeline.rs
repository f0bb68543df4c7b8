//! # 编码 / 解码编排
//!
//! 每个会话恰好两个线程，由容量为 2 的有界队列连接：
//!
//! * 编码：生产者线程读取源文件并执行变换，调用线程把位序列写入像素并累计块长度，
//!   最后把块表写到首张图像开头。
//! * 解码：调用线程先同步读取块表，再逐块读取像素并入队；写出线程执行逆变换并追加到目标文件。
//!
//! 除队列外唯一的共享状态是受互斥锁保护的错误槽。后台线程出错时记录错误并丢弃自己那端的队列，
//! 另一端的阻塞操作因此立即返回；编排线程总是先等待后台线程结束，再把错误返回给调用方。

use crate::chunking::ChunkPlan;
use crate::config::{DecodeOptions, DummyCount, EncodeOptions, TransformConfig, ensure_cover_images};
use crate::constants::PIPELINE_QUEUE_CAPACITY;
use crate::error::{Result, StegoError};
use crate::store::{AccessMode, GridLoader, PixelBitStore, pixel_count};
use crate::table;
use crate::transform::{self, auto_dummy_count};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Mutex, PoisonError};
use std::thread;

/// 会话进度的观察者。所有回调都在调用线程上执行。
pub trait SessionObserver {
    /// 开始向一张新的载体图像写入或从中读取。
    fn image_loaded(&mut self, _path: &Path) {}

    /// 第 `index` 个块 (从 1 开始，共 `total` 个) 已写入像素。
    fn chunk_stored(&mut self, _index: usize, _total: usize, _bits: u64) {}

    /// 第 `index` 个块 (从 1 开始，共 `total` 个) 已从像素读出。
    fn chunk_restored(&mut self, _index: usize, _total: usize) {}
}

/// 不做任何事的观察者。
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// 编码会话的结果。
#[derive(Debug, Clone)]
pub struct EncodeReport {
    pub chunk_lengths: Vec<u64>,
    /// 实际被写入过的载体图像 (按顺序)。
    pub used_images: Vec<PathBuf>,
    /// 块表与所有内容占用的总位数。
    pub stored_bits: u64,
    pub dummy_count: usize,
}

/// 解码会话的结果。
#[derive(Debug, Clone, Copy)]
pub struct DecodeReport {
    pub chunk_count: usize,
    pub bytes_written: u64,
}

/// 不写入任何图像时估算出的存储需求。
#[derive(Debug, Clone, Copy)]
pub struct SizeEstimate {
    pub chunk_count: usize,
    pub table_bits: u64,
    pub content_bits: u64,
}

impl SizeEstimate {
    pub fn total_bits(&self) -> u64 {
        self.table_bits + self.content_bits
    }
}

enum Message {
    Chunk(Vec<bool>),
    Done,
}

#[derive(Default)]
struct ErrorSlot(Mutex<Option<StegoError>>);

impl ErrorSlot {
    /// 只保留第一个错误。
    fn record(&self, err: StegoError) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<StegoError> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// 把显式或自动的伪装组数解析为具体数值。
pub fn resolve_dummy_count<L: GridLoader>(
    images: &[PathBuf],
    loader: &L,
    setting: DummyCount,
) -> Result<usize> {
    match setting {
        DummyCount::Explicit(count) => Ok(count),
        DummyCount::Auto => {
            let (Some(first), Some(last)) = (images.first(), images.last()) else {
                return Err(StegoError::InvalidConfig(
                    "At least one cover image is required".into(),
                ));
            };
            let count = auto_dummy_count(pixel_count(loader, first)?, pixel_count(loader, last)?);
            log::debug!("Derived dummy count {count} from cover image sizes");
            Ok(count)
        }
    }
}

fn session_config<L: GridLoader>(
    images: &[PathBuf],
    loader: &L,
    transform: &TransformConfig,
    dummy_count: DummyCount,
) -> Result<TransformConfig> {
    ensure_cover_images(images)?;
    transform.validate()?;
    let mut config = transform.clone();
    config.dummy_count = resolve_dummy_count(images, loader, dummy_count)?;
    Ok(config)
}

/// 把源文件隐藏进载体图像序列。载体图像被原地修改。
///
/// # Errors
///
/// * 首张图像放不下块表：[`StegoError::InsufficientTableSpace`]。
/// * 载体图像总容量不足：[`StegoError::ImageProcessing`]。
/// * 文件或图像 I/O 失败。
///
/// 出错时已经写入的图像与数据不会回滚。
pub fn encode<L: GridLoader + Clone>(
    options: &EncodeOptions,
    loader: L,
    observer: &mut dyn SessionObserver,
) -> Result<EncodeReport> {
    let config = session_config(
        &options.cover_images,
        &loader,
        &options.transform,
        options.dummy_count,
    )?;

    let source = File::open(&options.source)?;
    let plan = ChunkPlan::new(source.metadata()?.len(), options.chunk_byte_size)?;
    log::info!(
        "Encoding {} as {} chunk(s) into {} cover image(s)",
        options.source.display(),
        plan.chunk_count,
        options.cover_images.len()
    );

    let mut store = PixelBitStore::open(
        &options.cover_images,
        loader.clone(),
        AccessMode::Write,
        config.bits_per_channel,
    )?;

    let table_bits = plan.table_bits() as u64;
    let available = store.current_image_capacity()?;
    if table_bits > available {
        return Err(StegoError::InsufficientTableSpace {
            required: table_bits,
            available,
        });
    }
    store.seek(table_bits)?;

    let errors = ErrorSlot::default();
    let chunk_lengths = thread::scope(|scope| -> Result<Vec<u64>> {
        let (tx, rx) = sync_channel(PIPELINE_QUEUE_CAPACITY);
        let config = &config;
        let errors = &errors;
        let producer =
            scope.spawn(move || produce_chunks(source, plan.chunk_byte_size, config, tx, errors));

        let consumed = consume_chunks(&mut store, rx, errors, plan.chunk_count, observer);
        producer.join().map_err(|_| StegoError::WorkerPanicked)?;
        consumed
    })?;

    let mut used_images = store.finish()?;
    table::write(
        &options.cover_images,
        loader,
        &chunk_lengths,
        &config.random_seed,
        config.bits_per_channel,
    )?;

    let leading = &options.cover_images[0];
    if !used_images.contains(leading) {
        used_images.insert(0, leading.clone());
    }

    let stored_bits = table_bits + chunk_lengths.iter().sum::<u64>();
    log::info!(
        "Stored {stored_bits} bits across {} cover image(s)",
        used_images.len()
    );

    Ok(EncodeReport {
        chunk_lengths,
        used_images,
        stored_bits,
        dummy_count: config.dummy_count,
    })
}

fn produce_chunks(
    source: File,
    chunk_byte_size: usize,
    config: &TransformConfig,
    tx: SyncSender<Message>,
    errors: &ErrorSlot,
) {
    if let Err(err) = read_and_transform(source, chunk_byte_size, config, &tx) {
        log::debug!("Encode producer stopped: {err}");
        errors.record(err);
    }
}

fn read_and_transform(
    source: File,
    chunk_byte_size: usize,
    config: &TransformConfig,
    tx: &SyncSender<Message>,
) -> Result<()> {
    let mut reader = BufReader::new(source);
    loop {
        let mut chunk = Vec::with_capacity(chunk_byte_size);
        (&mut reader)
            .take(chunk_byte_size as u64)
            .read_to_end(&mut chunk)?;
        if chunk.is_empty() {
            break;
        }

        let bits = transform::encode(&chunk, config)?;
        if tx.send(Message::Chunk(bits)).is_err() {
            // 消费端已经停止，错误由它自己报告
            return Ok(());
        }
    }

    let _ = tx.send(Message::Done);
    Ok(())
}

fn consume_chunks<L: GridLoader>(
    store: &mut PixelBitStore<L>,
    rx: Receiver<Message>,
    errors: &ErrorSlot,
    expected: usize,
    observer: &mut dyn SessionObserver,
) -> Result<Vec<u64>> {
    let mut lengths = Vec::with_capacity(expected);
    let mut last_image = report_image(store, None, observer);

    loop {
        let message = rx.recv();
        if let Some(err) = errors.take() {
            return Err(err);
        }

        match message {
            Ok(Message::Chunk(bits)) => {
                if lengths.len() == expected {
                    return Err(StegoError::ChunkTable(format!(
                        "Source file grew during encoding; only {expected} chunk(s) were reserved"
                    )));
                }

                let mut written = 0;
                while written < bits.len() {
                    written += store.write(&bits[written..])?;
                    last_image = report_image(store, last_image, observer);
                }

                lengths.push(bits.len() as u64);
                log::trace!("Stored chunk {}/{expected} ({} bits)", lengths.len(), bits.len());
                observer.chunk_stored(lengths.len(), expected, bits.len() as u64);
            }
            Ok(Message::Done) => return Ok(lengths),
            Err(_) => return Err(errors.take().unwrap_or(StegoError::WorkerPanicked)),
        }
    }
}

fn report_image<L: GridLoader>(
    store: &PixelBitStore<L>,
    last: Option<PathBuf>,
    observer: &mut dyn SessionObserver,
) -> Option<PathBuf> {
    match store.current_image() {
        Some(path) if last.as_deref() != Some(path) => {
            observer.image_loaded(path);
            Some(path.to_path_buf())
        }
        _ => last,
    }
}

/// 从载体图像序列中恢复文件。
///
/// 目标文件在读出块表后创建；解码中途失败时，已写出的部分会留在磁盘上。
///
/// # Errors
///
/// * 参数与编码时不一致：通常是 [`StegoError::Transformation`]，但不保证一定出错。
/// * 块表声称的数据超出图像容量：[`StegoError::ExhaustedImages`]。
/// * 文件或图像 I/O 失败。
pub fn decode<L: GridLoader>(
    options: &DecodeOptions,
    loader: L,
    observer: &mut dyn SessionObserver,
) -> Result<DecodeReport> {
    let config = session_config(
        &options.cover_images,
        &loader,
        &options.transform,
        options.dummy_count,
    )?;

    let mut store = PixelBitStore::open(
        &options.cover_images,
        loader,
        AccessMode::Read,
        config.bits_per_channel,
    )?;
    let chunk_lengths = table::read_from(&mut store, &config.random_seed)?;
    log::info!(
        "Decoding {} chunk(s) into {}",
        chunk_lengths.len(),
        options.destination.display()
    );

    let destination = File::create(&options.destination)?;
    let errors = ErrorSlot::default();
    let bytes_written = thread::scope(|scope| -> Result<u64> {
        let (tx, rx) = sync_channel(PIPELINE_QUEUE_CAPACITY);
        let config = &config;
        let errors = &errors;
        let writer = scope.spawn(move || write_chunks(destination, rx, config, errors));

        let read = read_chunks(&mut store, &chunk_lengths, tx, observer);
        let written = writer.join().map_err(|_| StegoError::WorkerPanicked)?;
        if let Some(err) = errors.take() {
            return Err(err);
        }
        read.map(|()| written)
    })?;

    log::info!("Recovered {bytes_written} bytes");
    Ok(DecodeReport {
        chunk_count: chunk_lengths.len(),
        bytes_written,
    })
}

fn read_chunks<L: GridLoader>(
    store: &mut PixelBitStore<L>,
    chunk_lengths: &[u64],
    tx: SyncSender<Message>,
    observer: &mut dyn SessionObserver,
) -> Result<()> {
    let total = chunk_lengths.len();
    let mut last_image = report_image(store, None, observer);

    for (index, &len) in chunk_lengths.iter().enumerate() {
        let bits = store.read(len)?;
        last_image = report_image(store, last_image, observer);
        observer.chunk_restored(index + 1, total);

        if tx.send(Message::Chunk(bits)).is_err() {
            log::debug!("Decode writer stopped; cancelling after chunk {}", index + 1);
            return Ok(());
        }
    }

    let _ = tx.send(Message::Done);
    Ok(())
}

fn write_chunks(
    destination: File,
    rx: Receiver<Message>,
    config: &TransformConfig,
    errors: &ErrorSlot,
) -> u64 {
    let mut writer = BufWriter::new(destination);
    let mut written = 0;
    if let Err(err) = drain_into(&mut writer, &rx, config, &mut written) {
        log::debug!("Decode writer stopped: {err}");
        errors.record(err);
    }
    written
}

fn drain_into(
    writer: &mut BufWriter<File>,
    rx: &Receiver<Message>,
    config: &TransformConfig,
    written: &mut u64,
) -> Result<()> {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Chunk(bits) => {
                let bytes = transform::decode(bits, config)?;
                writer.write_all(&bytes)?;
                writer.flush()?;
                *written += bytes.len() as u64;
            }
            Message::Done => break,
        }
    }
    writer.flush()?;
    Ok(())
}

/// 在不触碰图像的情况下估算编码所需的位数。
pub fn estimate<L: GridLoader>(options: &EncodeOptions, loader: &L) -> Result<SizeEstimate> {
    let config = session_config(
        &options.cover_images,
        loader,
        &options.transform,
        options.dummy_count,
    )?;

    let source = File::open(&options.source)?;
    let plan = ChunkPlan::new(source.metadata()?.len(), options.chunk_byte_size)?;
    let mut reader = BufReader::new(source);
    let mut content_bits = 0;

    loop {
        let mut chunk = Vec::with_capacity(options.chunk_byte_size);
        (&mut reader)
            .take(options.chunk_byte_size as u64)
            .read_to_end(&mut chunk)?;
        if chunk.is_empty() {
            break;
        }
        content_bits += transform::encoded_bit_length(&chunk, &config)?;
    }

    Ok(SizeEstimate {
        chunk_count: plan.chunk_count,
        table_bits: plan.table_bits() as u64,
        content_bits,
    })
}
