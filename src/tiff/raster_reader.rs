//! Pixel decoding for stripped and tiled rasters
//!
//! Reads a rectangular pixel window from the first IFD of a TIFF file
//! and returns every sample plane as `f64`. Only the strips or tiles
//! that intersect the window are read and inflated, which keeps full
//! Landsat scenes (7-8k pixels square) cheap to sample over a small
//! region.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use log::{debug, warn};
use std::io::{Read, Seek, SeekFrom};

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::errors::{SceneError, SceneResult};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::SeekableReader;
use crate::tiff::constants::{compression, planar_config, predictor, sample_format, tags};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// Rectangular pixel window (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Window {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Window { x, y, width, height }
    }

    /// The whole raster
    pub fn full(width: u32, height: u32) -> Self {
        Window { x: 0, y: 0, width, height }
    }

    /// Column immediately right of the window
    pub fn end_x(&self) -> u32 {
        self.x + self.width
    }

    /// Row immediately below the window
    pub fn end_y(&self) -> u32 {
        self.y + self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Overlap of two windows, `None` when disjoint
    pub fn intersect(&self, other: &Window) -> Option<Window> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let end_x = self.end_x().min(other.end_x());
        let end_y = self.end_y().min(other.end_y());
        if end_x <= x || end_y <= y {
            return None;
        }
        Some(Window::new(x, y, end_x - x, end_y - y))
    }
}

/// Numeric type of one stored sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Maps BitsPerSample + SampleFormat to a decodable type
    pub fn from_tags(bits: u64, format: u64) -> SceneResult<Self> {
        let format = format as u16;
        match (bits, format) {
            (8, sample_format::UNSIGNED) => Ok(SampleType::U8),
            (8, sample_format::SIGNED) => Ok(SampleType::I8),
            (16, sample_format::UNSIGNED) => Ok(SampleType::U16),
            (16, sample_format::SIGNED) => Ok(SampleType::I16),
            (32, sample_format::UNSIGNED) => Ok(SampleType::U32),
            (32, sample_format::SIGNED) => Ok(SampleType::I32),
            (32, sample_format::IEEEFP) => Ok(SampleType::F32),
            (64, sample_format::IEEEFP) => Ok(SampleType::F64),
            _ => Err(SceneError::UnsupportedSampleLayout(format!(
                "{} bits per sample with sample format {}",
                bits, format
            ))),
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    fn decode(&self, handler: &dyn ByteOrderHandler, bytes: &[u8]) -> f64 {
        match self {
            SampleType::U8 => bytes[0] as f64,
            SampleType::I8 => bytes[0] as i8 as f64,
            SampleType::U16 => handler.u16_from(bytes) as f64,
            SampleType::I16 => handler.u16_from(bytes) as i16 as f64,
            SampleType::U32 => handler.u32_from(bytes) as f64,
            SampleType::I32 => handler.u32_from(bytes) as i32 as f64,
            SampleType::F32 => handler.f32_from(bytes) as f64,
            SampleType::F64 => handler.f64_from(bytes),
        }
    }
}

/// How pixel data is chunked on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    Strips { rows_per_strip: u32 },
    Tiles { tile_width: u32, tile_height: u32 },
}

/// Everything needed to locate and decode pixels of one IFD
#[derive(Debug, Clone)]
pub struct RasterLayout {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub sample_type: SampleType,
    pub planar: u16,
    pub compression: u64,
    pub predictor: u16,
    pub chunks: ChunkLayout,
}

impl RasterLayout {
    /// Reads the layout tags of an IFD
    pub fn from_ifd(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> SceneResult<Self> {
        let (width, height) = ifd.get_dimensions().ok_or(SceneError::MissingDimensions)?;
        if width == 0 || height == 0 {
            return Err(SceneError::MissingDimensions);
        }
        let samples_per_pixel = ifd.get_samples_per_pixel() as u16;

        let bits = match tiff_reader.read_tag_values(reader, ifd, tags::BITS_PER_SAMPLE) {
            Ok(values) => first_uniform(&values, "BitsPerSample")?,
            Err(SceneError::TagNotFound(_)) => 1,
            Err(e) => return Err(e),
        };
        let format = match tiff_reader.read_tag_values(reader, ifd, tags::SAMPLE_FORMAT) {
            Ok(values) => first_uniform(&values, "SampleFormat")?,
            Err(SceneError::TagNotFound(_)) => sample_format::UNSIGNED as u64,
            Err(e) => return Err(e),
        };

        let chunks = if ifd.is_tiled() {
            ChunkLayout::Tiles {
                tile_width: ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(256).max(1) as u32,
                tile_height: ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(256).max(1) as u32,
            }
        } else {
            let rows = ifd.get_tag_value(tags::ROWS_PER_STRIP).unwrap_or(height).min(height).max(1);
            ChunkLayout::Strips { rows_per_strip: rows as u32 }
        };

        Ok(RasterLayout {
            width: width as u32,
            height: height as u32,
            samples_per_pixel: samples_per_pixel.max(1),
            sample_type: SampleType::from_tags(bits, format)?,
            planar: ifd.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(planar_config::CHUNKY as u64) as u16,
            compression: ifd.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE as u64),
            predictor: ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16,
            chunks,
        })
    }

    /// Width and height of one chunk
    fn chunk_size(&self) -> (u32, u32) {
        match self.chunks {
            ChunkLayout::Strips { rows_per_strip } => (self.width, rows_per_strip),
            ChunkLayout::Tiles { tile_width, tile_height } => (tile_width, tile_height),
        }
    }

    fn chunks_across(&self) -> u32 {
        let (chunk_width, _) = self.chunk_size();
        (self.width + chunk_width - 1) / chunk_width
    }

    fn chunks_down(&self) -> u32 {
        let (_, chunk_height) = self.chunk_size();
        (self.height + chunk_height - 1) / chunk_height
    }

    /// Samples stored per pixel inside one chunk
    fn samples_in_chunk(&self) -> usize {
        if self.planar == planar_config::PLANAR {
            1
        } else {
            self.samples_per_pixel as usize
        }
    }
}

fn first_uniform(values: &[u64], what: &str) -> SceneResult<u64> {
    let first = *values.first().ok_or_else(|| SceneError::UnsupportedSampleLayout(format!("empty {}", what)))?;
    if values.iter().any(|v| *v != first) {
        return Err(SceneError::UnsupportedSampleLayout(format!("mixed {} {:?}", what, values)));
    }
    Ok(first)
}

/// Decodes pixel windows from one IFD
pub struct RasterReader<'a> {
    tiff_reader: &'a TiffReader,
    layout: RasterLayout,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
    codec: Box<dyn CompressionHandler>,
}

impl<'a> RasterReader<'a> {
    pub fn new(tiff_reader: &'a TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> SceneResult<Self> {
        let layout = RasterLayout::from_ifd(tiff_reader, reader, ifd)?;
        let (offset_tag, count_tag) = match layout.chunks {
            ChunkLayout::Strips { .. } => (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS),
            ChunkLayout::Tiles { .. } => (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS),
        };
        let offsets = tiff_reader.read_tag_values(reader, ifd, offset_tag)?;
        let byte_counts = tiff_reader.read_tag_values(reader, ifd, count_tag)?;
        if offsets.len() != byte_counts.len() {
            return Err(SceneError::GenericError(format!(
                "{} chunk offsets but {} byte counts",
                offsets.len(),
                byte_counts.len()
            )));
        }

        let codec = CompressionFactory::create_handler(layout.compression)?;
        debug!(
            "Raster {}x{} x{} {:?}, {:?}, compression {}",
            layout.width, layout.height, layout.samples_per_pixel, layout.sample_type, layout.chunks, codec.name()
        );

        Ok(RasterReader { tiff_reader, layout, offsets, byte_counts, codec })
    }

    pub fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    /// Reads every sample plane of the whole raster
    pub fn read_all(&self, reader: &mut dyn SeekableReader) -> SceneResult<Vec<Vec<f64>>> {
        self.read_window(reader, Window::full(self.layout.width, self.layout.height))
    }

    /// Reads a window; returns one row-major buffer per sample
    ///
    /// Parts of the window outside the raster, and sparse chunks (offset
    /// and byte count both zero), stay NaN.
    pub fn read_window(&self, reader: &mut dyn SeekableReader, window: Window) -> SceneResult<Vec<Vec<f64>>> {
        let layout = &self.layout;
        let spp = layout.samples_per_pixel as usize;
        let mut planes = vec![vec![f64::NAN; window.pixel_count()]; spp];

        let clipped = match window.intersect(&Window::full(layout.width, layout.height)) {
            Some(clipped) => clipped,
            None => return Ok(planes),
        };

        let (chunk_width, chunk_height) = layout.chunk_size();
        let across = layout.chunks_across();
        let per_plane = (across * layout.chunks_down()) as usize;
        let plane_count = if layout.planar == planar_config::PLANAR { spp } else { 1 };
        let handler = self.tiff_reader.handler()?;

        for chunk_row in clipped.y / chunk_height..=(clipped.end_y() - 1) / chunk_height {
            for chunk_col in clipped.x / chunk_width..=(clipped.end_x() - 1) / chunk_width {
                for plane in 0..plane_count {
                    let index = plane * per_plane + (chunk_row * across + chunk_col) as usize;
                    let chunk_window = Window::new(chunk_col * chunk_width, chunk_row * chunk_height, chunk_width, chunk_height);
                    let data = match self.read_chunk(reader, index, handler)? {
                        Some(data) => data,
                        None => continue,
                    };
                    self.copy_chunk(&data, chunk_window, clipped, window, plane, &mut planes, handler);
                }
            }
        }

        Ok(planes)
    }

    /// Reads, inflates and un-predicts one chunk; `None` for sparse chunks
    fn read_chunk(&self, reader: &mut dyn SeekableReader, index: usize, handler: &dyn ByteOrderHandler) -> SceneResult<Option<Vec<u8>>> {
        if index >= self.offsets.len() {
            warn!("Chunk index {} out of bounds (have {})", index, self.offsets.len());
            return Ok(None);
        }
        let (offset, byte_count) = (self.offsets[index], self.byte_counts[index]);
        if offset == 0 && byte_count == 0 {
            return Ok(None);
        }

        reader.seek(SeekFrom::Start(offset))?;
        let mut packed = vec![0u8; byte_count as usize];
        reader.read_exact(&mut packed)?;
        let mut data = self.codec.decompress(&packed)?;

        let (chunk_width, _) = self.layout.chunk_size();
        let row_samples = chunk_width as usize * self.layout.samples_in_chunk();
        match self.layout.predictor {
            predictor::HORIZONTAL_DIFFERENCING => {
                undo_horizontal_predictor(&mut data, row_samples, self.layout.samples_in_chunk(), self.layout.sample_type, handler.order())?
            }
            predictor::FLOATING_POINT => {
                data = undo_floating_point_predictor(&data, row_samples, self.layout.sample_type, handler.order())?
            }
            _ => {}
        }
        Ok(Some(data))
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_chunk(
        &self,
        data: &[u8],
        chunk: Window,
        clipped: Window,
        window: Window,
        plane: usize,
        planes: &mut [Vec<f64>],
        handler: &dyn ByteOrderHandler,
    ) {
        let sample_bytes = self.layout.sample_type.bytes();
        let in_chunk = self.layout.samples_in_chunk();
        let overlap = match chunk.intersect(&clipped) {
            Some(overlap) => overlap,
            None => return,
        };

        for y in overlap.y..overlap.end_y() {
            for x in overlap.x..overlap.end_x() {
                let pixel = ((y - chunk.y) as usize * chunk.width as usize + (x - chunk.x) as usize) * in_chunk;
                let out = (y - window.y) as usize * window.width as usize + (x - window.x) as usize;
                for s in 0..in_chunk {
                    let start = (pixel + s) * sample_bytes;
                    // Short final strips decompress to fewer rows
                    if start + sample_bytes > data.len() {
                        continue;
                    }
                    let target = if in_chunk == 1 { plane } else { s };
                    planes[target][out] = self.layout.sample_type.decode(handler, &data[start..start + sample_bytes]);
                }
            }
        }
    }
}

/// Reverses predictor 2 in place for 8/16/32/64-bit integer samples
fn undo_horizontal_predictor(
    data: &mut [u8],
    row_samples: usize,
    stride: usize,
    sample_type: SampleType,
    order: ByteOrder,
) -> SceneResult<()> {
    let size = sample_type.bytes();
    if sample_type.is_float() {
        return Err(SceneError::UnsupportedSampleLayout("horizontal predictor on float samples".to_string()));
    }
    let row_bytes = row_samples * size;
    if row_bytes == 0 {
        return Ok(());
    }

    for row in data.chunks_mut(row_bytes) {
        let samples = row.len() / size;
        for i in stride..samples {
            let prev = read_uint(&row[(i - stride) * size..], size, order);
            let cur = read_uint(&row[i * size..], size, order);
            write_uint(&mut row[i * size..], size, order, prev.wrapping_add(cur));
        }
    }
    Ok(())
}

/// Reverses predictor 3: byte-wise differencing over MSB-first byte planes
fn undo_floating_point_predictor(data: &[u8], row_samples: usize, sample_type: SampleType, order: ByteOrder) -> SceneResult<Vec<u8>> {
    if !sample_type.is_float() {
        return Err(SceneError::UnsupportedSampleLayout("floating point predictor on integer samples".to_string()));
    }
    let size = sample_type.bytes();
    let row_bytes = row_samples * size;
    let mut out = vec![0u8; data.len()];

    for (row_in, row_out) in data.chunks(row_bytes).zip(out.chunks_mut(row_bytes)) {
        let mut row = row_in.to_vec();
        for i in 1..row.len() {
            row[i] = row[i].wrapping_add(row[i - 1]);
        }
        let count = row.len() / size;
        for sample in 0..count {
            for byte in 0..size {
                let plane_value = row[byte * count + sample];
                let dest = match order {
                    ByteOrder::BigEndian => byte,
                    ByteOrder::LittleEndian => size - 1 - byte,
                };
                row_out[sample * size + dest] = plane_value;
            }
        }
    }
    Ok(out)
}

fn read_uint(bytes: &[u8], size: usize, order: ByteOrder) -> u64 {
    match (size, order) {
        (1, _) => bytes[0] as u64,
        (2, ByteOrder::LittleEndian) => LittleEndian::read_u16(bytes) as u64,
        (2, ByteOrder::BigEndian) => BigEndian::read_u16(bytes) as u64,
        (4, ByteOrder::LittleEndian) => LittleEndian::read_u32(bytes) as u64,
        (4, ByteOrder::BigEndian) => BigEndian::read_u32(bytes) as u64,
        (_, ByteOrder::LittleEndian) => LittleEndian::read_u64(bytes),
        (_, ByteOrder::BigEndian) => BigEndian::read_u64(bytes),
    }
}

/// Writes the low `size` bytes of `value`; wrapping matches the sample width
fn write_uint(bytes: &mut [u8], size: usize, order: ByteOrder, value: u64) {
    match (size, order) {
        (1, _) => bytes[0] = value as u8,
        (2, ByteOrder::LittleEndian) => LittleEndian::write_u16(bytes, value as u16),
        (2, ByteOrder::BigEndian) => BigEndian::write_u16(bytes, value as u16),
        (4, ByteOrder::LittleEndian) => LittleEndian::write_u32(bytes, value as u32),
        (4, ByteOrder::BigEndian) => BigEndian::write_u32(bytes, value as u32),
        (_, ByteOrder::LittleEndian) => LittleEndian::write_u64(bytes, value),
        (_, ByteOrder::BigEndian) => BigEndian::write_u64(bytes, value),
    }
}
