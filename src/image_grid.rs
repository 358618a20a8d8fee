//! Composing batches of small images into single viewable grids.
//!
//! Both logging backends want one flat image per write: the event file holds
//! one PNG per image summary, and a plotting pane shows one PNG. Training
//! code, on the other hand, holds batches of `[n, c, h, w]` tensors. This
//! module bridges the two: [`ImageBatch`] is a shape-checked pixel tensor,
//! [`make_grid`] tiles a batch row-major into one [`GridImage`], and
//! [`sprite_sheet`] packs a batch into the square, unpadded layout the
//! embedding projector expects.
//!
//! Pixels are `f32` in `[0, 1]`. Values outside that range are clamped when
//! the grid is quantized to 8-bit, not rejected.

pub mod grid_error;
use grid_error::GridError;

use std::io::Cursor;
use std::path::Path;

/// Default number of images per grid row, matching the common convention of
/// image-logging tooling.
pub const DEFAULT_NROW: usize = 8;

/// Default padding in pixels around each grid cell.
pub const DEFAULT_PADDING: usize = 2;

/// A batch of equally sized images with an explicit shape.
///
/// The constructor validates rank, channel count, and element count, so a
/// batch that exists is always internally consistent. In particular a batch
/// of single-channel images must spell out its channel dimension: a
/// `[100, 64, 64]` shape is rejected as three-channel-less rather than
/// silently read as 100 grayscale images.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    pixels: Vec<f32>,
    count: usize,
    channels: usize,
    height: usize,
    width: usize,
}

impl ImageBatch {
    /// Builds a batch from a dimension list and a flat pixel buffer.
    ///
    /// `dims` may be `[h, w]` (one grayscale image), `[c, h, w]` (one image),
    /// or `[n, c, h, w]` (a batch). The channel count must be 1 or 3, and
    /// `pixels` must hold exactly the product of the dimensions, laid out
    /// image-major then channel-major (all of channel 0 of image 0, then
    /// channel 1, and so on).
    ///
    /// # Errors
    /// Returns a [`GridError`] if the rank is not 2, 3, or 4, if the channel
    /// count is not 1 or 3, if any dimension is zero, if the product of the
    /// dimensions overflows, or if the pixel count disagrees with the
    /// dimensions.
    pub fn from_dims(dims: &[usize], pixels: Vec<f32>) -> Result<ImageBatch, GridError> {
        let (count, channels, height, width) = match *dims {
            [h, w] => (1, 1, h, w),
            [c, h, w] => (1, c, h, w),
            [n, c, h, w] => (n, c, h, w),
            _ => return Err(GridError::BadRank { rank: dims.len() }),
        };
        if channels != 1 && channels != 3 {
            return Err(GridError::BadChannelCount { channels });
        }
        if count == 0 || height == 0 || width == 0 {
            return Err(GridError::EmptyBatch);
        }
        let expected = count
            .checked_mul(channels)
            .and_then(|n| n.checked_mul(height))
            .and_then(|n| n.checked_mul(width))
            .ok_or(GridError::ElementCountOverflow)?;
        if pixels.len() != expected {
            return Err(GridError::WrongElementCount {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(ImageBatch {
            pixels,
            count,
            channels,
            height,
            width,
        })
    }

    /// Builds a single grayscale image from its height, width, and pixels.
    pub fn single(height: usize, width: usize, pixels: Vec<f32>) -> Result<ImageBatch, GridError> {
        ImageBatch::from_dims(&[height, width], pixels)
    }

    /// The number of images in the batch.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Channels per image: 1 for grayscale, 3 for RGB.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Height of each image in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width of each image in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The pixels of image `i`, `channels * height * width` values long.
    ///
    /// # Panics
    /// Panics if `i >= self.count()`.
    pub fn image(&self, i: usize) -> &[f32] {
        let image_len = self.channels * self.height * self.width;
        &self.pixels[i * image_len..(i + 1) * image_len]
    }

    /// A batch holding only the first `n` images, for capping how much of a
    /// large batch gets composed into a preview grid.
    pub fn take(&self, n: usize) -> ImageBatch {
        let keep = n.min(self.count);
        let image_len = self.channels * self.height * self.width;
        ImageBatch {
            pixels: self.pixels[..keep * image_len].to_vec(),
            count: keep,
            channels: self.channels,
            height: self.height,
            width: self.width,
        }
    }
}

/// Layout controls for [`make_grid`].
#[derive(Debug, Clone, PartialEq)]
pub struct GridOptions {
    /// Images per grid row. Rows are filled left to right, top to bottom.
    pub nrow: usize,
    /// Pixels of blank space around each cell.
    pub padding: usize,
}

impl Default for GridOptions {
    /// [`DEFAULT_NROW`] images per row with [`DEFAULT_PADDING`] pixels of padding.
    fn default() -> Self {
        GridOptions {
            nrow: DEFAULT_NROW,
            padding: DEFAULT_PADDING,
        }
    }
}

/// A composed, 8-bit image ready to encode or save.
///
/// Produced by [`make_grid`] and [`sprite_sheet`]; carries its own shape so
/// callers can fill in backend metadata (image summaries want height, width,
/// and colorspace; the projector config wants the per-cell size).
#[derive(Debug, Clone, PartialEq)]
pub struct GridImage {
    pixels: Vec<u8>,
    channels: usize,
    height: usize,
    width: usize,
}

impl GridImage {
    /// The quantized pixels, `channels * height * width` bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Channels in the composed image: 1 for grayscale, 3 for RGB.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Height of the composed image in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width of the composed image in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Encodes the image as PNG bytes.
    ///
    /// # Errors
    /// Returns a [`GridError`] if the encoder fails.
    pub fn encode_png(&self) -> Result<Vec<u8>, GridError> {
        let mut bytes = Vec::new();
        image::write_buffer_with_format(
            &mut Cursor::new(&mut bytes),
            &self.pixels,
            self.width as u32,
            self.height as u32,
            self.color_type(),
            image::ImageFormat::Png,
        )
        .map_err(|e| GridError::PngEncode { source: e })?;
        Ok(bytes)
    }

    /// Writes the image to `path`, with the format chosen by the file
    /// extension. The local-preview counterpart of pushing the grid to a
    /// backend.
    ///
    /// # Errors
    /// Returns a [`GridError`] if the image cannot be encoded or written.
    pub fn save(&self, path: &Path) -> Result<(), GridError> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width as u32,
            self.height as u32,
            self.color_type(),
        )
        .map_err(|e| GridError::Save {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn color_type(&self) -> image::ExtendedColorType {
        match self.channels {
            1 => image::ExtendedColorType::L8,
            _ => image::ExtendedColorType::Rgb8,
        }
    }
}

/// Tiles a batch into one grid image, row-major.
///
/// Each cell is the image plus `padding` blank pixels on every side; the row
/// length is `options.nrow` capped at the batch size, and trailing cells in
/// the last row are left blank. Grayscale batches stay single-channel.
/// Pixel values are clamped to `[0, 1]` and quantized to 8 bits.
pub fn make_grid(batch: &ImageBatch, options: &GridOptions) -> GridImage {
    let cols = options.nrow.max(1).min(batch.count());
    let rows = batch.count().div_ceil(cols);
    compose(batch, rows, cols, options.padding)
}

/// Packs a batch into the square sprite sheet layout the embedding projector
/// reads: `ceil(sqrt(n))` cells on a side, no padding, blank trailing cells.
/// Cell `i` sits at row `i / side`, column `i % side`.
pub fn sprite_sheet(batch: &ImageBatch) -> GridImage {
    let side = (batch.count() as f64).sqrt().ceil() as usize;
    compose(batch, side, side, 0)
}

fn compose(batch: &ImageBatch, rows: usize, cols: usize, padding: usize) -> GridImage {
    let cell_h = batch.height() + padding;
    let cell_w = batch.width() + padding;
    let grid_h = rows * cell_h + padding;
    let grid_w = cols * cell_w + padding;
    let channels = batch.channels();
    let mut pixels = vec![0u8; channels * grid_h * grid_w];
    for i in 0..batch.count() {
        let top = (i / cols) * cell_h + padding;
        let left = (i % cols) * cell_w + padding;
        let image = batch.image(i);
        for y in 0..batch.height() {
            for x in 0..batch.width() {
                for c in 0..channels {
                    // batch pixels are channel-major per image; the composed
                    // grid interleaves channels per pixel as encoders expect
                    let value = image[c * batch.height() * batch.width() + y * batch.width() + x];
                    let row_start = ((top + y) * grid_w + left + x) * channels;
                    pixels[row_start + c] = quantize(value);
                }
            }
        }
    }
    GridImage {
        pixels,
        channels,
        height: grid_h,
        width: grid_w,
    }
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
