// THEORY:
// The `sampler` module is the bridge between a host's pixel storage and the
// analysis side of the engine. Hosts (an editor adapter, the CLI, a test) own
// pixels in whatever layout they like; the engine only ever asks for them
// through the `PixelRegion` capability trait, one row at a time. The output is
// a flat, row-major `SampleBuffer` holding the first channel of every pixel.
// Metadata layers are painted as gray fills (r = g = b), so channel zero is
// the intensity for any interleaving the host uses.
//
// Key architectural principles:
// 1.  **Capability seam**: The engine never links against an editor object
//     model. Anything that can report its dimensions and serve rows can be
//     sampled, which is what keeps the whole pipeline testable with plain
//     in-memory buffers.
// 2.  **Row-bounded memory**: Sampling materializes one row at a time and
//     appends into the output buffer. Peak transient memory is a single row
//     regardless of image height.
// 3.  **Dumb extraction**: No byte is interpreted here. Group requantization
//     and lock thresholds belong to `channel_codec`, applied downstream by the
//     summarizer.

pub mod sampler {
    use crate::core_modules::channel_codec::channel_codec::Byte;
    use image::{GrayImage, RgbaImage};
    use thiserror::Error;

    /// A flat, row-major sequence of single-channel samples, one byte per
    /// pixel. Produced fresh per extraction and never mutated in place.
    pub type SampleBuffer = Vec<Byte>;

    /// A rectangular region of pixels the engine can read row by row.
    ///
    /// `read_row` must return exactly `width * bytes_per_pixel` bytes with
    /// pixels interleaved; the first byte of each pixel is taken as the
    /// sample.
    pub trait PixelRegion {
        fn width(&self) -> u32;
        fn height(&self) -> u32;
        fn bytes_per_pixel(&self) -> usize;
        fn read_row(&self, y: u32) -> Vec<Byte>;
    }

    #[derive(Debug, Error)]
    pub enum RegionError {
        #[error(
            "raster buffer holds {actual} bytes but {width}x{height} at {bytes_per_pixel} byte(s) per pixel requires {expected}"
        )]
        BufferShape {
            width: u32,
            height: u32,
            bytes_per_pixel: usize,
            expected: usize,
            actual: usize,
        },
    }

    /// An owned, contiguous pixel region. Backs hosts that already hold a
    /// full decoded buffer (loaded PNGs, freshly painted maps, test fixtures).
    pub struct RasterRegion {
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
        data: Vec<Byte>,
    }

    impl RasterRegion {
        /// Wraps a raw interleaved buffer, rejecting any buffer whose length
        /// disagrees with the claimed dimensions.
        pub fn new(
            width: u32,
            height: u32,
            bytes_per_pixel: usize,
            data: Vec<Byte>,
        ) -> Result<Self, RegionError> {
            let expected = width as usize * height as usize * bytes_per_pixel;
            if data.len() != expected {
                return Err(RegionError::BufferShape {
                    width,
                    height,
                    bytes_per_pixel,
                    expected,
                    actual: data.len(),
                });
            }
            Ok(Self {
                width,
                height,
                bytes_per_pixel,
                data,
            })
        }

        /// Read-only view of the underlying interleaved bytes.
        pub fn bytes(&self) -> &[Byte] {
            &self.data
        }
    }

    impl From<GrayImage> for RasterRegion {
        fn from(image: GrayImage) -> Self {
            let (width, height) = image.dimensions();
            Self {
                width,
                height,
                bytes_per_pixel: 1,
                data: image.into_raw(),
            }
        }
    }

    impl From<RgbaImage> for RasterRegion {
        fn from(image: RgbaImage) -> Self {
            let (width, height) = image.dimensions();
            Self {
                width,
                height,
                bytes_per_pixel: 4,
                data: image.into_raw(),
            }
        }
    }

    impl PixelRegion for RasterRegion {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn bytes_per_pixel(&self) -> usize {
            self.bytes_per_pixel
        }

        fn read_row(&self, y: u32) -> Vec<Byte> {
            let stride = self.width as usize * self.bytes_per_pixel;
            let start = y as usize * stride;
            self.data[start..start + stride].to_vec()
        }
    }

    /// Extracts the first channel of every pixel in the region, row by row,
    /// into a flat buffer of `width * height` samples.
    ///
    /// A region with zero width or zero height yields an empty buffer, as
    /// does a degenerate region reporting zero bytes per pixel. There is no
    /// error path.
    pub fn sample_channel(region: &dyn PixelRegion) -> SampleBuffer {
        let width = region.width();
        let height = region.height();
        let bytes_per_pixel = region.bytes_per_pixel();
        if width == 0 || height == 0 || bytes_per_pixel == 0 {
            return SampleBuffer::new();
        }

        let mut samples = SampleBuffer::with_capacity(width as usize * height as usize);
        for y in 0..height {
            let row = region.read_row(y);
            for pixel in row.chunks(bytes_per_pixel) {
                samples.push(pixel[0]);
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::sampler::*;

    #[test]
    fn raster_region_rejects_mismatched_buffer() {
        let result = RasterRegion::new(4, 4, 4, vec![0u8; 3]);
        assert!(matches!(
            result,
            Err(RegionError::BufferShape {
                expected: 64,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn sample_channel_takes_first_byte_of_each_pixel() {
        // 3x2 RGBA region; red channel carries the payload.
        let mut data = Vec::new();
        for value in [10u8, 20, 30, 40, 50, 60] {
            data.extend_from_slice(&[value, 0, 0, 255]);
        }
        let region = RasterRegion::new(3, 2, 4, data).expect("valid raster");

        let samples = sample_channel(&region);
        assert_eq!(samples, vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn sample_channel_is_row_major() {
        // 2x2 single-channel region laid out row by row.
        let region = RasterRegion::new(2, 2, 1, vec![1, 2, 3, 4]).expect("valid raster");
        assert_eq!(sample_channel(&region), vec![1, 2, 3, 4]);
    }

    #[test]
    fn zero_area_region_yields_empty_buffer() {
        let empty_width = RasterRegion::new(0, 5, 4, Vec::new()).expect("valid raster");
        let empty_height = RasterRegion::new(5, 0, 1, Vec::new()).expect("valid raster");
        assert!(sample_channel(&empty_width).is_empty());
        assert!(sample_channel(&empty_height).is_empty());
    }

    #[test]
    fn degenerate_bytes_per_pixel_yields_empty_buffer() {
        struct Degenerate;
        impl PixelRegion for Degenerate {
            fn width(&self) -> u32 {
                8
            }
            fn height(&self) -> u32 {
                8
            }
            fn bytes_per_pixel(&self) -> usize {
                0
            }
            fn read_row(&self, _y: u32) -> Vec<u8> {
                Vec::new()
            }
        }
        assert!(sample_channel(&Degenerate).is_empty());
    }

    #[test]
    fn gray_image_converts_without_copy_surprises() {
        let image = image::GrayImage::from_raw(2, 3, vec![9u8, 8, 7, 6, 5, 4]).expect("raw fits");
        let region = RasterRegion::from(image);
        assert_eq!(region.width(), 2);
        assert_eq!(region.height(), 3);
        assert_eq!(region.bytes_per_pixel(), 1);
        assert_eq!(sample_channel(&region), vec![9, 8, 7, 6, 5, 4]);
    }
}
