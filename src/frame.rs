use image::imageops::FilterType;
use image::{DynamicImage, Luma};
use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::types::{Dimensions, FaceRegion};

/// Trait for accessing pixel intensities from a grayscale image.
///
/// Implement this for your own frame type to classify it without copying
/// into a [`GrayImage`] first.
pub trait ImageAccess {
    /// Get the grayscale intensity at (x, y). Returns 0 for out-of-bounds pixels.
    fn get_pixel(&self, x: i32, y: i32) -> u8;

    /// Image dimensions.
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Flatten the image row by row into an intensity vector.
    fn intensities(&self) -> DVector<f64> {
        let (w, h) = (self.width(), self.height());
        DVector::from_iterator(
            w as usize * h as usize,
            (0..h).flat_map(|y| (0..w).map(move |x| (x, y))).map(|(x, y)| {
                self.get_pixel(x as i32, y as i32) as f64
            }),
        )
    }
}

/// A single-channel 8-bit image stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    /// Wrap a row-major buffer. The buffer length must equal `width * height`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::InvalidImage(format!(
                "buffer holds {} bytes, {}x{} needs {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> u8,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { data, width, height }
    }

    /// Decode an image file and convert it to grayscale.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Ok(Self::from(image::open(path)?))
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Copy the part of the image covered by `region`.
    ///
    /// The region is clipped to the image bounds; `None` if nothing remains.
    pub fn crop(&self, region: &FaceRegion) -> Option<GrayImage> {
        let (x0, y0, w, h) = region.clamp_to(self.width, self.height)?;
        let mut data = Vec::with_capacity(w as usize * h as usize);
        for y in y0..y0 + h {
            let start = (y * self.width + x0) as usize;
            data.extend_from_slice(&self.data[start..start + w as usize]);
        }
        Some(Self {
            data,
            width: w,
            height: h,
        })
    }

    /// Resample to exactly `width`x`height` with bilinear filtering.
    pub fn resized(&self, width: u32, height: u32) -> GrayImage {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let buffer = self.to_luma();
        let out = image::imageops::resize(&buffer, width, height, FilterType::Triangle);
        Self::from(out)
    }

    /// Copy into the `image` crate's buffer type.
    pub fn to_luma(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([self.data[(y * self.width + x) as usize]])
        })
    }
}

impl From<image::GrayImage> for GrayImage {
    fn from(buffer: image::GrayImage) -> Self {
        let (width, height) = buffer.dimensions();
        Self {
            data: buffer.into_raw(),
            width,
            height,
        }
    }
}

impl From<DynamicImage> for GrayImage {
    fn from(img: DynamicImage) -> Self {
        Self::from(img.into_luma8())
    }
}

impl ImageAccess for GrayImage {
    fn get_pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn intensities(&self) -> DVector<f64> {
        DVector::from_iterator(self.data.len(), self.data.iter().map(|&p| p as f64))
    }
}
