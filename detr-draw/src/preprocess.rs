//! Image loading and model input preparation.

use crate::{common::*, config::PreprocessConfig};

pub const IMAGENET_MEAN: [f64; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f64; 3] = [0.229, 0.224, 0.225];

/// An image loaded from disk with its model input.
#[derive(Debug)]
pub struct LoadedImage {
    /// The source pixels in `[3, height, width]` uint8.
    pub pixels: Tensor,
    /// The normalized float model input on the target device.
    pub input: Tensor,
}

impl LoadedImage {
    /// The source image size, failing unless the pixels are `[C, H, W]`.
    pub fn size(&self) -> Result<HW<usize>> {
        let (_, height, width) = self.pixels.size3()?;
        Ok(HW::from_hw([height as usize, width as usize]))
    }
}

/// Resizes and normalizes images for the detector.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    min_size: usize,
    max_size: usize,
    device: Device,
}

impl Preprocessor {
    pub fn new(config: &PreprocessConfig, device: Device) -> Result<Self> {
        config.validate()?;
        let PreprocessConfig { min_size, max_size } = *config;
        Ok(Self {
            min_size,
            max_size,
            device,
        })
    }

    /// Compute the resized image size.
    ///
    /// The shorter side is scaled to `min_size` while keeping the aspect
    /// ratio, unless the longer side would exceed `max_size`, in which case
    /// the shorter side shrinks accordingly.
    pub fn target_size(&self, size: &HW<usize>) -> HW<usize> {
        let [h, w] = size.hw();
        let (short, long) = if h <= w { (h, w) } else { (w, h) };
        if short == 0 {
            return *size;
        }

        let mut target = self.min_size;
        if long as f64 / short as f64 * target as f64 > self.max_size as f64 {
            target = (self.max_size as f64 * short as f64 / long as f64).round() as usize;
        }

        if short == target {
            return *size;
        }

        if w < h {
            HW::from_hw([target * h / w, target])
        } else {
            HW::from_hw([target, target * w / h])
        }
    }

    /// Load an image file and prepare the model input.
    pub fn load_image(&self, path: impl AsRef<Path>) -> Result<LoadedImage> {
        let path = path.as_ref();
        let pixels = vision::image::load(path)
            .with_context(|| format!("failed to load image {}", path.display()))?;
        let input = self.forward(&pixels)?;
        Ok(LoadedImage { pixels, input })
    }

    /// Turn `[3, height, width]` uint8 pixels into a normalized float input.
    pub fn forward(&self, pixels: &Tensor) -> Result<Tensor> {
        let (channels, height, width) = pixels.size3()?;
        ensure!(
            channels == 3,
            "expect an RGB image, but get {} channels",
            channels
        );
        ensure!(
            pixels.kind() == Kind::Uint8,
            "expect uint8 pixels, but get {:?}",
            pixels.kind()
        );

        let size = HW::from_hw([height as usize, width as usize]);
        let [new_h, new_w] = self.target_size(&size).hw();
        let resized = if [new_h, new_w] == size.hw() {
            pixels.shallow_clone()
        } else {
            pixels.resize2d_exact(new_h as i64, new_w as i64)?
        };

        let input = tch::no_grad(|| {
            (resized.to_device(self.device).to_kind(Kind::Float) / 255.0)
                .f_normalize_channels(&IMAGENET_MEAN, &IMAGENET_STD)
        })?;
        Ok(input)
    }
}
