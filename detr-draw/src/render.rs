//! Box drawing and output file naming.

use crate::common::*;

/// The outline color in RGB.
pub const BOX_COLOR: [u8; 3] = [0, 255, 0];
/// The outline width in pixels.
pub const BOX_STROKE: usize = 2;

/// Writes images with drawn boxes as `1.png`, `2.png`, ... into a directory.
#[derive(Debug)]
pub struct Renderer {
    save_dir: PathBuf,
    counter: usize,
    color: Tensor,
}

impl Renderer {
    pub fn new(save_dir: impl AsRef<Path>) -> Self {
        Self {
            save_dir: save_dir.as_ref().to_owned(),
            counter: 1,
            color: Tensor::of_slice(&BOX_COLOR),
        }
    }

    /// The number of images written so far.
    pub fn num_rendered(&self) -> usize {
        self.counter - 1
    }

    /// Draw the boxes on a copy of the `[3, height, width]` uint8 image and
    /// save it under the next file name.
    pub fn render(&mut self, image: &Tensor, boxes: &[Corners<i64>]) -> Result<PathBuf> {
        ensure!(
            image.kind() == Kind::Uint8,
            "expect uint8 pixels, but get {:?}",
            image.kind()
        );
        let mut canvas = image.to_device(Device::Cpu).copy();

        for bbox in boxes {
            let _ = canvas.f_draw_tlbr_(&bbox.to_tlbr(), BOX_STROKE, &self.color)?;
        }

        let path = self.save_dir.join(format!("{}.png", self.counter));
        vision::image::save(&canvas, &path)
            .with_context(|| format!("failed to save image {}", path.display()))?;
        self.counter += 1;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_numbered_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut renderer = Renderer::new(dir.path());
        let image = Tensor::zeros(&[3, 40, 60], (Kind::Uint8, Device::Cpu));

        // inverted corners still render
        let boxes = [
            Corners::from_xyxy([10, 5, 30, 25]),
            Corners::from_xyxy([50, 35, 40, 20]),
        ];
        let first = renderer.render(&image, &boxes)?;
        let second = renderer.render(&image, &[])?;

        assert_eq!(first, dir.path().join("1.png"));
        assert_eq!(second, dir.path().join("2.png"));
        assert_eq!(renderer.num_rendered(), 2);

        let drawn = vision::image::load(&first)?;
        assert_eq!(drawn.size(), vec![3, 40, 60]);
        assert_eq!(drawn.int64_value(&[1, 5, 20]), 255);
        assert_eq!(drawn.int64_value(&[0, 5, 20]), 0);
        assert_eq!(drawn.int64_value(&[1, 20, 40]), 255);
        assert_eq!(drawn.int64_value(&[1, 15, 20]), 0);

        // the source is left untouched
        assert_eq!(image.sum(Kind::Int64).int64_value(&[]), 0);

        let blank = vision::image::load(&second)?;
        assert_eq!(blank.sum(Kind::Int64).int64_value(&[]), 0);
        Ok(())
    }

    #[test]
    fn render_rejects_float_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = Renderer::new(dir.path());
        let image = Tensor::zeros(&[3, 4, 4], (Kind::Float, Device::Cpu));
        assert!(renderer.render(&image, &[]).is_err());
        assert_eq!(renderer.num_rendered(), 0);
    }
}
