use crate::common::*;

pub trait TensorExt {
    /// Paint the region of `rect` with `color`, clipped to the image.
    ///
    /// The tensor is an image in `[C, H, W]` or `[B, C, H, W]` shape and
    /// `color` has `C` elements.
    fn f_fill_tlbr_(&mut self, rect: &TLBR<i64>, color: &Tensor) -> Result<Tensor>;

    /// Draw a `stroke`-pixel outline centered on the edges of `rect`.
    fn f_draw_tlbr_(&mut self, rect: &TLBR<i64>, stroke: usize, color: &Tensor) -> Result<Tensor>;

    /// Resize a `[C, H, W]` image to exactly the given size.
    fn resize2d_exact(&self, new_height: i64, new_width: i64) -> Result<Tensor>;

    /// Subtract the per-channel mean and divide by the per-channel std.
    fn f_normalize_channels(&self, mean: &[f64], std: &[f64]) -> Result<Tensor>;
}

impl TensorExt for Tensor {
    fn f_fill_tlbr_(&mut self, rect: &TLBR<i64>, color: &Tensor) -> Result<Tensor> {
        let (n_channels, size) = image_shape(self)?;
        ensure!(
            color.size1()? == n_channels,
            "expect a color with {} channels, but get shape {:?}",
            n_channels,
            color.size()
        );

        let [t, l, b, r] = rect.clamp_to(&size).tlbr();
        if t == b || l == r {
            return Ok(self.shallow_clone());
        }

        tch::no_grad(|| -> Result<_> {
            let mut region = self.f_narrow(-2, t, b - t)?.f_narrow(-1, l, r - l)?;
            let color = color
                .to_kind(self.kind())
                .to_device(self.device())
                .f_view([n_channels, 1, 1])?;
            region.f_copy_(&color.f_expand_as(&region)?)?;
            Ok(())
        })?;

        Ok(self.shallow_clone())
    }

    fn f_draw_tlbr_(&mut self, rect: &TLBR<i64>, stroke: usize, color: &Tensor) -> Result<Tensor> {
        let half = (stroke / 2) as i64;
        let stroke = stroke as i64;
        let [t, l, b, r] = rect.tlbr();

        let (outer_t, outer_l, outer_b, outer_r) = (t - half, l - half, b + half, r + half);
        // a box thinner than two strokes is filled
        let inner_t = (outer_t + stroke).min(outer_b);
        let inner_b = (outer_b - stroke).max(inner_t);
        let inner_l = (outer_l + stroke).min(outer_r);
        let inner_r = (outer_r - stroke).max(inner_l);

        let edges = [
            [outer_t, outer_l, inner_t, outer_r],
            [inner_b, outer_l, outer_b, outer_r],
            [outer_t, outer_l, outer_b, inner_l],
            [outer_t, inner_r, outer_b, outer_r],
        ];
        for edge in edges {
            let _ = self.f_fill_tlbr_(&TLBR::try_from_tlbr(edge)?, color)?;
        }

        Ok(self.shallow_clone())
    }

    fn resize2d_exact(&self, new_height: i64, new_width: i64) -> Result<Tensor> {
        ensure!(
            self.dim() == 3,
            "expect a [C, H, W] image, but get shape {:?}",
            self.size()
        );

        tch::no_grad(|| -> Result<_> {
            match self.kind() {
                Kind::Uint8 => Ok(vision::image::resize(self, new_width, new_height)?),
                Kind::Float => {
                    let pixels = (self * 255.0).to_kind(Kind::Uint8);
                    let resized = vision::image::resize(&pixels, new_width, new_height)?;
                    Ok(resized.to_kind(Kind::Float) / 255.0)
                }
                kind => bail!("unsupported data kind {:?}", kind),
            }
        })
    }

    fn f_normalize_channels(&self, mean: &[f64], std: &[f64]) -> Result<Tensor> {
        let n_channels = match self.size().as_slice() {
            &[c, _h, _w] => c,
            shape => bail!("expect a [C, H, W] image, but get shape {:?}", shape),
        };
        ensure!(
            mean.len() as i64 == n_channels && std.len() as i64 == n_channels,
            "expect {} mean and std values, but get {} and {}",
            n_channels,
            mean.len(),
            std.len()
        );

        let to_channels = |values: &[f64]| -> Result<Tensor> {
            let tensor = Tensor::of_slice(values)
                .to_kind(self.kind())
                .to_device(self.device())
                .f_view([n_channels, 1, 1])?;
            Ok(tensor)
        };
        let mean = to_channels(mean)?;
        let std = to_channels(std)?;

        let normalized = tch::no_grad(|| self.f_sub(&mean)?.f_div(&std))?;
        Ok(normalized)
    }
}

/// The channel count and spatial size of an image tensor.
fn image_shape(tensor: &Tensor) -> Result<(i64, HW<i64>)> {
    match tensor.size().as_slice() {
        &[_, c, h, w] | &[c, h, w] => Ok((c, HW::try_from_hw([h, w])?)),
        shape => bail!(
            "expect an image in [C, H, W] or [B, C, H, W] shape, but get {:?}",
            shape
        ),
    }
}
