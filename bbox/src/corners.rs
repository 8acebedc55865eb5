use super::{HW, TLBR};
use crate::common::*;

/// Box corners `(x1, y1, x2, y2)` as emitted by a detector.
///
/// Unlike [TLBR], the corners are not required to be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Corners<T> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T> Corners<T>
where
    T: Copy,
{
    pub fn from_xyxy(xyxy: [T; 4]) -> Self {
        let [x1, y1, x2, y2] = xyxy;
        Self { x1, y1, x2, y2 }
    }

    pub fn xyxy(&self) -> [T; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl<T> Corners<T>
where
    T: Float,
{
    /// Build corners from a center-size box `(cx, cy, w, h)`.
    pub fn from_cxcywh(cxcywh: [T; 4]) -> Self {
        let [cx, cy, w, h] = cxcywh;
        let two = T::one() + T::one();
        Self {
            x1: cx - w / two,
            y1: cy - h / two,
            x2: cx + w / two,
            y2: cy + h / two,
        }
    }

    /// Scale normalized corners by the image size and truncate toward zero.
    ///
    /// The product is computed in `f64` regardless of `T`, so `f32` corners
    /// truncate the same way as their widened values.
    ///
    /// Returns `None` if any scaled coordinate is not representable as `i64`.
    pub fn project<S>(&self, size: &HW<S>) -> Option<Corners<i64>>
    where
        S: Num + PartialOrd + Copy + ToPrimitive,
    {
        let h = size.h().to_f64()?;
        let w = size.w().to_f64()?;
        let scale = |value: T, len: f64| (value.to_f64()? * len).to_i64();

        Some(Corners {
            x1: scale(self.x1, w)?,
            y1: scale(self.y1, h)?,
            x2: scale(self.x2, w)?,
            y2: scale(self.y2, h)?,
        })
    }
}

impl<T> Corners<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Order the corners into a TLBR box.
    pub fn to_tlbr(&self) -> TLBR<T> {
        let (t, b) = min_max(self.y1, self.y2);
        let (l, r) = min_max(self.x1, self.x2);
        TLBR { t, l, b, r }
    }
}

fn min_max<T: PartialOrd>(lhs: T, rhs: T) -> (T, T) {
    if rhs < lhs {
        (rhs, lhs)
    } else {
        (lhs, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;
    use approx::assert_abs_diff_eq;

    #[test]
    fn project_truncates() {
        let size = HW::from_hw([50usize, 100]);

        let corners = Corners::from_xyxy([0.1f32, 0.2, 0.5, 0.8]);
        assert_eq!(corners.project(&size).unwrap().xyxy(), [10, 10, 50, 40]);

        let corners = Corners::from_xyxy([0.1f64, 0.2, 0.5, 0.8]);
        assert_eq!(corners.project(&size).unwrap().xyxy(), [10, 10, 50, 40]);

        // 0.7f32 is slightly below 0.7, and the f32 product would round up to 70
        let corners = Corners::from_xyxy([0.7f32; 4]);
        assert_eq!(corners.project(&size).unwrap().xyxy(), [69, 34, 69, 34]);

        // 0.999 * 100 = 99.9 truncates down instead of rounding up
        let corners = Corners::from_xyxy([0.999f64, 0.999, 0.0, 0.0]);
        assert_eq!(corners.project(&size).unwrap().xyxy(), [99, 49, 0, 0]);
    }

    #[test]
    fn project_non_finite() {
        let size = HW::from_hw([50usize, 100]);
        let corners = Corners::from_xyxy([f32::NAN, 0.2, 0.5, 0.8]);
        assert!(corners.project(&size).is_none());
    }

    #[test]
    fn cxcywh_to_corners() {
        let corners = Corners::from_cxcywh([0.5f64, 0.5, 0.2, 0.4]);
        let [x1, y1, x2, y2] = corners.xyxy();
        assert_abs_diff_eq!(x1, 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(y1, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(x2, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(y2, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn inverted_corners_to_tlbr() {
        let corners = Corners::from_xyxy([50i64, 40, 10, 10]);
        assert_eq!(corners.to_tlbr().tlbr(), [10, 10, 40, 50]);
    }
}
