use super::{Rect, HW};
use crate::common::*;

/// A box with ordered edges, `t <= b` and `l <= r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + PartialOrd,
{
    pub fn try_from_tlbr(tlbr: [T; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(t <= b, "the top edge is below the bottom edge");
        ensure!(l <= r, "the left edge is right to the right edge");
        Ok(Self { t, l, b, r })
    }

    /// Restrict the edges to `[0, h] x [0, w]`.
    pub fn clamp_to(&self, size: &HW<T>) -> Self
    where
        T: Num,
    {
        let clamp = |value: T, max: T| {
            if value < T::zero() {
                T::zero()
            } else if value > max {
                max
            } else {
                value
            }
        };

        Self {
            t: clamp(self.t, size.h()),
            l: clamp(self.l, size.w()),
            b: clamp(self.b, size.h()),
            r: clamp(self.r, size.w()),
        }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy,
{
    type Type = T;

    fn t(&self) -> T {
        self.t
    }

    fn l(&self) -> T {
        self.l
    }

    fn b(&self) -> T {
        self.b
    }

    fn r(&self) -> T {
        self.r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;

    #[test]
    fn tlbr_rejects_inverted_edges() {
        assert!(TLBR::try_from_tlbr([5, 0, 1, 3]).is_err());
        assert!(TLBR::try_from_tlbr([0, 5, 1, 3]).is_err());
        assert!(TLBR::try_from_tlbr([1, 1, 1, 1]).is_ok());
    }

    #[test]
    fn tlbr_clamp() -> Result<()> {
        let rect = TLBR::try_from_tlbr([-4i64, 3, 70, 120])?;
        assert_eq!(rect.h(), 74);
        assert_eq!(rect.area(), 74 * 117);

        let clamped = rect.clamp_to(&HW::try_from_hw([49, 99])?);
        assert_eq!(clamped.tlbr(), [0, 3, 49, 99]);
        Ok(())
    }
}
