use crate::common::*;

/// Height and width of an image or a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HW<T> {
    h: T,
    w: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        ensure!(
            h >= T::zero() && w >= T::zero(),
            "height and width must be non-negative"
        );
        Ok(Self { h, w })
    }

    /// Build from a known non-negative size, e.g. unsigned pixel counts.
    ///
    /// # Panics
    /// If either side is negative.
    pub fn from_hw(hw: [T; 2]) -> Self {
        Self::try_from_hw(hw).unwrap()
    }

    pub fn h(&self) -> T {
        self.h
    }

    pub fn w(&self) -> T {
        self.w
    }

    pub fn hw(&self) -> [T; 2] {
        [self.h, self.w]
    }

    pub fn area(&self) -> T {
        self.h * self.w
    }
}
