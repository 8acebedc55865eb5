use crate::common::*;

/// Edge accessors of an axis-aligned box.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
}

/// Derived quantities of boxes with numeric edges.
pub trait RectNum: Rect
where
    Self::Type: Num + Copy,
{
    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    fn h(&self) -> Self::Type {
        self.b() - self.t()
    }

    fn w(&self) -> Self::Type {
        self.r() - self.l()
    }

    fn area(&self) -> Self::Type {
        self.h() * self.w()
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + Copy,
{
}
