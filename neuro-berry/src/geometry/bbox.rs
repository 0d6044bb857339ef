use std::fmt;

use ndarray::{s, ArrayView3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Idx3d;

/// 体素索引空间中的轴对齐包围盒, 左闭右开.
///
/// 对任意轴 `i`, 总有 `min_i < max_i`, 即包围盒至少包含一个体素.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    min: Idx3d,
    max: Idx3d,
}

impl BoundingBox {
    /// 由左上前角 `min` (包含) 和右下后角 `max` (不包含) 构建.
    ///
    /// 任意一个轴上 `min >= max` 时返回 `None`.
    pub fn new(min: Idx3d, max: Idx3d) -> Option<Self> {
        (min.0 < max.0 && min.1 < max.1 && min.2 < max.2).then_some(Self { min, max })
    }

    /// 由 `(min_row, min_col, min_depth, max_row, max_col, max_depth)` 构建.
    #[inline]
    pub fn from_array([r0, c0, d0, r1, c1, d1]: [usize; 6]) -> Option<Self> {
        Self::new((r0, c0, d0), (r1, c1, d1))
    }

    /// 包含所有给定位置的最小包围盒. 没有任何位置时返回 `None`.
    pub fn from_positions<I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = Idx3d>,
    {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), (r, c, d)| {
            (
                (lo.0.min(r), lo.1.min(c), lo.2.min(d)),
                (hi.0.max(r), hi.1.max(c), hi.2.max(d)),
            )
        });
        Some(Self {
            min,
            max: (max.0 + 1, max.1 + 1, max.2 + 1),
        })
    }

    /// 起始角 (包含).
    #[inline]
    pub fn min(&self) -> Idx3d {
        self.min
    }

    /// 终止角 (不包含).
    #[inline]
    pub fn max(&self) -> Idx3d {
        self.max
    }

    /// 三个轴上的长度.
    #[inline]
    pub fn extent(&self) -> Idx3d {
        (
            self.max.0 - self.min.0,
            self.max.1 - self.min.1,
            self.max.2 - self.min.2,
        )
    }

    /// 包围盒内的体素个数.
    #[inline]
    pub fn voxel_count(&self) -> usize {
        let (r, c, d) = self.extent();
        r * c * d
    }

    /// 索引是否位于包围盒内?
    #[inline]
    pub fn contains(&self, (r, c, d): Idx3d) -> bool {
        (self.min.0..self.max.0).contains(&r)
            && (self.min.1..self.max.1).contains(&c)
            && (self.min.2..self.max.2).contains(&d)
    }

    /// `(min_row, min_col, min_depth, max_row, max_col, max_depth)`.
    #[inline]
    pub fn as_array(&self) -> [usize; 6] {
        [
            self.min.0, self.min.1, self.min.2, self.max.0, self.max.1, self.max.2,
        ]
    }

    /// 包围盒能否完整放入形状为 `shape` 的数组?
    #[inline]
    pub fn fits(&self, (r, c, d): Idx3d) -> bool {
        self.max.0 <= r && self.max.1 <= c && self.max.2 <= d
    }

    /// 获取 `data` 在包围盒内的部分.
    ///
    /// # 注意
    ///
    /// 如果包围盒越界, 则程序 panic.
    pub fn slice_of<'a, A>(&self, data: ArrayView3<'a, A>) -> ArrayView3<'a, A> {
        assert!(self.fits(data.dim()), "bounding box {self} out of {:?}", data.dim());
        data.slice_move(s![
            self.min.0..self.max.0,
            self.min.1..self.max.1,
            self.min.2..self.max.2
        ])
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r0, c0, d0, r1, c1, d1] = self.as_array();
        write!(f, "[{r0}..{r1}, {c0}..{c1}, {d0}..{d1}]")
    }
}

#[cfg(test)]
mod tests {
    use super::BoundingBox;
    use ndarray::Array3;

    #[test]
    fn test_invalid_box() {
        assert!(BoundingBox::new((0, 0, 0), (1, 1, 1)).is_some());
        assert!(BoundingBox::new((0, 0, 1), (1, 1, 1)).is_none());
        assert!(BoundingBox::from_array([2, 0, 0, 1, 1, 1]).is_none());
        assert!(BoundingBox::from_positions(Vec::new()).is_none());
    }

    #[test]
    fn test_from_positions() {
        let b = BoundingBox::from_positions([(3, 1, 4), (1, 5, 9), (2, 6, 5)]).unwrap();
        assert_eq!(b.as_array(), [1, 1, 4, 4, 7, 10]);
        assert_eq!(b.extent(), (3, 6, 6));
        assert_eq!(b.voxel_count(), 108);
        assert!(b.contains((3, 6, 9)));
        assert!(!b.contains((4, 6, 9)));
        assert_eq!(b.to_string(), "[1..4, 1..7, 4..10]");
    }

    #[test]
    fn test_slice_of() {
        let a = Array3::from_shape_fn((3, 4, 5), |(r, c, d)| r * 100 + c * 10 + d);
        let b = BoundingBox::new((1, 1, 2), (3, 2, 5)).unwrap();
        let v = b.slice_of(a.view());
        assert_eq!(v.dim(), (2, 1, 3));
        assert_eq!(v[(0, 0, 0)], 112);
        assert_eq!(v[(1, 0, 2)], 214);
    }

    #[test]
    #[should_panic]
    fn test_slice_out_of_range() {
        let a = Array3::<u8>::zeros((2, 2, 2));
        let b = BoundingBox::new((0, 0, 0), (3, 1, 1)).unwrap();
        let _ = b.slice_of(a.view());
    }
}
