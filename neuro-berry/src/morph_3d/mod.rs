//! 3D 形态学操作.
//!
//! 所有连通性均按 6-邻接 (钻石型, 即半径为 1 的球) 定义,
//! 与膨胀使用的结构元保持一致.

use crate::Idx3d;

mod dilate;
mod fill;
mod label;

pub(crate) use dilate::Frontier;
pub use dilate::{ball_offsets, binary_dilation, dilate_ball1};
pub use fill::fill_holes;
pub use label::{components, label_components};

/// 索引是否位于形状为 `shape` 的数组内部.
#[inline]
pub(crate) const fn in_bounds((r, c, d): Idx3d, (r0, c0, d0): &Idx3d) -> bool {
    *r0 < r && *c0 < c && *d0 < d
}

/// 判断一个索引是否位于长方体的六个表面之一.
#[inline]
pub(crate) const fn is_at_border((r, c, d): Idx3d, (r0, c0, d0): Idx3d) -> bool {
    r0 == 0
        || r0.saturating_add(1) == r
        || c0 == 0
        || c0.saturating_add(1) == c
        || d0 == 0
        || d0.saturating_add(1) == d
}

/// 获取 `pos` 前后上下左右六个点的坐标.
///
/// 在数据范围外的坐标会被过滤掉, 不会出现在迭代器中.
#[inline]
pub(crate) fn diamond_neighbours(shape: Idx3d, (r, c, d): Idx3d) -> impl Iterator<Item = Idx3d> {
    [
        (r.wrapping_sub(1), c, d),
        (r.saturating_add(1), c, d),
        (r, c.wrapping_sub(1), d),
        (r, c.saturating_add(1), d),
        (r, c, d.wrapping_sub(1)),
        (r, c, d.saturating_add(1)),
    ]
    .into_iter()
    .filter(move |p| in_bounds(shape, p))
}
