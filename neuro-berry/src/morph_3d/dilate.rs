use std::collections::HashSet;

use itertools::iproduct;
use ndarray::{s, Array3, ArrayView3, Zip};

use super::diamond_neighbours;
use crate::consts::gray::*;
use crate::Idx3d;

/// 半径为 `radius` 的离散球结构元, 以相对中心的偏移表示 (包含中心).
///
/// 偏移 `(a, b, c)` 被包含当且仅当 `a^2 + b^2 + c^2 <= radius^2`.
/// 半径为 1 时即中心加 6 个面邻居.
pub fn ball_offsets(radius: usize) -> Vec<[isize; 3]> {
    let r = radius as isize;
    iproduct!(-r..=r, -r..=r, -r..=r)
        .filter(|(a, b, c)| a * a + b * b + c * c <= r * r)
        .map(|(a, b, c)| [a, b, c])
        .collect()
}

/// 计算偏移 `offset` 下源区间起点, 目标区间起点和长度.
#[inline]
fn shift_range(offset: isize, size: usize) -> (usize, usize, usize) {
    let k = offset.unsigned_abs();
    if k >= size {
        (0, 0, 0)
    } else if offset >= 0 {
        (0, k, size - k)
    } else {
        (k, 0, size - k)
    }
}

/// 以半径为 `radius` 的球为结构元, 对整个掩膜进行一次二值膨胀.
///
/// 对结构元的每个偏移, 将整个掩膜平移后按位或到结果中.
/// 数据范围外视为背景. 返回值只包含 0 和 1.
pub fn binary_dilation(mask: ArrayView3<u8>, radius: usize) -> Array3<u8> {
    let (r, c, d) = mask.dim();
    let src = mask.mapv(|p| u8::from(is_foreground(p)));
    let mut out = Array3::<u8>::zeros((r, c, d));

    for [dr, dc, dd] in ball_offsets(radius) {
        let (src_r, dst_r, lr) = shift_range(dr, r);
        let (src_c, dst_c, lc) = shift_range(dc, c);
        let (src_d, dst_d, ld) = shift_range(dd, d);
        if lr == 0 || lc == 0 || ld == 0 {
            continue;
        }
        Zip::from(out.slice_mut(s![dst_r..dst_r + lr, dst_c..dst_c + lc, dst_d..dst_d + ld]))
            .and(src.slice(s![src_r..src_r + lr, src_c..src_c + lc, src_d..src_d + ld]))
            .for_each(|o, &p| *o |= p);
    }
    out
}

/// 以半径为 1 的球为结构元膨胀一次.
#[inline]
pub fn dilate_ball1(mask: ArrayView3<u8>) -> Array3<u8> {
    binary_dilation(mask, 1)
}

/// 单个前景连通区域的逐层膨胀状态.
///
/// 一次半径为 1 的球膨胀只会在上一层新增体素 (前沿) 的 6-邻域产生新体素,
/// 因此只需维护区域体素集合和前沿, 而不必每次扫描整个体数据.
pub(crate) struct Frontier {
    shape: Idx3d,
    inside: HashSet<Idx3d>,
    frontier: Vec<Idx3d>,
}

impl Frontier {
    /// 以区域内全部体素初始化. 初始前沿即区域本身.
    pub fn new(shape: Idx3d, voxels: Vec<Idx3d>) -> Self {
        let inside = voxels.iter().copied().collect();
        Self {
            shape,
            inside,
            frontier: voxels,
        }
    }

    /// 当前区域体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.inside.len()
    }

    /// 计算下一次膨胀会新增的体素 (不修改自身). 结果无重复.
    pub fn propose(&self) -> Vec<Idx3d> {
        let mut seen = HashSet::with_capacity(self.frontier.len());
        let mut layer = Vec::with_capacity(self.frontier.len());
        for pos in self.frontier.iter() {
            for neigh in diamond_neighbours(self.shape, *pos) {
                if !self.inside.contains(&neigh) && seen.insert(neigh) {
                    layer.push(neigh);
                }
            }
        }
        layer
    }

    /// 接受由 [`Self::propose`] 得到的新一层.
    pub fn commit(&mut self, layer: Vec<Idx3d>) {
        self.inside.extend(layer.iter().copied());
        self.frontier = layer;
    }

    /// 获取区域内所有体素. 无顺序保证.
    #[inline]
    pub fn voxels(&self) -> impl Iterator<Item = &Idx3d> + '_ {
        self.inside.iter()
    }
}
