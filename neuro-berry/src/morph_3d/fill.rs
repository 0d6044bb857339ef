use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3};

use super::{diamond_neighbours, is_at_border};
use crate::consts::gray::*;
use crate::Idx3d;

/// 三维二值填洞.
///
/// 从长方体六个表面上的背景体素出发, 以 6-邻接规则遍历所有可达背景.
/// 不可达的背景 (即被前景完全包围的空洞) 被填充为前景.
/// 返回值只包含 `MASK_BACKGROUND` 和 `MASK_FOREGROUND`.
pub fn fill_holes(mask: ArrayView3<u8>) -> Array3<u8> {
    let shape = mask.dim();
    let mut outside = Array3::from_elem(shape, false);

    let mut q: VecDeque<Idx3d> = mask
        .indexed_iter()
        .filter_map(|(pos, &p)| (is_background(p) && is_at_border(shape, pos)).then_some(pos))
        .collect();
    for pos in q.iter() {
        outside[*pos] = true;
    }

    while let Some(cur) = q.pop_front() {
        for neigh in diamond_neighbours(shape, cur) {
            if !outside[neigh] && is_background(mask[neigh]) {
                outside[neigh] = true;
                q.push_back(neigh);
            }
        }
    }

    outside.mapv(|o| if o { MASK_BACKGROUND } else { MASK_FOREGROUND })
}
