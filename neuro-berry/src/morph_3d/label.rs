use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3};

use super::diamond_neighbours;
use crate::consts::gray::*;
use crate::{Area3d, Areas3d};

/// 按照 6-相邻规则获取所有前景连通区域.
///
/// 两个体素 `p1` 和 `p2` 属于同一个区域, 当且仅当存在一条从 `p1` 到 `p2`
/// 的 6-相邻路径, 且路径上的所有体素都是前景 (非零).
///
/// 区域按行优先序下首个体素出现的先后排列; 区域内部按 BFS 序排列.
pub fn components(mask: ArrayView3<u8>) -> Areas3d {
    let shape = mask.dim();
    let mut visited = Array3::from_elem(shape, false);
    let mut ans = Areas3d::with_capacity(1);
    let mut bfs_q = VecDeque::with_capacity(64);

    for (pos, &p) in mask.indexed_iter() {
        if is_background(p) || visited[pos] {
            continue;
        }
        visited[pos] = true;
        bfs_q.push_back(pos);

        let mut this_area = Area3d::with_capacity(16);
        while let Some(cur) = bfs_q.pop_front() {
            this_area.push(cur);
            for neigh in diamond_neighbours(shape, cur) {
                if !visited[neigh] && is_foreground(mask[neigh]) {
                    visited[neigh] = true;
                    bfs_q.push_back(neigh);
                }
            }
        }
        ans.push(this_area);
    }
    ans
}

/// 连通区域标记.
///
/// 返回标记数组和区域个数. 背景标记为 0, 第 `i` 个区域 (见 [`components`]
/// 的顺序) 标记为 `i + 1`.
pub fn label_components(mask: ArrayView3<u8>) -> (Array3<u32>, usize) {
    let mut labels = Array3::<u32>::zeros(mask.dim());
    let areas = components(mask);
    for (label, area) in (1u32..).zip(areas.iter()) {
        for pos in area.iter() {
            labels[*pos] = label;
        }
    }
    (labels, areas.len())
}
