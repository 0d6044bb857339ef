//! 合成病灶.

use ndarray::Array3;
use neuro_berry::consts::gray::MASK_FOREGROUND;
use neuro_berry::{Affine, BinaryMask, Idx3d};

/// 病灶半径 (体素).
pub const RADII: [usize; 5] = [1, 2, 4, 6, 8];

/// 相邻病灶中心之间的距离 (体素).
const SPACING: usize = 32;

/// 体素分辨率 (毫米).
const PIX_DIM: [f64; 3] = [1.0, 1.0, 1.0];

/// 以 `center` 为球心, `radius` 为半径, 在 `mask` 中画一个实心球.
fn draw_sphere(mask: &mut BinaryMask, center: Idx3d, radius: usize) {
    let r2 = (radius * radius) as isize;
    let (r0, c0, d0) = (center.0 as isize, center.1 as isize, center.2 as isize);
    for ((r, c, d), p) in mask.data_mut().indexed_iter_mut() {
        let (dr, dc, dd) = (r as isize - r0, c as isize - c0, d as isize - d0);
        if dr * dr + dc * dc + dd * dd <= r2 {
            *p = MASK_FOREGROUND;
        }
    }
}

/// 沿第 2 轴等间距排列的一组球形病灶. 病灶按半径从小到大排列,
/// 因此连通区域标号 `i + 1` 对应 `RADII[i]`.
pub fn lesions() -> BinaryMask {
    let side = SPACING + SPACING / 4;
    let shape = (side, side, SPACING * RADII.len());
    let mut mask = BinaryMask::new(Array3::zeros(shape), Affine::from_spacing(PIX_DIM));
    for (i, radius) in RADII.into_iter().enumerate() {
        draw_sphere(&mut mask, (side / 2, side / 2, SPACING * i + SPACING / 2), radius);
    }
    mask
}
