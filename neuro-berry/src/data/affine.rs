//! 体素索引到世界坐标的 4x4 仿射变换.

use nifti::NiftiHeader;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Idx3d;

/// 行优先的 4x4 仿射矩阵, 将体素索引 `(i, j, k, 1)` 映射到世界坐标 (mm).
///
/// 该对象是只读的. 所有变换都返回新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Affine([[f64; 4]; 4]);

impl Default for Affine {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    /// 单位变换, 即体素间距为 1mm, 原点位于世界坐标原点.
    #[inline]
    pub const fn identity() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 仅由三个轴向的体素间距 (mm) 构建对角仿射.
    #[inline]
    pub const fn from_spacing([x, y, z]: [f64; 3]) -> Self {
        Self([
            [x, 0.0, 0.0, 0.0],
            [0.0, y, 0.0, 0.0],
            [0.0, 0.0, z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 直接使用给定矩阵. 调用者负责保证最后一行为 `[0, 0, 0, 1]`.
    #[inline]
    pub const fn from_matrix(m: [[f64; 4]; 4]) -> Self {
        Self(m)
    }

    /// 从 nifti header 获取仿射.
    ///
    /// 优先级依次为: `sform_code > 0` 时使用 `srow_*`;
    /// `qform_code > 0` 时使用四元数与 `pixdim`; 否则退化为 `pixdim` 对角阵.
    pub fn from_header(h: &NiftiHeader) -> Self {
        let [qfac, dx, dy, dz, ..] = h.pixdim.map(f64::from);
        if h.sform_code > 0 {
            let row = |r: [f32; 4]| r.map(f64::from);
            return Self([
                row(h.srow_x),
                row(h.srow_y),
                row(h.srow_z),
                [0.0, 0.0, 0.0, 1.0],
            ]);
        }
        if h.qform_code <= 0 {
            return Self::from_spacing([dx, dy, dz]);
        }

        let (b, c, d) = (
            f64::from(h.quatern_b),
            f64::from(h.quatern_c),
            f64::from(h.quatern_d),
        );
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        // pixdim[0] 只允许取 -1 或 1, 0 按 1 处理.
        let dz = if qfac < 0.0 { -dz } else { dz };

        Self([
            [
                (a * a + b * b - c * c - d * d) * dx,
                2.0 * (b * c - a * d) * dy,
                2.0 * (b * d + a * c) * dz,
                f64::from(h.quatern_x),
            ],
            [
                2.0 * (b * c + a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                2.0 * (c * d - a * b) * dz,
                f64::from(h.quatern_y),
            ],
            [
                2.0 * (b * d - a * c) * dx,
                2.0 * (c * d + a * b) * dy,
                (a * a + d * d - b * b - c * c) * dz,
                f64::from(h.quatern_z),
            ],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 获取底层矩阵.
    #[inline]
    pub const fn matrix(&self) -> &[[f64; 4]; 4] {
        &self.0
    }

    /// 三个体素轴的间距 (mm), 即线性部分每一列的模长.
    pub fn spacing(&self) -> [f64; 3] {
        let m = &self.0;
        [0, 1, 2].map(|col| (0..3).map(|r| m[r][col].powi(2)).sum::<f64>().sqrt())
    }

    /// 将 (可为小数的) 体素坐标变换到世界坐标.
    pub fn apply(&self, voxel: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        [0, 1, 2].map(|r| m[r][0] * voxel[0] + m[r][1] * voxel[1] + m[r][2] * voxel[2] + m[r][3])
    }

    /// 体数据形状从 `old` 重采样到 `new` 后对应的仿射.
    ///
    /// 新体素 `i` 的中心对应旧坐标 `(i + 0.5) * old / new - 0.5`,
    /// 因此各轴按比例缩放, 且原点移动半个缩放量.
    pub fn rescaled(&self, (o0, o1, o2): Idx3d, (n0, n1, n2): Idx3d) -> Self {
        let scale = [o0 as f64 / n0 as f64, o1 as f64 / n1 as f64, o2 as f64 / n2 as f64];
        let origin = self.apply(scale.map(|s| (s - 1.0) / 2.0));
        let mut m = self.0;
        for row in m.iter_mut().take(3) {
            for (col, s) in scale.iter().enumerate() {
                row[col] *= s;
            }
        }
        for (r, o) in origin.into_iter().enumerate() {
            m[r][3] = o;
        }
        Self(m)
    }

    /// 将原点移动到旧体素坐标 `offset` 处. 线性部分不变.
    pub fn shifted(&self, offset: [f64; 3]) -> Self {
        let origin = self.apply(offset);
        let mut m = self.0;
        for (r, o) in origin.into_iter().enumerate() {
            m[r][3] = o;
        }
        Self(m)
    }
}
