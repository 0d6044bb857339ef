use std::ops::{Index, IndexMut};

use ndarray::{Array3, ArrayView3, ArrayViewMut3};
use nifti::NiftiHeader;

use crate::consts::{gray::*, MM3_PER_ML};
use crate::error::{check_shape, VolumeResult};
use crate::geometry::BoundingBox;
use crate::Idx3d;

mod affine;
mod plane;

pub use affine::Affine;
pub use plane::SlicingPlane;

/// 体数据的几何属性和部分通用操作.
pub trait VoxelGeometry {
    /// 获取体素索引到世界坐标的仿射.
    fn affine(&self) -> &Affine;

    /// 获取数据形状大小 `(row, col, depth)`.
    fn shape(&self) -> Idx3d;

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (r, c, d) = self.shape();
        r * c * d
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (r0, c0, d0): &Idx3d) -> bool {
        let (r, c, d) = self.shape();
        *r0 < r && *c0 < c && *d0 < d
    }

    /// 获取单个体素分辨率, 以毫米为单位, 顺序与数组轴一致.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        self.affine().spacing()
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [r, c, d] = self.pix_dim();
        r == c && r == d
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取体素的实际体积值, 以毫升为单位.
    #[inline]
    fn voxel_ml(&self) -> f64 {
        self.voxel() / MM3_PER_ML
    }
}

/// 三维体数据, 包括体素数组和仿射.
///
/// 数组轴顺序即体素索引顺序 `(row, col, depth)`, 与 nifti 的 `(i, j, k)` 一致,
/// 不做任何轴置换.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<A> {
    data: Array3<A>,
    affine: Affine,
}

/// 扫描体数据 (MRI 信号强度或 CT HU).
pub type ScanVolume = Volume<f32>;

/// 二值掩膜体数据, 体素值为 0 或 1.
pub type BinaryMask = Volume<u8>;

impl<A> VoxelGeometry for Volume<A> {
    #[inline]
    fn affine(&self) -> &Affine {
        &self.affine
    }

    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl<A> Index<Idx3d> for Volume<A> {
    type Output = A;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl<A> IndexMut<Idx3d> for Volume<A> {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl<A> Volume<A> {
    /// 由体素数组和仿射直接创建.
    #[inline]
    pub fn new(data: Array3<A>, affine: Affine) -> Self {
        Self { data, affine }
    }

    /// 以单位仿射创建. 主要用于测试和合成数据.
    #[inline]
    pub fn with_identity(data: Array3<A>) -> Self {
        Self::new(data, Affine::identity())
    }

    /// 由 nifti header 和已解码的体素数组创建.
    ///
    /// `data` 必须按 nifti 的 `(i, j, k)` 顺序排列, 且形状与 `header.dim` 一致,
    /// 否则返回 [`crate::VolumeError::ShapeMismatch`]. 该函数不读取任何文件.
    pub fn from_header(header: &NiftiHeader, data: Array3<A>) -> VolumeResult<Self> {
        let [_, r, c, d, ..] = header.dim;
        check_shape((r as usize, c as usize, d as usize), data.dim())?;
        Ok(Self::new(data, Affine::from_header(header)))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, A> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut3<'_, A> {
        self.data.view_mut()
    }

    /// 直接获得底层数据的所有权.
    #[inline]
    pub fn into_raw(self) -> (Array3<A>, Affine) {
        (self.data, self.affine)
    }

    /// 用新的数组替换数据, 仿射保持不变.
    #[inline]
    pub fn with_data<B>(&self, data: Array3<B>) -> Volume<B> {
        Volume::new(data, self.affine)
    }
}

impl<A: Clone> Volume<A> {
    /// 按包围盒裁剪. 仿射保持不变.
    ///
    /// 如果包围盒越界, 则程序 panic.
    pub fn crop(&self, bbox: &BoundingBox) -> Self {
        self.with_data(bbox.slice_of(self.data()).to_owned())
    }
}

impl BinaryMask {
    /// 获取前景体素个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }

    /// 掩膜是否为全背景?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().copied().all(is_background)
    }

    /// 前景的实际体积, 以毫升为单位.
    #[inline]
    pub fn foreground_ml(&self) -> f64 {
        self.count_foreground() as f64 * self.voxel_ml()
    }

    /// 收集所有前景体素对应的下标. 结果按行优先存储.
    pub fn foreground_pos(&self) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, p)| is_foreground(*p).then_some(pos))
            .collect()
    }
}
