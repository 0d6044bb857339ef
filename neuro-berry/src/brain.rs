//! 脑提取适配层.
//!
//! 外部模型只需实现 [`BrainExtractor`]. 本模块负责校验其输出,
//! 只保留最大连通区域, 并提供基于脑掩膜的遮挡与裁剪.

use ndarray::{Array3, ArrayView3};
use thiserror::Error;

use crate::consts::gray::*;
use crate::data::{BinaryMask, ScanVolume, VoxelGeometry};
use crate::error::{check_shape, VolumeError, VolumeResult};
use crate::geometry::BoundingBox;
use crate::morph_3d::components;

/// 从扫描体数据得到原始脑掩膜的外部模型.
///
/// 返回的数组必须与输入形状一致, 非零体素为脑.
pub trait BrainExtractor {
    /// 模型运行失败时的错误.
    type Error;

    /// 运行模型.
    fn extract(&self, volume: ArrayView3<f32>) -> Result<Array3<u8>, Self::Error>;
}

impl<F, E> BrainExtractor for F
where
    F: Fn(ArrayView3<f32>) -> Result<Array3<u8>, E>,
{
    type Error = E;

    #[inline]
    fn extract(&self, volume: ArrayView3<f32>) -> Result<Array3<u8>, E> {
        self(volume)
    }
}

/// 脑提取失败.
#[derive(Debug, Error)]
pub enum ExtractionError<E> {
    /// 外部模型运行失败.
    #[error("brain extractor failed")]
    Extractor(#[source] E),

    /// 模型输出不合法 (形状不一致或为空掩膜).
    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// 只含一个连通区域的脑掩膜, 及其紧致包围盒.
#[derive(Clone, Debug, PartialEq)]
pub struct BrainMask {
    mask: BinaryMask,
    bbox: BoundingBox,
}

impl BrainMask {
    /// 掩膜本身. 仿射与输入扫描一致.
    #[inline]
    pub fn mask(&self) -> &BinaryMask {
        &self.mask
    }

    /// 脑的紧致包围盒.
    #[inline]
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// 直接获得掩膜的所有权.
    #[inline]
    pub fn into_mask(self) -> BinaryMask {
        self.mask
    }

    /// 将脑以外的体素置零.
    pub fn apply_to(&self, scan: &ScanVolume) -> VolumeResult<ScanVolume> {
        scan.masked(&self.mask)
    }

    /// 将脑包围盒以外的体素置零, 形状不变.
    pub fn clip(&self, scan: &ScanVolume) -> VolumeResult<ScanVolume> {
        scan.clipped_to_bbox(&self.mask)
    }

    /// 将扫描裁剪到脑包围盒.
    pub fn crop(&self, scan: &ScanVolume) -> VolumeResult<ScanVolume> {
        check_shape(self.mask.shape(), scan.shape())?;
        Ok(scan.crop(&self.bbox))
    }
}

/// 只保留掩膜中最大的 6-连通前景区域, 返回新掩膜及该区域的包围盒.
///
/// 多个区域体素个数相同时, 保留行优先序下最先出现的那个.
/// 掩膜为全背景时返回 [`VolumeError::EmptyRegion`].
pub fn largest_component(mask: ArrayView3<u8>) -> VolumeResult<(Array3<u8>, BoundingBox)> {
    let areas = components(mask);
    let n = areas.len();
    let largest = areas
        .into_iter()
        .reduce(|best, a| if a.len() > best.len() { a } else { best })
        .ok_or(VolumeError::EmptyRegion)?;
    if n > 1 {
        log::debug!("keeping the largest of {n} components ({} voxels)", largest.len());
    }

    let mut out = Array3::from_elem(mask.dim(), MASK_BACKGROUND);
    for pos in largest.iter() {
        out[*pos] = MASK_FOREGROUND;
    }
    let bbox = BoundingBox::from_positions(largest).ok_or(VolumeError::EmptyRegion)?;
    Ok((out, bbox))
}

/// 运行外部模型得到脑掩膜, 并只保留最大连通区域.
///
/// 返回的掩膜沿用 `scan` 的仿射.
pub fn extract_brain<X>(extractor: &X, scan: &ScanVolume) -> Result<BrainMask, ExtractionError<X::Error>>
where
    X: BrainExtractor + ?Sized,
{
    let raw = extractor.extract(scan.data()).map_err(ExtractionError::Extractor)?;
    check_shape(scan.shape(), raw.dim())?;
    let (mask, bbox) = largest_component(raw.view())?;
    Ok(BrainMask {
        mask: scan.with_data(mask),
        bbox,
    })
}
