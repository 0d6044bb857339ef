//! 包围盒计算, 以及基于掩膜的裁剪与遮挡.

use ndarray::{s, Array3, ArrayView3, Zip};
use num::{ToPrimitive, Zero};

use crate::consts::{gray::*, TIGHT_BBOX_THRESHOLD};
use crate::data::{BinaryMask, Volume, VoxelGeometry};
use crate::error::{check_shape, VolumeError, VolumeResult};
use crate::morph_3d::{components, fill_holes};

mod bbox;

pub use bbox::BoundingBox;

/// 掩膜中所有非零体素的紧致包围盒. 全背景时返回 `None`.
pub fn bbox_of(mask: ArrayView3<u8>) -> Option<BoundingBox> {
    BoundingBox::from_positions(
        mask.indexed_iter()
            .filter_map(|(pos, p)| is_foreground(*p).then_some(pos)),
    )
}

/// 计算体数据前景的紧致包围盒, 并按此包围盒裁剪**原始**体数据.
///
/// 体素值 `>= 0.2` 被视为前景, 随后进行三维填洞.
/// 填洞后的所有前景被视为同一个区域, 即包围盒包含全部前景体素.
///
/// 阈值化后不存在前景时返回 [`VolumeError::EmptyRegion`].
/// 无法转换为 `f64` 的体素值被视为背景.
pub fn tight_bbox<A>(volume: ArrayView3<A>) -> VolumeResult<(Array3<A>, BoundingBox)>
where
    A: Copy + ToPrimitive,
{
    let binary = volume.mapv(|v| match v.to_f64() {
        Some(x) if x >= TIGHT_BBOX_THRESHOLD => MASK_FOREGROUND,
        _ => MASK_BACKGROUND,
    });
    let filled = fill_holes(binary.view());
    let bbox = bbox_of(filled.view()).ok_or(VolumeError::EmptyRegion)?;
    if log::log_enabled!(log::Level::Debug) {
        let n = components(filled.view()).len();
        if n > 1 {
            log::debug!("tight bbox {bbox} covers {n} disjoint foreground regions");
        }
    }
    Ok((bbox.slice_of(volume).to_owned(), bbox))
}

/// 将 `volume` 裁剪到 `mask` 前景的紧致包围盒.
///
/// 形状不一致时返回 [`VolumeError::ShapeMismatch`],
/// 掩膜为全背景时返回 [`VolumeError::EmptyRegion`].
pub fn crop_to_mask<A: Clone>(
    volume: ArrayView3<A>,
    mask: ArrayView3<u8>,
) -> VolumeResult<(Array3<A>, BoundingBox)> {
    check_shape(volume.dim(), mask.dim())?;
    let bbox = bbox_of(mask).ok_or(VolumeError::EmptyRegion)?;
    Ok((bbox.slice_of(volume).to_owned(), bbox))
}

/// 将掩膜背景处的体素置零, 其余体素保持不变.
pub fn mask_volume<A: Clone + Zero>(
    volume: ArrayView3<A>,
    mask: ArrayView3<u8>,
) -> VolumeResult<Array3<A>> {
    check_shape(volume.dim(), mask.dim())?;
    Ok(Zip::from(&volume)
        .and(&mask)
        .map_collect(|v, m| if is_foreground(*m) { v.clone() } else { A::zero() }))
}

/// 将掩膜前景包围盒以外的体素置零, 形状保持不变.
///
/// 掩膜为全背景时返回 [`VolumeError::EmptyRegion`].
pub fn clip_to_mask_bbox<A: Clone + Zero>(
    volume: ArrayView3<A>,
    mask: ArrayView3<u8>,
) -> VolumeResult<Array3<A>> {
    check_shape(volume.dim(), mask.dim())?;
    let bbox = bbox_of(mask).ok_or(VolumeError::EmptyRegion)?;
    let mut out = Array3::from_elem(volume.dim(), A::zero());
    let (r0, c0, d0) = bbox.min();
    let (r1, c1, d1) = bbox.max();
    out.slice_mut(s![r0..r1, c0..c1, d0..d1])
        .assign(&bbox.slice_of(volume));
    Ok(out)
}

impl<A: Copy + ToPrimitive> Volume<A> {
    /// 见 [`tight_bbox`]. 裁剪结果沿用原仿射.
    pub fn tight_crop(&self) -> VolumeResult<(Self, BoundingBox)> {
        let (data, bbox) = tight_bbox(self.data())?;
        Ok((self.with_data(data), bbox))
    }
}

impl<A: Clone + Zero> Volume<A> {
    /// 见 [`crop_to_mask`]. 仿射保持不变.
    pub fn cropped_to(&self, mask: &BinaryMask) -> VolumeResult<(Self, BoundingBox)> {
        let (data, bbox) = crop_to_mask(self.data(), mask.data())?;
        Ok((self.with_data(data), bbox))
    }

    /// 见 [`mask_volume`]. 仿射保持不变.
    pub fn masked(&self, mask: &BinaryMask) -> VolumeResult<Self> {
        Ok(self.with_data(mask_volume(self.data(), mask.data())?))
    }

    /// 见 [`clip_to_mask_bbox`]. 仿射保持不变.
    pub fn clipped_to_bbox(&self, mask: &BinaryMask) -> VolumeResult<Self> {
        Ok(self.with_data(clip_to_mask_bbox(self.data(), mask.data())?))
    }
}

impl BinaryMask {
    /// 前景的紧致包围盒. 全背景时返回 `None`.
    #[inline]
    pub fn bbox(&self) -> Option<BoundingBox> {
        bbox_of(self.data())
    }

    /// 该掩膜是否与 `other` 形状一致?
    #[inline]
    pub fn same_shape<B>(&self, other: &Volume<B>) -> bool {
        self.shape() == other.shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Affine;

    /// 空心球壳, 外加一个不相连的小块.
    fn shell_phantom() -> Array3<f32> {
        let mut v = Array3::<f32>::zeros((12, 12, 12));
        for ((r, c, d), p) in v.indexed_iter_mut() {
            let (x, y, z) = (r as f32 - 5.0, c as f32 - 5.0, d as f32 - 5.0);
            let dist = (x * x + y * y + z * z).sqrt();
            if (3.0..=4.0).contains(&dist) {
                *p = 0.8;
            }
        }
        v[(11, 11, 11)] = 0.5;
        v[(0, 11, 0)] = 0.1; // 低于门限
        v
    }

    #[test]
    fn test_tight_bbox_contains_all_foreground() {
        let v = shell_phantom();
        let (cropped, bbox) = tight_bbox(v.view()).unwrap();
        let [r0, c0, d0, r1, c1, d1] = bbox.as_array();
        assert!(r0 < r1 && c0 < c1 && d0 < d1);
        assert_eq!(cropped.dim(), bbox.extent());

        let filled = fill_holes(v.mapv(|x| u8::from(x >= 0.2)).view());
        for (pos, p) in filled.indexed_iter() {
            if *p == 1 {
                assert!(bbox.contains(pos), "{pos:?} not in {bbox}");
            }
        }
        assert_eq!(bbox.as_array(), [1, 1, 1, 12, 12, 12]);
        assert!(!bbox.contains((0, 11, 0)));
    }

    #[test]
    fn test_tight_bbox_keeps_original_values() {
        let mut v = Array3::<f32>::zeros((6, 6, 6));
        v.slice_mut(s![2..4, 1..5, 3..4]).fill(0.3);
        v[(3, 2, 3)] = 77.0;
        let (cropped, bbox) = tight_bbox(v.view()).unwrap();
        assert_eq!(bbox.as_array(), [2, 1, 3, 4, 5, 4]);
        assert_eq!(cropped[(1, 1, 0)], 77.0);
    }

    #[test]
    fn test_tight_bbox_integer_input() {
        let mut v = Array3::<i16>::zeros((4, 4, 4));
        v[(1, 2, 3)] = 1;
        let (_, bbox) = tight_bbox(v.view()).unwrap();
        assert_eq!(bbox.as_array(), [1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_tight_bbox_empty() {
        let v = Array3::<f32>::from_elem((3, 3, 3), 0.19);
        assert_eq!(tight_bbox(v.view()).unwrap_err(), VolumeError::EmptyRegion);
    }

    #[test]
    fn test_crop_and_mask() {
        let v = Array3::from_shape_fn((4, 4, 4), |(r, c, d)| (r + c + d) as i32 + 1);
        let mut m = Array3::<u8>::zeros((4, 4, 4));
        m[(1, 1, 1)] = 1;
        m[(2, 3, 1)] = 1;

        let (cropped, bbox) = crop_to_mask(v.view(), m.view()).unwrap();
        assert_eq!(bbox.as_array(), [1, 1, 1, 3, 4, 2]);
        assert_eq!(cropped.dim(), (2, 3, 1));

        let masked = mask_volume(v.view(), m.view()).unwrap();
        assert_eq!(masked.iter().filter(|x| **x != 0).count(), 2);
        assert_eq!(masked[(2, 3, 1)], 7);

        let clipped = clip_to_mask_bbox(v.view(), m.view()).unwrap();
        assert_eq!(clipped.dim(), v.dim());
        assert_eq!(clipped.iter().filter(|x| **x != 0).count(), 6);
        assert_eq!(clipped[(1, 2, 1)], 5);
        assert_eq!(clipped[(0, 0, 0)], 0);
    }

    #[test]
    fn test_mask_errors() {
        let v = Array3::<f32>::ones((2, 2, 2));
        let m = Array3::<u8>::zeros((2, 2, 3));
        assert_eq!(
            mask_volume(v.view(), m.view()).unwrap_err(),
            VolumeError::ShapeMismatch {
                expected: (2, 2, 2),
                found: (2, 2, 3)
            }
        );
        let m = Array3::<u8>::zeros((2, 2, 2));
        assert_eq!(clip_to_mask_bbox(v.view(), m.view()).unwrap_err(), VolumeError::EmptyRegion);
    }

    #[test]
    fn test_volume_methods_keep_affine() {
        let a = Affine::from_spacing([0.5, 0.5, 3.0]);
        let v = Volume::new(Array3::<f32>::ones((5, 5, 5)), a);
        let mut m = BinaryMask::new(Array3::zeros((5, 5, 5)), a);
        m[(4, 0, 2)] = 1;
        assert!(m.same_shape(&v));
        assert_eq!(m.bbox().unwrap().as_array(), [4, 0, 2, 5, 1, 3]);

        let (cropped, _) = v.cropped_to(&m).unwrap();
        assert_eq!(cropped.affine(), &a);
        assert_eq!(cropped.shape(), (1, 1, 1));
        assert_eq!(v.masked(&m).unwrap().data().sum(), 1.0);
        assert_eq!(v.clipped_to_bbox(&m).unwrap().affine(), &a);

        let (tight, bbox) = v.tight_crop().unwrap();
        assert_eq!(tight.shape(), (5, 5, 5));
        assert_eq!(bbox.voxel_count(), 125);
    }
}
