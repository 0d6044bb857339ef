//! 为 slab 推理准备体数据: 沿 slab 轴做边缘复制填充, 以及推理后的逆操作.
//!
//! 所有函数都只作用于切片平面对应的 slab 轴, 其它轴 (包括末尾的通道轴) 保持不变.

use std::iter;

use ndarray::{concatenate, Array, ArrayBase, ArrayView, Axis, Data, Dimension, RemoveAxis, Slice};

use crate::data::{SlicingPlane, Volume, VoxelGeometry};
use crate::error::{VolumeError, VolumeResult};

/// 检查 slab 大小和 slab 轴, 返回 slab 轴.
fn checked_slab_axis<S: Data, D: Dimension>(data: &ArrayBase<S, D>, slab_size: usize, plane: SlicingPlane) -> VolumeResult<Axis> {
    if slab_size == 0 {
        return Err(VolumeError::InvalidSlabSize);
    }
    let axis = plane.slab_axis();
    if axis >= data.ndim() {
        return Err(VolumeError::MissingAxis {
            axis,
            ndim: data.ndim(),
        });
    }
    Ok(Axis(axis))
}

/// 在 `axis` 前端复制首个切片 `before` 次, 在后端复制末个切片 `after` 次.
fn pad_edge<A, S, D>(data: &ArrayBase<S, D>, axis: Axis, before: usize, after: usize) -> VolumeResult<Array<A, D>>
where
    A: Clone,
    S: Data<Elem = A>,
    D: RemoveAxis,
{
    if before == 0 && after == 0 {
        return Ok(data.to_owned());
    }
    let n = data.len_of(axis);
    if n == 0 {
        return Err(VolumeError::ZeroExtent);
    }
    let head = data.slice_axis(axis, Slice::from(0..1));
    let tail = data.slice_axis(axis, Slice::from(n - 1..n));
    let parts: Vec<ArrayView<A, D>> = iter::repeat(head)
        .take(before)
        .chain(iter::once(data.view()))
        .chain(iter::repeat(tail).take(after))
        .collect();
    Ok(concatenate(axis, &parts).expect("edge slices share the volume's shape"))
}

/// slab 轴长度补齐到 `slab_size` 的整数倍所需的切片数.
#[inline]
pub fn missing_slices(extent: usize, slab_size: usize) -> usize {
    (slab_size - extent % slab_size) % slab_size
}

/// 沿 slab 轴在尾端做边缘复制填充, 使其长度成为 `slab_size` 的整数倍.
///
/// 返回填充后的数据和填充的切片数. 长度已经是整数倍时不填充, 返回 0.
///
/// `slab_size` 为 0 时返回 [`VolumeError::InvalidSlabSize`],
/// 数组维数不足时返回 [`VolumeError::MissingAxis`].
pub fn pad_to_multiple<A, S, D>(
    volume: &ArrayBase<S, D>,
    slab_size: usize,
    plane: SlicingPlane,
) -> VolumeResult<(Array<A, D>, usize)>
where
    A: Clone,
    S: Data<Elem = A>,
    D: RemoveAxis,
{
    let axis = checked_slab_axis(volume, slab_size, plane)?;
    let missing = missing_slices(volume.len_of(axis), slab_size);
    Ok((pad_edge(volume, axis, 0, missing)?, missing))
}

/// 沿 slab 轴两端各做 `slab_size / 2` 个切片的边缘复制填充.
///
/// 用于以 slab 为单位推理时, 让首尾切片也拥有两侧上下文.
pub fn pad_symmetric<A, S, D>(volume: &ArrayBase<S, D>, slab_size: usize, plane: SlicingPlane) -> VolumeResult<Array<A, D>>
where
    A: Clone,
    S: Data<Elem = A>,
    D: RemoveAxis,
{
    let axis = checked_slab_axis(volume, slab_size, plane)?;
    let half = slab_size / 2;
    pad_edge(volume, axis, half, half)
}

/// [`pad_to_multiple`] 的逆操作: 去掉 slab 轴尾端的 `missing` 个切片.
///
/// 去掉后长度为 0 时返回 [`VolumeError::ZeroExtent`].
pub fn strip_trailing<A, S, D>(volume: &ArrayBase<S, D>, missing: usize, plane: SlicingPlane) -> VolumeResult<Array<A, D>>
where
    A: Clone,
    S: Data<Elem = A>,
    D: Dimension,
{
    let axis = checked_slab_axis(volume, 1, plane)?;
    let n = volume.len_of(axis);
    if missing >= n {
        return Err(VolumeError::ZeroExtent);
    }
    Ok(volume.slice_axis(axis, Slice::from(..n - missing)).to_owned())
}

/// [`pad_symmetric`] 的逆操作: 去掉 slab 轴两端各 `slab_size / 2` 个切片.
pub fn strip_symmetric<A, S, D>(volume: &ArrayBase<S, D>, slab_size: usize, plane: SlicingPlane) -> VolumeResult<Array<A, D>>
where
    A: Clone,
    S: Data<Elem = A>,
    D: Dimension,
{
    let axis = checked_slab_axis(volume, slab_size, plane)?;
    let half = slab_size / 2;
    let n = volume.len_of(axis);
    if 2 * half >= n {
        return Err(VolumeError::ZeroExtent);
    }
    Ok(volume.slice_axis(axis, Slice::from(half..n - half)).to_owned())
}

/// 将 slab 轴上的体素偏移转换为三维偏移向量.
fn slab_offset(plane: SlicingPlane, slices: f64) -> [f64; 3] {
    let mut offset = [0.0; 3];
    offset[plane.slab_axis()] = slices;
    offset
}

impl<A: Clone> Volume<A> {
    /// 见 [`pad_to_multiple`]. 填充只发生在尾端, 仿射保持不变.
    pub fn padded_to_multiple(&self, slab_size: usize, plane: SlicingPlane) -> VolumeResult<(Self, usize)> {
        let (data, missing) = pad_to_multiple(&self.data(), slab_size, plane)?;
        Ok((self.with_data(data), missing))
    }

    /// 见 [`pad_symmetric`]. 仿射原点沿 slab 轴后移 `slab_size / 2` 个体素,
    /// 原有体素的世界坐标保持不变.
    pub fn padded_symmetric(&self, slab_size: usize, plane: SlicingPlane) -> VolumeResult<Self> {
        let data = pad_symmetric(&self.data(), slab_size, plane)?;
        let affine = self.affine().shifted(slab_offset(plane, -((slab_size / 2) as f64)));
        Ok(Volume::new(data, affine))
    }

    /// 见 [`strip_symmetric`]. 仿射随之前移.
    pub fn stripped_symmetric(&self, slab_size: usize, plane: SlicingPlane) -> VolumeResult<Self> {
        let data = strip_symmetric(&self.data(), slab_size, plane)?;
        let affine = self.affine().shifted(slab_offset(plane, (slab_size / 2) as f64));
        Ok(Volume::new(data, affine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Affine;
    use ndarray::{s, Array2, Array3, Array4};

    #[test]
    fn test_missing_slices() {
        assert_eq!(missing_slices(20, 8), 4);
        assert_eq!(missing_slices(24, 8), 0);
        assert_eq!(missing_slices(1, 8), 7);
        assert_eq!(missing_slices(0, 8), 0);
    }

    #[test]
    fn test_axial_slab_8_extent_20() {
        let v = Array3::from_shape_fn((3, 2, 20), |(_, _, d)| d as i32);
        let (out, missing) = pad_to_multiple(&v, 8, SlicingPlane::Axial).unwrap();
        assert_eq!(missing, 4);
        assert_eq!(out.dim(), (3, 2, 24));
        // 边缘复制
        assert!(out.slice(s![.., .., 19..]).iter().all(|x| *x == 19));
        assert_eq!(out.slice(s![.., .., ..20]), v);
    }

    #[test]
    fn test_pad_to_multiple_idempotent() {
        let v = Array3::from_shape_fn((16, 5, 3), |(r, c, d)| (r + c + d) as f32);
        let (once, m1) = pad_to_multiple(&v, 4, SlicingPlane::Sagittal).unwrap();
        assert_eq!(m1, 0);
        assert_eq!(once, v);

        let (a, _) = pad_to_multiple(&v, 6, SlicingPlane::Coronal).unwrap();
        let (b, m2) = pad_to_multiple(&a, 6, SlicingPlane::Coronal).unwrap();
        assert_eq!(a.dim(), (16, 6, 3));
        assert_eq!(m2, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_symmetric_adds_half_slab() {
        for (extent, slab) in [(1, 5), (7, 8), (32, 16), (3, 1)] {
            let v = Array3::from_shape_fn((extent, 2, 2), |(r, _, _)| r as u8);
            let out = pad_symmetric(&v, slab, SlicingPlane::Sagittal).unwrap();
            let half = slab / 2;
            assert_eq!(out.dim(), (extent + 2 * half, 2, 2));
            assert!(out.slice(s![..half, .., ..]).iter().all(|x| *x == 0));
            assert!(out.slice(s![half + extent.., .., ..]).iter().all(|x| *x as usize == extent - 1));
            assert_eq!(strip_symmetric(&out, slab, SlicingPlane::Sagittal).unwrap(), v);
        }
    }

    #[test]
    fn test_channel_axis_untouched() {
        let v = Array4::from_shape_fn((4, 5, 6, 2), |(_, _, _, ch)| ch as f32);
        let (out, missing) = pad_to_multiple(&v, 4, SlicingPlane::Coronal).unwrap();
        assert_eq!(missing, 3);
        assert_eq!(out.dim(), (4, 8, 6, 2));
        let out = pad_symmetric(&v, 4, SlicingPlane::Axial).unwrap();
        assert_eq!(out.dim(), (4, 5, 10, 2));
        assert_eq!(strip_trailing(&out, 4, SlicingPlane::Axial).unwrap().dim(), (4, 5, 6, 2));
    }

    #[test]
    fn test_errors() {
        let v = Array3::<u8>::zeros((2, 2, 2));
        assert_eq!(pad_to_multiple(&v, 0, SlicingPlane::Axial), Err(VolumeError::InvalidSlabSize));
        let flat = Array2::<u8>::zeros((2, 2));
        assert_eq!(
            pad_symmetric(&flat, 2, SlicingPlane::Axial),
            Err(VolumeError::MissingAxis { axis: 2, ndim: 2 })
        );
        assert_eq!(strip_trailing(&v, 2, SlicingPlane::Axial), Err(VolumeError::ZeroExtent));
        let empty = Array3::<u8>::zeros((2, 2, 0));
        assert_eq!(pad_symmetric(&empty, 2, SlicingPlane::Axial), Err(VolumeError::ZeroExtent));
    }

    #[test]
    fn test_volume_affine() {
        let a = Affine::from_spacing([1.0, 1.0, 2.5]);
        let v = Volume::new(Array3::<f32>::zeros((2, 2, 20)), a);
        let (padded, missing) = v.padded_to_multiple(8, SlicingPlane::Axial).unwrap();
        assert_eq!(missing, 4);
        assert_eq!(padded.affine(), &a);

        let sym = v.padded_symmetric(8, SlicingPlane::Axial).unwrap();
        assert_eq!(sym.shape(), (2, 2, 28));
        // 原先的第 0 个切片现在是第 4 个, 世界坐标不变.
        assert_eq!(sym.affine().apply([0.0, 0.0, 4.0]), a.apply([0.0, 0.0, 0.0]));
        let back = sym.stripped_symmetric(8, SlicingPlane::Axial).unwrap();
        assert_eq!(back, v);
    }
}
