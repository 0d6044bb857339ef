//! 体数据重采样.
//!
//! 三维重采样拆分为依次沿三个轴的一维重采样. 每一步只改变一个轴的长度,
//! 各条 lane 之间相互独立, 开启 `rayon` 特性时并行处理.
//! 缩小时的高斯抗混叠和 B 样条预滤波同样逐轴进行.

use ndarray::{Array3, ArrayView3, Axis, Zip};
use num::ToPrimitive;

use crate::data::{SlicingPlane, Volume, VoxelGeometry};
use crate::error::{VolumeError, VolumeResult};
use crate::Idx3d;

mod kernel;

use kernel::AxisPlan;
pub use kernel::Interpolation;

/// 根据目标尺寸和切片平面计算重采样后的形状.
///
/// - `target_size` 有 3 个分量时, 直接作为目标形状.
/// - 有 2 个分量 `(d0, d1)` 时:
///   - 横断面: `(d0, d1, round(shape[2] * d1 / shape[1]))`;
///   - 矢状面与冠状面: `(d0, d0, d1)`.
///
/// 分量个数不合法时返回 [`VolumeError::InvalidTargetSize`],
/// 任何维度为 0 时返回 [`VolumeError::ZeroExtent`].
pub fn target_shape(shape: Idx3d, target_size: &[usize], plane: SlicingPlane) -> VolumeResult<Idx3d> {
    let (_, c, d) = shape;
    let target = match *target_size {
        [r0, c0, d0] => (r0, c0, d0),
        [d0, d1] => match plane {
            SlicingPlane::Axial => {
                if c == 0 {
                    return Err(VolumeError::ZeroExtent);
                }
                let depth = (d as f64 * d1 as f64 / c as f64).round() as usize;
                (d0, d1, depth)
            }
            SlicingPlane::Sagittal | SlicingPlane::Coronal => (d0, d0, d1),
        },
        _ => return Err(VolumeError::InvalidTargetSize(target_size.len())),
    };
    if target.0 == 0 || target.1 == 0 || target.2 == 0 {
        return Err(VolumeError::ZeroExtent);
    }
    Ok(target)
}

/// 将体数据重采样到目标尺寸. 目标形状的计算规则见 [`target_shape`].
///
/// `order` 为插值阶数, 见 [`Interpolation::from_order`].
/// 阶数大于 0 时, 被缩小的轴在采样前先做高斯抗混叠平滑 (见 [`resize_volume_with`]);
/// 最近邻插值从不平滑, 以保证标签值不变.
/// 输出总是 `f32`, 阶数大于 0 时整数输入也可能得到非整数值.
/// 无法转换为 `f32` 的体素值按 0 处理. 输入不会被修改.
#[inline]
pub fn resize_volume<A>(
    volume: ArrayView3<A>,
    target_size: &[usize],
    plane: SlicingPlane,
    order: u8,
) -> VolumeResult<Array3<f32>>
where
    A: Copy + ToPrimitive,
{
    resize_volume_with(volume, target_size, plane, order, order > 0)
}

/// 同 [`resize_volume`], 但显式指定是否抗混叠.
///
/// `anti_aliasing` 为真时, 每个被缩小的轴 (输入长度 `n` 大于输出长度 `m`)
/// 先用标准差为 `(n / m - 1) / 2` 的高斯核平滑, 核半径为 4 倍标准差, 边界为镜像.
/// 放大的轴不受影响.
pub fn resize_volume_with<A>(
    volume: ArrayView3<A>,
    target_size: &[usize],
    plane: SlicingPlane,
    order: u8,
    anti_aliasing: bool,
) -> VolumeResult<Array3<f32>>
where
    A: Copy + ToPrimitive,
{
    let shape = volume.dim();
    if shape.0 == 0 || shape.1 == 0 || shape.2 == 0 {
        return Err(VolumeError::ZeroExtent);
    }
    let target = target_shape(shape, target_size, plane)?;
    let method = Interpolation::from_order(order)?;
    log::trace!("resize {shape:?} -> {target:?} with {method:?}, anti-aliasing: {anti_aliasing}");

    let mut data = volume.mapv(|v| v.to_f32().unwrap_or(0.0));
    for (axis, len) in [target.0, target.1, target.2].into_iter().enumerate() {
        data = resize_axis(data.view(), Axis(axis), len, method, anti_aliasing);
    }
    Ok(data)
}

/// 沿单个轴重采样到长度 `len`. 长度不变时直接复制.
fn resize_axis(
    src: ArrayView3<f32>,
    axis: Axis,
    len: usize,
    method: Interpolation,
    anti_aliasing: bool,
) -> Array3<f32> {
    let n = src.len_of(axis);
    if n == len {
        return src.to_owned();
    }
    let plan = AxisPlan::new(method, n, len, anti_aliasing);
    let mut dim = src.raw_dim();
    dim[axis.index()] = len;
    let mut out = Array3::<f32>::zeros(dim);

    let zip = Zip::from(out.lanes_mut(axis)).and(src.lanes(axis));
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            zip.par_for_each(|dst, lane| plan.apply(lane, dst));
        } else {
            zip.for_each(|dst, lane| plan.apply(lane, dst));
        }
    }
    out
}

impl<A: Copy + ToPrimitive> Volume<A> {
    /// 见 [`resize_volume`]. 仿射随体素间距一同更新, 保持体素中心与世界坐标对齐.
    pub fn resized(&self, target_size: &[usize], plane: SlicingPlane, order: u8) -> VolumeResult<Volume<f32>> {
        let data = resize_volume(self.data(), target_size, plane, order)?;
        let affine = self.affine().rescaled(self.shape(), data.dim());
        Ok(Volume::new(data, affine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Affine;

    fn f32_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn ramp(shape: Idx3d) -> Array3<f32> {
        Array3::from_shape_fn(shape, |(r, c, d)| (r + 2 * c + 3 * d) as f32)
    }

    #[test]
    fn test_3d_target_shape_is_exact() {
        let v = ramp((7, 5, 3));
        for order in 0..=5 {
            for target in [[4, 4, 4], [14, 10, 6], [1, 9, 2], [7, 5, 3]] {
                let out = resize_volume(v.view(), &target, SlicingPlane::Axial, order).unwrap();
                assert_eq!(out.dim(), (target[0], target[1], target[2]));
            }
        }
    }

    #[test]
    fn test_axial_rule() {
        let v = Array3::<u8>::zeros((10, 20, 7));
        let out = resize_volume(v.view(), &[16, 8], SlicingPlane::Axial, 1).unwrap();
        // round(7 * 8 / 20) = round(2.8) = 3
        assert_eq!(out.dim(), (16, 8, 3));
        assert_eq!(target_shape((10, 20, 5), &[16, 8], SlicingPlane::Axial), Ok((16, 8, 2)));
    }

    #[test]
    fn test_sagittal_and_coronal_rule() {
        let shape = (9, 11, 13);
        assert_eq!(target_shape(shape, &[6, 4], SlicingPlane::Sagittal), Ok((6, 6, 4)));
        assert_eq!(target_shape(shape, &[6, 4], SlicingPlane::Coronal), Ok((6, 6, 4)));
    }

    #[test]
    fn test_invalid_target() {
        let v = ramp((3, 3, 3));
        assert_eq!(
            resize_volume(v.view(), &[1, 2, 3, 4], SlicingPlane::Axial, 1),
            Err(VolumeError::InvalidTargetSize(4))
        );
        assert_eq!(
            resize_volume(v.view(), &[3, 0, 3], SlicingPlane::Axial, 1),
            Err(VolumeError::ZeroExtent)
        );
        // 横断面规则下第三维被舍入到 0.
        assert_eq!(
            target_shape((3, 100, 1), &[4, 4], SlicingPlane::Axial),
            Err(VolumeError::ZeroExtent)
        );
    }

    #[test]
    fn test_same_shape_is_identity() {
        let v = ramp((4, 3, 5));
        for order in 0..=3 {
            let out = resize_volume(v.view(), &[4, 3, 5], SlicingPlane::Axial, order).unwrap();
            assert_eq!(out, v);
        }
    }

    #[test]
    fn test_nearest_keeps_labels() {
        let labels = Array3::from_shape_fn((4, 4, 4), |(r, _, _)| (r % 3) as u8);
        let out = resize_volume(labels.view(), &[9, 5, 3], SlicingPlane::Axial, 0).unwrap();
        assert!(out.iter().all(|x| [0.0, 1.0, 2.0].contains(x)));
    }

    #[test]
    fn test_linear_downsample_constant_and_ramp() {
        let v = Array3::<i16>::from_elem((6, 6, 6), 42);
        let out = resize_volume(v.view(), &[3, 3, 3], SlicingPlane::Axial, 1).unwrap();
        assert!(out.iter().all(|x| f32_eq(*x, 42.0)));

        // 缩小一半时, 输出体素 i 对应输入坐标 2i + 0.5, 线性插值在斜坡上是精确的.
        let v = Array3::from_shape_fn((8, 1, 1), |(r, _, _)| r as f32);
        let out = resize_volume_with(v.view(), &[4, 1, 1], SlicingPlane::Axial, 1, false).unwrap();
        for (i, x) in out.iter().enumerate() {
            assert!(f32_eq(*x, 2.0 * i as f32 + 0.5));
        }
    }

    /// 交替的 0/1 体素缩小到三分之一: 直接采样得到混叠的 0/1, 抗混叠后接近 0.5.
    #[test]
    fn test_anti_aliasing_on_downsample() {
        let v = Array3::from_shape_fn((9, 1, 1), |(r, _, _)| (r % 2) as f32);
        let aliased = resize_volume_with(v.view(), &[3, 1, 1], SlicingPlane::Axial, 1, false).unwrap();
        assert_eq!(aliased.iter().copied().collect::<Vec<_>>(), vec![1.0, 0.0, 1.0]);

        let smoothed = resize_volume(v.view(), &[3, 1, 1], SlicingPlane::Axial, 1).unwrap();
        assert!(smoothed.iter().all(|x| (x - 0.5).abs() < 0.01));

        // 最近邻从不平滑.
        let labels = resize_volume(v.view(), &[3, 1, 1], SlicingPlane::Axial, 0).unwrap();
        assert_eq!(labels, aliased);

        // 放大的轴不受影响.
        let up = Array3::from_shape_fn((2, 1, 1), |(r, _, _)| r as f32);
        assert_eq!(
            resize_volume(up.view(), &[4, 1, 1], SlicingPlane::Axial, 1).unwrap(),
            resize_volume_with(up.view(), &[4, 1, 1], SlicingPlane::Axial, 1, false).unwrap()
        );
    }

    /// 二次和三次 B 样条在远离边界处精确重建同次多项式.
    #[test]
    fn test_spline_reproduces_polynomials() {
        // 放大一倍时, 输出体素 i 对应输入坐标 i / 2 - 0.25.
        let x = |i: usize| i as f64 / 2.0 - 0.25;

        let cubic = Array3::from_shape_fn((40, 1, 1), |(r, _, _)| (r * r * r) as f32 / 1000.0);
        let out = resize_volume(cubic.view(), &[80, 1, 1], SlicingPlane::Axial, 3).unwrap();
        for i in 30..=50 {
            let expected = x(i).powi(3) / 1000.0;
            assert!((out[(i, 0, 0)] as f64 - expected).abs() < 1e-4, "at {i}");
        }

        let quad = Array3::from_shape_fn((40, 1, 1), |(r, _, _)| (r as f32 - 7.0).powi(2) / 10.0);
        let out = resize_volume(quad.view(), &[80, 1, 1], SlicingPlane::Axial, 2).unwrap();
        for i in 30..=50 {
            let expected = (x(i) - 7.0).powi(2) / 10.0;
            assert!((out[(i, 0, 0)] as f64 - expected).abs() < 1e-4, "at {i}");
        }
    }

    #[test]
    fn test_spline_orders_differ() {
        let lane = [0.0f32, 1.0, 4.0, 2.0, 0.0, 3.0];
        let v = Array3::from_shape_fn((6, 1, 1), |(r, _, _)| lane[r]);
        let at = |order| resize_volume(v.view(), &[13, 1, 1], SlicingPlane::Axial, order).unwrap()[(6, 0, 0)];
        // 输出 6 对应输入坐标 2.5.
        assert!((at(2) - 3.4655).abs() < 1e-3);
        assert!((at(3) - 3.5795).abs() < 1e-3);
        assert!((at(5) - 3.7702).abs() < 1e-3);

        assert_eq!(
            resize_volume(v.view(), &[13, 1, 1], SlicingPlane::Axial, 6),
            Err(VolumeError::UnsupportedOrder(6))
        );
    }

    #[test]
    fn test_input_untouched_and_affine_updated() {
        let v = Volume::new(ramp((4, 4, 4)), Affine::from_spacing([1.0, 1.0, 2.0]));
        let before = v.clone();
        let out = v.resized(&[8, 2, 4], SlicingPlane::Axial, 1).unwrap();
        assert_eq!(v, before);
        assert_eq!(out.shape(), (8, 2, 4));
        let [x, y, z] = out.pix_dim();
        assert!((x - 0.5).abs() < 1e-12);
        assert!((y - 2.0).abs() < 1e-12);
        assert!((z - 2.0).abs() < 1e-12);
    }
}
