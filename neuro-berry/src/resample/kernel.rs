//! 一维插值核与逐轴采样方案.
//!
//! 最近邻与线性插值直接在体素值上加权, 越界坐标按边缘复制处理.
//! 2 至 5 阶为 B 样条插值: 先对每条 lane 做因果/反因果递归预滤波得到样条系数,
//! 再用 B 样条基函数加权. 样条的边界条件为镜像 (`d c b | a b c d | c b a`).

use ndarray::{ArrayView1, ArrayViewMut1};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{VolumeError, VolumeResult};

/// 重采样插值方法.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Interpolation {
    /// 最近邻 (阶数 0). 不会产生新的体素值, 适用于标签.
    Nearest,

    /// 线性插值 (阶数 1).
    #[default]
    Linear,

    /// 二次 B 样条 (阶数 2).
    Quadratic,

    /// 三次 B 样条 (阶数 3).
    Cubic,

    /// 四次 B 样条 (阶数 4).
    Quartic,

    /// 五次 B 样条 (阶数 5).
    Quintic,
}

/// 样条预滤波因果初值的截断误差.
const PREFILTER_TOLERANCE: f64 = f64::EPSILON;

/// 高斯核的截断半径, 以标准差为单位.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

impl Interpolation {
    /// 由插值阶数得到插值方法. 0 为最近邻, 1 为线性, 2 到 5 为对应次数的 B 样条.
    ///
    /// 阶数大于 5 时返回 [`VolumeError::UnsupportedOrder`].
    pub fn from_order(order: u8) -> VolumeResult<Self> {
        Ok(match order {
            0 => Interpolation::Nearest,
            1 => Interpolation::Linear,
            2 => Interpolation::Quadratic,
            3 => Interpolation::Cubic,
            4 => Interpolation::Quartic,
            5 => Interpolation::Quintic,
            _ => return Err(VolumeError::UnsupportedOrder(order)),
        })
    }

    /// 对应的插值阶数.
    #[inline]
    pub const fn order(&self) -> u8 {
        match self {
            Interpolation::Nearest => 0,
            Interpolation::Linear => 1,
            Interpolation::Quadratic => 2,
            Interpolation::Cubic => 3,
            Interpolation::Quartic => 4,
            Interpolation::Quintic => 5,
        }
    }

    /// 是否为 B 样条插值 (需要预滤波)?
    #[inline]
    pub const fn is_spline(&self) -> bool {
        self.order() >= 2
    }

    /// 样条预滤波器的极点. 非样条插值没有极点.
    fn poles(&self) -> &'static [f64] {
        match self {
            Interpolation::Nearest | Interpolation::Linear => &[],
            Interpolation::Quadratic => &[-0.171_572_875_253_809_9],
            Interpolation::Cubic => &[-0.267_949_192_431_122_7],
            Interpolation::Quartic => &[-0.361_341_225_900_220_2, -0.013_725_429_297_339_121],
            Interpolation::Quintic => &[-0.430_575_347_099_973_8, -0.043_096_288_203_264_654],
        }
    }

    /// 在输入坐标 `x` 处采样需要的输入下标及其权重. 权重之和恒为 1.
    ///
    /// 对样条插值, 权重作用在预滤波后的系数上, 而不是体素值上.
    pub(crate) fn taps(&self, x: f64, len: usize) -> Vec<(usize, f64)> {
        debug_assert!(len > 0);
        let last = len as isize - 1;
        let clamp = |i: isize| i.clamp(0, last) as usize;
        match self {
            Interpolation::Nearest => vec![(clamp((x + 0.5).floor() as isize), 1.0)],
            Interpolation::Linear => {
                let i0 = x.floor();
                let t = x - i0;
                let i0 = i0 as isize;
                vec![(clamp(i0), 1.0 - t), (clamp(i0 + 1), t)]
            }
            _ => {
                let degree = self.order() as usize;
                let start = (x - (degree as f64 - 1.0) / 2.0).floor() as isize;
                (start..=start + degree as isize)
                    .map(|k| (mirror(k, len), bspline(degree, x - k as f64)))
                    .collect()
            }
        }
    }

    /// 将一条 lane 的体素值原地变换为样条系数. 非样条插值不做任何事.
    pub(crate) fn prefilter(&self, coeffs: &mut [f64]) {
        let poles = self.poles();
        let n = coeffs.len();
        if poles.is_empty() || n < 2 {
            return;
        }

        let gain: f64 = poles.iter().map(|z| (1.0 - z) * (1.0 - 1.0 / z)).product();
        coeffs.iter_mut().for_each(|c| *c *= gain);

        for &z in poles {
            coeffs[0] = causal_init(coeffs, z);
            for k in 1..n {
                coeffs[k] += z * coeffs[k - 1];
            }
            coeffs[n - 1] = z / (z * z - 1.0) * (z * coeffs[n - 2] + coeffs[n - 1]);
            for k in (0..n - 1).rev() {
                coeffs[k] = z * (coeffs[k + 1] - coeffs[k]);
            }
        }
    }
}

/// 镜像边界下的下标映射: `-1 -> 1`, `len -> len - 2`.
#[inline]
pub(crate) fn mirror(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let i = i.rem_euclid(period);
    if i < len as isize {
        i as usize
    } else {
        (period - i) as usize
    }
}

/// `degree` 次中心 B 样条基函数在 `x` 处的值.
fn bspline(degree: usize, x: f64) -> f64 {
    let half = (degree + 1) as f64 / 2.0;
    let x = x.abs();
    if x >= half {
        return 0.0;
    }

    let (mut sum, mut binom, mut sign) = (0.0, 1.0, 1.0);
    for k in 0..=degree + 1 {
        let t = x + half - k as f64;
        if t > 0.0 {
            sum += sign * binom * t.powi(degree as i32);
        }
        binom = binom * (degree + 1 - k) as f64 / (k + 1) as f64;
        sign = -sign;
    }
    let factorial: f64 = (1..=degree).map(|i| i as f64).product();
    sum / factorial
}

/// 镜像边界下因果递归滤波的初值.
fn causal_init(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    let horizon = (PREFILTER_TOLERANCE.ln() / z.abs().ln()).ceil() as usize;
    if horizon < n {
        // 截断求和
        let mut zn = z;
        let mut sum = c[0];
        for v in c[1..horizon].iter() {
            sum += zn * v;
            zn *= z;
        }
        sum
    } else {
        let iz = 1.0 / z;
        let mut zn = z;
        let mut z2n = z.powi(n as i32 - 1);
        let mut sum = c[0] + z2n * c[n - 1];
        z2n *= z2n * iz;
        for v in c[1..n - 1].iter() {
            sum += (zn + z2n) * v;
            zn *= z;
            z2n *= iz;
        }
        sum / (1.0 - zn * zn)
    }
}

/// 长度为 `src` 的轴缩小到 `dst` 时抗混叠高斯核的标准差 `(src / dst - 1) / 2`.
/// 放大或长度不变时为 0.
#[inline]
pub(crate) fn antialias_sigma(src: usize, dst: usize) -> f64 {
    ((src as f64 / dst as f64 - 1.0) / 2.0).max(0.0)
}

/// 归一化的一维高斯核, 半径为 `round(4 * sigma)`.
pub(crate) fn gaussian_kernel_1d(sigma: f64) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k * k) as f64 / (sigma * sigma)).exp())
        .collect();
    let norm: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

/// 单个轴上的完整重采样方案: 可选的抗混叠平滑, 样条预滤波, 逐点采样.
pub(crate) struct AxisPlan {
    method: Interpolation,
    smoothing: Option<Vec<f64>>,
    taps: Vec<Vec<(usize, f64)>>,
}

impl AxisPlan {
    /// 长度为 `src` 的轴重采样到 `dst`.
    ///
    /// 输出体素 `i` 的中心对应输入坐标 `(i + 0.5) * src / dst - 0.5`.
    /// `anti_aliasing` 为真且该轴被缩小时, 采样前先做镜像边界的高斯平滑.
    pub fn new(method: Interpolation, src: usize, dst: usize, anti_aliasing: bool) -> Self {
        let scale = src as f64 / dst as f64;
        let taps = (0..dst)
            .map(|i| method.taps((i as f64 + 0.5) * scale - 0.5, src))
            .collect();
        let sigma = antialias_sigma(src, dst);
        let smoothing = (anti_aliasing && sigma > 0.0).then(|| gaussian_kernel_1d(sigma));
        Self {
            method,
            smoothing,
            taps,
        }
    }

    /// 按方案计算一条输出 lane.
    pub fn apply(&self, lane: ArrayView1<f32>, mut dst: ArrayViewMut1<f32>) {
        let mut coeffs: Vec<f64> = match self.smoothing.as_deref() {
            Some(kernel) => smooth(lane, kernel),
            None => lane.iter().map(|v| *v as f64).collect(),
        };
        self.method.prefilter(&mut coeffs);
        for (o, taps) in dst.iter_mut().zip(self.taps.iter()) {
            *o = taps.iter().map(|(i, w)| coeffs[*i] * w).sum::<f64>() as f32;
        }
    }
}

/// 镜像边界的一维卷积. `kernel` 长度为奇数且对称.
fn smooth(lane: ArrayView1<f32>, kernel: &[f64]) -> Vec<f64> {
    let len = lane.len();
    let radius = (kernel.len() / 2) as isize;
    (0..len as isize)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(w, k)| w * lane[mirror(i + k, len)] as f64)
                .sum::<f64>()
        })
        .collect()
}
