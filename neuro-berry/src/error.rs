//! 运行时错误.

use thiserror::Error;

use crate::Idx3d;

/// 体数据变换的运行时错误.
///
/// 这些错误都是确定性计算的结果, 重试不会改变结论.
/// 由上层编排逻辑决定是中止整个病例还是跳过.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VolumeError {
    /// 阈值化并填洞后不存在任何前景体素, 无法计算包围盒.
    #[error("no foreground region found")]
    EmptyRegion,

    /// 无法识别的切片平面名称.
    #[error("invalid slicing plane `{0}`, expected one of axial, sagittal, coronal")]
    InvalidPlane(String),

    /// 目标尺寸既不是 2 维也不是 3 维. 参数为实际给出的分量个数.
    #[error("target size must have 2 or 3 components, got {0}")]
    InvalidTargetSize(usize),

    /// 插值阶数超出 0 到 5 的范围.
    #[error("interpolation order must be between 0 and 5, got {0}")]
    UnsupportedOrder(u8),

    /// 目标尺寸或体数据的某个维度为 0.
    #[error("volume extents must be non-zero")]
    ZeroExtent,

    /// 两个体数据 (或体数据与掩膜) 形状不一致.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// 期望的形状.
        expected: Idx3d,

        /// 实际的形状.
        found: Idx3d,
    },

    /// slab 大小必须为正.
    #[error("slab size must be positive")]
    InvalidSlabSize,

    /// 强度裁剪参数不合法 (下限大于上限, 非有限值, 或百分位越界).
    #[error("invalid intensity clipping bounds ({0}, {1})")]
    InvalidClipping(f64, f64),

    /// 体数据中含有 NaN 或无穷大, 导致按百分位计算的裁剪上下限不是有限值.
    /// 参数为算得的下限和上限.
    #[error("intensity percentiles ({0}, {1}) are not finite, the volume contains NaN or infinite values")]
    NonFiniteIntensity(f64, f64),

    /// 数组维数不足以包含切片平面对应的 slab 轴.
    #[error("slab axis {axis} does not exist in a {ndim}-dimensional array")]
    MissingAxis {
        /// slab 轴.
        axis: usize,

        /// 数组实际维数.
        ndim: usize,
    },

    /// 无法识别的字符串取值 (成像模态, 归一化方法等).
    #[error("unknown {kind} `{value}`")]
    UnknownVariant {
        /// 取值的种类.
        kind: &'static str,

        /// 原始字符串.
        value: String,
    },
}

/// 体数据变换运行时结果.
pub type VolumeResult<T> = Result<T, VolumeError>;

/// 检查两个三维形状是否一致.
#[inline]
pub(crate) fn check_shape(expected: Idx3d, found: Idx3d) -> VolumeResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(VolumeError::ShapeMismatch { expected, found })
    }
}
