#![warn(missing_docs)]

//! 核心库. 为脑部 MRI/CT 分割模型提供体数据的前处理与后处理算法.
//!
//! 该 crate 只处理内存中的体数据 (体素数组 + 体素到世界坐标的仿射),
//! 不读写任何影像文件, 不启动外部进程, 也不运行模型本身.
//! 所有参数都由调用方显式传入, 不存在全局配置.
//!
//! # 注意
//!
//! 1. 数组轴顺序与 nifti 的 `(i, j, k)` 一致, 横断面的 slab 轴为第 2 轴.
//! 2. 对公开输入的检查失败时返回 [`VolumeError`]; 对内部约定的违反会直接 panic.
//!
//! # 开发计划
//!
//! ### 紧致包围盒与基于掩膜的裁剪 ✅
//!
//! 阈值化, 三维填洞, 包围盒. 以及脑掩膜遮挡 / 包围盒外置零 / 裁剪.
//!
//! 实现位于 `neuro-berry/src/geometry`.
//!
//! ### 按切片平面重采样 ✅
//!
//! 三维目标尺寸直接重采样; 二维目标尺寸按切片平面补齐第三维.
//! 可分离的一维插值, 支持最近邻 / 线性 / 2 至 5 阶 B 样条, 缩小时高斯抗混叠.
//!
//! 实现位于 `neuro-berry/src/resample`.
//!
//! ### 强度归一化 ✅
//!
//! CT 按 HU 窗口裁剪后缩放; MRI 按百分位裁剪后零均值标准化或缩放.
//!
//! 实现位于 `neuro-berry/src/normalize`.
//!
//! ### slab 推理填充 ✅
//!
//! 尾端补齐到 slab 整数倍, 或两端各补 `slab / 2`. 以及对应的逆操作.
//!
//! 实现位于 `neuro-berry/src/padding.rs`.
//!
//! ### 预测掩膜逐区域体积约束膨胀 ✅
//!
//! 每个连通区域独立膨胀, 直到体积增长超过阈值为止 (超出的那一步被撤销).
//! 可选 `rayon` 并行.
//!
//! 实现位于 `neuro-berry/src/post_proc`.
//!
//! ### 脑提取适配层 ✅
//!
//! 外部模型通过 trait 接入, 只保留最大连通区域.
//!
//! 实现位于 `neuro-berry/src/brain.rs`.
//!
//! ### 膨胀阈值消融实验 ✅
//!
//! 实现位于 `ablations/growth`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 一个连通区域内的所有体素.
pub type Area3d = Vec<Idx3d>;

/// 多个连通区域.
pub type Areas3d = Vec<Area3d>;

pub mod consts;

mod error;

pub use error::{VolumeError, VolumeResult};

/// 体数据基础结构.
mod data;

pub use data::{Affine, BinaryMask, ScanVolume, SlicingPlane, Volume, VoxelGeometry};

pub mod geometry;

pub use geometry::{bbox_of, clip_to_mask_bbox, crop_to_mask, mask_volume, tight_bbox, BoundingBox};

pub mod morph_3d;

pub use morph_3d::{components, label_components};

pub mod resample;

pub use resample::{resize_volume, resize_volume_with, target_shape, Interpolation};

pub mod normalize;

pub use normalize::{
    normalize, percentile, ClipWindow, ImagingModality, NormalizationMethod, NormalizationParameters,
};

pub mod padding;

pub use padding::{pad_symmetric, pad_to_multiple, strip_symmetric, strip_trailing};

pub mod post_proc;

pub mod brain;

pub mod prelude;
