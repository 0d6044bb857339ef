//! 按成像模态进行强度归一化.
//!
//! CT 按固定 HU 窗口裁剪后线性缩放到 `[0, 1]`;
//! MRI 先按百分位裁剪 (可选), 再做零均值标准化或线性缩放.

use std::fmt;
use std::str::FromStr;

use itertools::{Itertools, MinMaxResult};
use ndarray::{Array, ArrayBase, Data, Dimension};
use num::ToPrimitive;
use ordered_float::OrderedFloat;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::FULL_PERCENTILE_RANGE;
use crate::data::Volume;
use crate::error::{VolumeError, VolumeResult};

mod window;

pub use window::ClipWindow;

/// 成像模态.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum ImagingModality {
    /// 计算机断层扫描, 体素值为 HU.
    Ct,

    /// 磁共振成像, 体素值为无量纲信号强度.
    Mri,
}

impl FromStr for ImagingModality {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CT" => Ok(ImagingModality::Ct),
            "MRI" => Ok(ImagingModality::Mri),
            _ => Err(VolumeError::UnknownVariant {
                kind: "imaging modality",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ImagingModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImagingModality::Ct => "CT",
            ImagingModality::Mri => "MRI",
        })
    }
}

/// MRI 裁剪后的归一化方法.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NormalizationMethod {
    /// `(x - mean) / std`.
    ZeroMean,

    /// 线性缩放到 `[0, 1]`.
    #[default]
    MinMax,
}

impl FromStr for NormalizationMethod {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zeromean" => Ok(NormalizationMethod::ZeroMean),
            "minmax" => Ok(NormalizationMethod::MinMax),
            _ => Err(VolumeError::UnknownVariant {
                kind: "normalization method",
                value: s.to_string(),
            }),
        }
    }
}

/// 归一化参数. 每次调用内不可变.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NormalizationParameters {
    /// 成像模态, 决定使用哪一条归一化路径.
    pub imaging_modality: ImagingModality,

    /// CT 路径使用的 HU 裁剪窗口 `(low, high)`.
    pub intensity_clipping_values: (f32, f32),

    /// MRI 路径使用的百分位裁剪区间 `(p_low, p_high)`, 取值范围 `[0, 100]`.
    /// 区间宽度为 100 时不裁剪.
    pub intensity_clipping_range: (f64, f64),

    /// MRI 路径裁剪后的归一化方法.
    pub normalization_method: NormalizationMethod,
}

impl NormalizationParameters {
    /// CT 参数.
    pub fn ct(window: ClipWindow) -> Self {
        Self {
            imaging_modality: ImagingModality::Ct,
            intensity_clipping_values: window.bounds(),
            intensity_clipping_range: (0.0, FULL_PERCENTILE_RANGE),
            normalization_method: NormalizationMethod::MinMax,
        }
    }

    /// MRI 参数.
    pub fn mri(p_low: f64, p_high: f64, method: NormalizationMethod) -> Self {
        Self {
            imaging_modality: ImagingModality::Mri,
            intensity_clipping_values: ClipWindow::unbounded().bounds(),
            intensity_clipping_range: (p_low, p_high),
            normalization_method: method,
        }
    }

    /// 检查并获取 CT 裁剪窗口.
    pub fn clip_window(&self) -> VolumeResult<ClipWindow> {
        let (low, high) = self.intensity_clipping_values;
        ClipWindow::new(low, high).ok_or(VolumeError::InvalidClipping(low as f64, high as f64))
    }

    /// 检查并获取 MRI 百分位区间. 不需要裁剪时返回 `None`.
    pub fn percentile_range(&self) -> VolumeResult<Option<(f64, f64)>> {
        let (lo, hi) = self.intensity_clipping_range;
        let valid = |q: f64| (0.0..=FULL_PERCENTILE_RANGE).contains(&q);
        if !valid(lo) || !valid(hi) || lo > hi {
            return Err(VolumeError::InvalidClipping(lo, hi));
        }
        Ok((hi - lo != FULL_PERCENTILE_RANGE).then_some((lo, hi)))
    }
}

/// 在已排序的数据上计算第 `q` 百分位数, 相邻秩之间线性插值.
fn percentile_sorted(sorted: &[OrderedFloat<f32>], q: f64) -> f32 {
    let pos = q / FULL_PERCENTILE_RANGE * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (a, b) = (sorted[lo].0 as f64, sorted[hi].0 as f64);
    (a + (b - a) * (pos - lo as f64)) as f32
}

/// 计算 `values` 的第 `q` 百分位数 (`0 <= q <= 100`), 相邻秩之间线性插值.
///
/// `values` 为空或 `q` 越界时返回 `None`. NaN 被视为最大值, 因此 `q` 接近 100 时
/// 结果可能是 NaN; [`normalize`] 在这种情况下返回 [`VolumeError::NonFiniteIntensity`].
pub fn percentile(values: &[f32], q: f64) -> Option<f32> {
    if values.is_empty() || !(0.0..=FULL_PERCENTILE_RANGE).contains(&q) {
        return None;
    }
    let mut sorted = values.iter().copied().map(OrderedFloat).collect_vec();
    sorted.sort_unstable();
    Some(percentile_sorted(&sorted, q))
}

/// 归一化体数据. 输入不会被修改, 输出总是新的 `f32` 数组, 形状不变.
///
/// 支持任意维度, 即允许带有末尾通道轴的体数据. 无法转换为 `f32` 的体素值按 0 处理.
///
/// 参数不合法时返回 [`VolumeError::InvalidClipping`];
/// MRI 百分位裁剪遇到 NaN 或无穷大的体素时返回 [`VolumeError::NonFiniteIntensity`].
pub fn normalize<S, D>(volume: &ArrayBase<S, D>, params: &NormalizationParameters) -> VolumeResult<Array<f32, D>>
where
    S: Data,
    S::Elem: Copy + ToPrimitive,
    D: Dimension,
{
    let values = volume.mapv(|v| v.to_f32().unwrap_or(0.0));
    match params.imaging_modality {
        ImagingModality::Ct => normalize_ct(values, params.clip_window()?),
        ImagingModality::Mri => normalize_mri(values, params.percentile_range()?, params.normalization_method),
    }
}

fn normalize_ct<D: Dimension>(mut values: Array<f32, D>, window: ClipWindow) -> VolumeResult<Array<f32, D>> {
    values.mapv_inplace(|v| window.clip(v));
    rescale_min_max(&mut values);
    Ok(values)
}

fn normalize_mri<D: Dimension>(
    mut values: Array<f32, D>,
    range: Option<(f64, f64)>,
    method: NormalizationMethod,
) -> VolumeResult<Array<f32, D>> {
    if let Some((lo, hi)) = range {
        if !values.is_empty() {
            let mut sorted = values.iter().copied().map(OrderedFloat).collect_vec();
            sorted.sort_unstable();
            let (low, high) = (percentile_sorted(&sorted, lo), percentile_sorted(&sorted, hi));
            log::trace!("percentile clip ({lo}, {hi}) -> [{low}, {high}]");
            // 百分位参数已经校验过, 这里失败只可能来自数据本身.
            let window = ClipWindow::new(low, high).ok_or(VolumeError::NonFiniteIntensity(low as f64, high as f64))?;
            values.mapv_inplace(|v| window.clip(v));
        }
    }
    match method {
        NormalizationMethod::ZeroMean => standardize(&mut values),
        NormalizationMethod::MinMax => rescale_min_max(&mut values),
    }
    Ok(values)
}

/// 线性缩放到 `[0, 1]`. 最大值等于最小值时不做任何处理.
fn rescale_min_max<D: Dimension>(values: &mut Array<f32, D>) {
    let (min, max) = match values.iter().minmax() {
        MinMaxResult::MinMax(min, max) => (*min, *max),
        MinMaxResult::OneElement(v) => (*v, *v),
        MinMaxResult::NoElements => return,
    };
    if max == min {
        log::debug!("degenerate intensity range at {min}, rescale skipped");
        return;
    }
    let range = max - min;
    values.mapv_inplace(|v| (v - min) / range);
}

/// 零均值, 单位 (总体) 标准差. 标准差为 0 时只减去均值.
fn standardize<D: Dimension>(values: &mut Array<f32, D>) {
    if values.is_empty() {
        return;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|v| *v as f64).sum::<f64>() / n;
    let var = values.iter().map(|v| (*v as f64 - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std == 0.0 || !std.is_finite() {
        log::debug!("degenerate standard deviation {std}, only the mean is removed");
        values.mapv_inplace(|v| (v as f64 - mean) as f32);
    } else {
        values.mapv_inplace(|v| ((v as f64 - mean) / std) as f32);
    }
}

impl<A: Copy + ToPrimitive> Volume<A> {
    /// 见 [`normalize`]. 仿射保持不变.
    pub fn normalized(&self, params: &NormalizationParameters) -> VolumeResult<Volume<f32>> {
        Ok(self.with_data(normalize(&self.data(), params)?))
    }
}
