//! 预测掩膜的逐连通区域体积约束膨胀.

use ndarray::{Array3, ArrayView3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::gray::*;
use crate::data::{BinaryMask, VoxelGeometry};
use crate::morph_3d::{components, Frontier};
use crate::{Area3d, Idx3d};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 膨胀的停止条件.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GrowthLimit {
    /// 单个体素的体积, 以毫升为单位. 只影响报告中的体积, 不影响停止判断.
    pub voxel_volume_ml: f64,

    /// 允许的最大体积增长百分比. 某一步膨胀后增长超过该值时, 该步被撤销并停止.
    ///
    /// 该值 `<= 0` 或为 NaN 时, 第一步总是被撤销, 即不做任何膨胀.
    pub max_growth_percent: f64,

    /// 每个连通区域最多接受的膨胀步数. `None` 表示只由增长百分比决定.
    pub max_steps: Option<u32>,
}

impl GrowthLimit {
    /// 构建不限步数的停止条件.
    #[inline]
    pub fn new(voxel_volume_ml: f64, max_growth_percent: f64) -> Self {
        Self {
            voxel_volume_ml,
            max_growth_percent,
            max_steps: None,
        }
    }

    /// 额外限制最多接受的膨胀步数.
    #[inline]
    pub fn with_max_steps(self, max_steps: u32) -> Self {
        Self {
            max_steps: Some(max_steps),
            ..self
        }
    }

    /// 从 `initial` 个体素增长到 `grown` 个体素是否超出限制?
    #[inline]
    pub fn exceeded(&self, initial: usize, grown: usize) -> bool {
        let pct = (grown as f64 - initial as f64) / initial as f64 * 100.0;
        // NaN 阈值同样视为超出.
        !(pct <= self.max_growth_percent)
    }

    #[inline]
    fn step_cap_reached(&self, steps: u32) -> bool {
        self.max_steps.map_or(false, |m| steps >= m)
    }
}

/// 单个连通区域停止膨胀的原因.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopReason {
    /// 下一步膨胀的增长超过阈值, 已被撤销.
    ThresholdExceeded,

    /// 区域已经填满整个体数据, 无法继续膨胀.
    Saturated,

    /// 达到 [`GrowthLimit::max_steps`].
    StepLimit,
}

/// 单个连通区域的膨胀记录.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentGrowth {
    /// 连通区域标号, 从 1 开始, 与 [`crate::label_components`] 一致.
    pub label: u32,

    /// 膨胀前的体素个数.
    pub initial_voxels: usize,

    /// 膨胀后的体素个数.
    pub final_voxels: usize,

    /// 被接受的膨胀步数.
    pub accepted_steps: u32,

    /// 膨胀前的体积 (毫升).
    pub initial_ml: f64,

    /// 膨胀后的体积 (毫升).
    pub final_ml: f64,

    /// 停止原因.
    pub stop: StopReason,
}

impl ComponentGrowth {
    /// 实际体积增长百分比.
    #[inline]
    pub fn growth_percent(&self) -> f64 {
        (self.final_voxels as f64 - self.initial_voxels as f64) / self.initial_voxels as f64 * 100.0
    }
}

/// 整个掩膜的膨胀记录, 按连通区域标号排列.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RefineReport {
    components: Vec<ComponentGrowth>,
}

impl RefineReport {
    /// 连通区域个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// 输入是否为空掩膜?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// 迭代所有连通区域的记录.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ComponentGrowth> + '_ {
        self.components.iter()
    }

    /// 膨胀前的总体积 (毫升).
    pub fn initial_ml(&self) -> f64 {
        self.components.iter().map(|c| c.initial_ml).sum()
    }

    /// 直接获得内部数据的所有权.
    #[inline]
    pub fn into_raw(self) -> Vec<ComponentGrowth> {
        self.components
    }
}

/// 对预测掩膜的每个连通区域独立地进行体积约束的迭代膨胀.
///
/// 算法流程依次为:
///
/// 1. 按照 6-相邻规则标记所有前景连通区域.
/// 2. 对每个区域, 反复以半径为 1 的球进行膨胀. 若某一步后体积相对初始体积的增长百分比
///   超过 `max_growth_percent`, 则撤销这一步并停止.
/// 3. 将所有区域的结果取并集.
///
/// 区域之间互不影响: 一个区域膨胀时可以覆盖其他区域的体素, 这些体素同样计入它自身的增长.
/// 输入为全背景时记录一条警告并原样返回.
/// 返回值只包含 `MASK_BACKGROUND` 和 `MASK_FOREGROUND`.
pub fn refine(prediction: ArrayView3<u8>, voxel_volume_ml: f64, max_growth_percent: f64) -> Array3<u8> {
    refine_with_report(prediction, &GrowthLimit::new(voxel_volume_ml, max_growth_percent)).0
}

/// 同 [`refine`], 但同时返回每个连通区域的膨胀记录, 并支持步数上限.
pub fn refine_with_report(prediction: ArrayView3<u8>, limit: &GrowthLimit) -> (Array3<u8>, RefineReport) {
    let Some(areas) = prepare(prediction) else {
        return (prediction.to_owned(), RefineReport::default());
    };
    let shape = prediction.dim();
    let grown = (1u32..)
        .zip(areas)
        .map(|(label, area)| grow(shape, label, area, limit))
        .collect();
    assemble(shape, grown)
}

/// 同 [`refine_with_report`], 但借助 `rayon` 并行地膨胀各个连通区域.
#[cfg(feature = "rayon")]
pub fn par_refine(prediction: ArrayView3<u8>, limit: &GrowthLimit) -> (Array3<u8>, RefineReport) {
    let Some(areas) = prepare(prediction) else {
        return (prediction.to_owned(), RefineReport::default());
    };
    let shape = prediction.dim();
    let grown = areas
        .into_par_iter()
        .enumerate()
        .map(|(i, area)| grow(shape, i as u32 + 1, area, limit))
        .collect();
    assemble(shape, grown)
}

/// 提取连通区域. 输入为全背景时返回 `None`.
fn prepare(prediction: ArrayView3<u8>) -> Option<Vec<Area3d>> {
    if prediction.iter().copied().all(is_background) {
        log::warn!("refinement skipped, prediction is empty");
        return None;
    }
    let areas = components(prediction);
    log::debug!("refining {} connected components", areas.len());
    Some(areas)
}

/// 单个连通区域的膨胀.
fn grow(shape: Idx3d, label: u32, area: Area3d, limit: &GrowthLimit) -> (Frontier, ComponentGrowth) {
    let initial = area.len();
    let mut region = Frontier::new(shape, area);
    let mut steps = 0;
    let stop = loop {
        if limit.step_cap_reached(steps) {
            break StopReason::StepLimit;
        }
        let layer = region.propose();
        if layer.is_empty() {
            break StopReason::Saturated;
        }
        if limit.exceeded(initial, region.len() + layer.len()) {
            break StopReason::ThresholdExceeded;
        }
        region.commit(layer);
        steps += 1;
    };
    log::trace!("component {label}: {initial} -> {} voxels after {steps} steps ({stop:?})", region.len());

    let growth = ComponentGrowth {
        label,
        initial_voxels: initial,
        final_voxels: region.len(),
        accepted_steps: steps,
        initial_ml: initial as f64 * limit.voxel_volume_ml,
        final_ml: region.len() as f64 * limit.voxel_volume_ml,
        stop,
    };
    (region, growth)
}

/// 合并所有区域的膨胀结果.
fn assemble(shape: Idx3d, grown: Vec<(Frontier, ComponentGrowth)>) -> (Array3<u8>, RefineReport) {
    let mut out = Array3::from_elem(shape, MASK_BACKGROUND);
    let mut report = RefineReport {
        components: Vec::with_capacity(grown.len()),
    };
    for (region, growth) in grown {
        for pos in region.voxels() {
            out[*pos] = MASK_FOREGROUND;
        }
        report.components.push(growth);
    }
    (out, report)
}

impl BinaryMask {
    /// 见 [`refine`]. 体素体积由仿射计算, 仿射保持不变.
    pub fn refined(&self, max_growth_percent: f64) -> Self {
        self.with_data(refine(self.data(), self.voxel_ml(), max_growth_percent))
    }
}
