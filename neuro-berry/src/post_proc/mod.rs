//! 后处理流程集合.

mod refine;

pub use refine::{refine, refine_with_report, ComponentGrowth, GrowthLimit, RefineReport, StopReason};

#[cfg(feature = "rayon")]
pub use refine::par_refine;
