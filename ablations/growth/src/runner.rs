//! 程序运行函数.

use std::thread;

use neuro_berry::post_proc::{refine_with_report, GrowthLimit};
use neuro_berry::VoxelGeometry;

use crate::phantom;
use crate::result::AblationResult;

/// 参与比较的最大体积增长百分比.
pub const THRESHOLDS: [f64; 6] = [10.0, 25.0, 50.0, 100.0, 200.0, 400.0];

/// 实际运行. 每个阈值一个线程.
pub fn run(thresholds: &[f64]) -> AblationResult {
    let mask = phantom::lesions();
    let voxel_ml = mask.voxel_ml();
    log::info!(
        "Running ablation studies on {} lesions, {} thresholds...",
        phantom::RADII.len(),
        thresholds.len()
    );

    thread::scope(|s| {
        let handles: Vec<_> = thresholds
            .iter()
            .map(|&p| {
                let view = mask.data();
                s.spawn(move || refine_with_report(view, &GrowthLimit::new(voxel_ml, p)).1)
            })
            .collect();

        AblationResult::from_iter(
            thresholds.iter().copied().zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            ),
        )
    })
}
