//! 🧠欢迎光临🧠
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Area3d, Areas3d, Idx3d};
pub use crate::{VolumeError, VolumeResult};

pub use crate::data::{Affine, BinaryMask, ScanVolume, SlicingPlane, Volume, VoxelGeometry};
pub use crate::geometry::{tight_bbox, BoundingBox};

pub use crate::normalize::{
    normalize, ClipWindow, ImagingModality, NormalizationMethod, NormalizationParameters,
};
pub use crate::padding::{pad_symmetric, pad_to_multiple};
pub use crate::resample::{resize_volume, Interpolation};

pub use crate::post_proc::{refine, refine_with_report, GrowthLimit, RefineReport};

#[cfg(feature = "rayon")]
pub use crate::post_proc::par_refine;

pub use crate::brain::{extract_brain, BrainExtractor, BrainMask};

pub use crate::consts::gray::{MASK_BACKGROUND, MASK_FOREGROUND};
