use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::VolumeError;

/// 切片平面. 决定在 padding 和重采样时哪一个数组轴被当作 slab 轴.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SlicingPlane {
    /// 横断面, slab 轴为第 2 轴.
    Axial,

    /// 矢状面, slab 轴为第 0 轴.
    Sagittal,

    /// 冠状面, slab 轴为第 1 轴.
    Coronal,
}

impl SlicingPlane {
    /// 该平面对应的 slab 轴.
    #[inline]
    pub const fn slab_axis(&self) -> usize {
        match self {
            SlicingPlane::Axial => 2,
            SlicingPlane::Sagittal => 0,
            SlicingPlane::Coronal => 1,
        }
    }

    /// 配置文件中使用的名称.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            SlicingPlane::Axial => "axial",
            SlicingPlane::Sagittal => "sagittal",
            SlicingPlane::Coronal => "coronal",
        }
    }
}

impl fmt::Display for SlicingPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SlicingPlane {
    type Err = VolumeError;

    /// 大小写不敏感. 其他名称返回 [`VolumeError::InvalidPlane`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "axial" => Ok(Self::Axial),
            "sagittal" => Ok(Self::Sagittal),
            "coronal" => Ok(Self::Coronal),
            _ => Err(VolumeError::InvalidPlane(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SlicingPlane;
    use crate::VolumeError;

    #[test]
    fn test_plane_parse() {
        assert_eq!("axial".parse::<SlicingPlane>(), Ok(SlicingPlane::Axial));
        assert_eq!(" Sagittal".parse::<SlicingPlane>(), Ok(SlicingPlane::Sagittal));
        assert_eq!("CORONAL".parse::<SlicingPlane>(), Ok(SlicingPlane::Coronal));
        assert_eq!(
            "oblique".parse::<SlicingPlane>(),
            Err(VolumeError::InvalidPlane("oblique".into()))
        );
    }

    #[test]
    fn test_slab_axis() {
        assert_eq!(SlicingPlane::Axial.slab_axis(), 2);
        assert_eq!(SlicingPlane::Sagittal.slab_axis(), 0);
        assert_eq!(SlicingPlane::Coronal.slab_axis(), 1);
        assert_eq!(SlicingPlane::Coronal.to_string(), "coronal");
    }
}
