//! 通用常量.

/// 二值掩膜的像素值.
pub mod gray {
    /// 二值掩膜中, 背景的体素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 二值掩膜中, 前景的体素值.
    pub const MASK_FOREGROUND: u8 = 1;

    /// 体素是否是前景? 任何非零值都被视为前景.
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        p != MASK_BACKGROUND
    }

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        p == MASK_BACKGROUND
    }
}

/// 紧致包围盒计算时的前景门限. 体素值 `>= TIGHT_BBOX_THRESHOLD` 被视为前景.
pub const TIGHT_BBOX_THRESHOLD: f64 = 0.2;

/// 立方毫米到毫升的换算系数.
pub const MM3_PER_ML: f64 = 1000.0;

/// 百分位裁剪区间宽度为该值时, 视为不裁剪.
pub const FULL_PERCENTILE_RANGE: f64 = 100.0;
