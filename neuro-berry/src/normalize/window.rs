#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 强度裁剪窗口, 由下限和上限 (均包含) 描述.
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipWindow {
    low: f32,
    high: f32,
}

impl ClipWindow {
    /// 由下限和上限构建.
    ///
    /// 两者都必须是有限值且 `low <= high`, 否则返回 `None`.
    pub fn new(low: f32, high: f32) -> Option<ClipWindow> {
        (low.is_finite() && high.is_finite() && low <= high).then_some(Self { low, high })
    }

    /// 由窗位 (level) 和窗宽 (width) 构建. 窗宽不能为负.
    #[inline]
    pub fn from_level_width(level: f32, width: f32) -> Option<ClipWindow> {
        if width < 0.0 {
            return None;
        }
        Self::new(level - width / 2.0, level + width / 2.0)
    }

    /// 不做任何裁剪的窗口.
    #[inline]
    pub const fn unbounded() -> ClipWindow {
        Self {
            low: f32::MIN,
            high: f32::MAX,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.low
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.high
    }

    /// 窗位.
    #[inline]
    pub fn level(&self) -> f32 {
        self.low / 2.0 + self.high / 2.0
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.high - self.low
    }

    /// `(lower_bound, upper_bound)`.
    #[inline]
    pub fn bounds(&self) -> (f32, f32) {
        (self.low, self.high)
    }

    /// 将 `v` 截断到窗口内. NaN 保持不变.
    #[inline]
    pub fn clip(&self, v: f32) -> f32 {
        v.clamp(self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::ClipWindow;

    #[test]
    fn test_invalid_window() {
        assert!(ClipWindow::new(1.0, 0.0).is_none());
        assert!(ClipWindow::new(f32::NAN, 0.0).is_none());
        assert!(ClipWindow::new(0.0, f32::INFINITY).is_none());
        assert!(ClipWindow::from_level_width(0.0, -1.0).is_none());
        assert!(ClipWindow::new(3.0, 3.0).is_some());
    }

    #[test]
    fn test_window_generic() {
        // [60, 100]
        let w = ClipWindow::from_level_width(80.0, 40.0).unwrap();
        assert_eq!(w.bounds(), (60.0, 100.0));
        assert_eq!(w.level(), 80.0);
        assert_eq!(w.width(), 40.0);
        assert_eq!(w.clip(50.0), 60.0);
        assert_eq!(w.clip(70.0), 70.0);
        assert_eq!(w.clip(f32::MAX), 100.0);
        assert!(w.clip(f32::NAN).is_nan());

        let u = ClipWindow::unbounded();
        assert_eq!(u.clip(-1e30), -1e30);
    }
}
