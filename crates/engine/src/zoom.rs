use serde::Deserialize;

pub const ZOOM_BASE_SHIFT: u32 = 2;
/// Number of finest-zoom pixels per normal-zoom pixel along one axis.
pub const ZOOM_BASE: i32 = 1 << ZOOM_BASE_SHIFT;

/// Zoom level GUI sprites (cursor, widgets) are drawn at.
pub const ZOOM_GUI: ZoomLevel = ZoomLevel::In4x;

/// Power-of-two scale between virtual coordinates and device pixels.
/// `In4x` is the finest level; sprites are authored at that resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomLevel {
    #[default]
    In4x = 0,
    In2x = 1,
    Normal = 2,
    Out2x = 3,
    Out4x = 4,
    Out8x = 5,
}

impl ZoomLevel {
    pub const MIN: ZoomLevel = ZoomLevel::In4x;
    pub const MAX: ZoomLevel = ZoomLevel::Out8x;

    pub const fn shift(self) -> u32 {
        self as u32
    }

    pub const fn from_shift(shift: u32) -> Option<ZoomLevel> {
        match shift {
            0 => Some(ZoomLevel::In4x),
            1 => Some(ZoomLevel::In2x),
            2 => Some(ZoomLevel::Normal),
            3 => Some(ZoomLevel::Out2x),
            4 => Some(ZoomLevel::Out4x),
            5 => Some(ZoomLevel::Out8x),
            _ => None,
        }
    }

    /// Moves `steps` levels towards finer detail (positive) or coarser
    /// detail (negative), saturating at both ends.
    pub fn stepped(self, steps: i32) -> ZoomLevel {
        let target = (self.shift() as i32 - steps).clamp(Self::MIN as i32, Self::MAX as i32);
        ZoomLevel::from_shift(target as u32).unwrap_or(self)
    }
}

pub const fn scale_by_zoom(value: i32, zoom: ZoomLevel) -> i32 {
    value << zoom.shift()
}

/// Unscale, rounding up.
pub const fn unscale_by_zoom(value: i32, zoom: ZoomLevel) -> i32 {
    (value + (1 << zoom.shift()) - 1) >> zoom.shift()
}

/// Unscale, rounding down.
pub const fn unscale_by_zoom_lower(value: i32, zoom: ZoomLevel) -> i32 {
    value >> zoom.shift()
}
