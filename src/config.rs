//! Scene settings (spec §6 "Configuration").

use crate::error::{CoreError, CoreResult};
use crate::Color;

/// Expansion of a single bounds-margin value into the four-sided form, or an
/// explicit per-side override (spec §6: "single float or [top,right,bottom,left]").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsMargin {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl BoundsMargin {
    pub fn uniform(margin: f32) -> Self {
        Self {
            top: margin,
            right: margin,
            bottom: margin,
            left: margin,
        }
    }

    pub fn sides(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

impl Default for BoundsMargin {
    fn default() -> Self {
        Self::uniform(100.0)
    }
}

impl From<f32> for BoundsMargin {
    fn from(value: f32) -> Self {
        Self::uniform(value)
    }
}

impl From<[f32; 4]> for BoundsMargin {
    fn from(value: [f32; 4]) -> Self {
        Self::sides(value[0], value[1], value[2], value[3])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureMemorySettings {
    pub byte_threshold: u64,
    pub cleanup_interval_ms: u32,
}

impl Default for TextureMemorySettings {
    fn default() -> Self {
        Self {
            byte_threshold: 128 * 1024 * 1024,
            cleanup_interval_ms: 1000,
        }
    }
}

/// Every configuration knob spec §6 enumerates.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub app_width: u32,
    pub app_height: u32,
    pub device_logical_pixel_ratio: f32,
    pub device_physical_pixel_ratio: f32,
    pub clear_color: Color,
    pub bounds_margin: BoundsMargin,
    pub texture_memory: TextureMemorySettings,
    pub num_image_workers: u32,
    pub fps_update_interval_ms: u32,
    pub target_frame_time_ms: u32,
    pub enable_context_spy: bool,
    pub force_webgl2: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_width: 1920,
            app_height: 1080,
            device_logical_pixel_ratio: 1.0,
            device_physical_pixel_ratio: 1.0,
            clear_color: Color::TRANSPARENT,
            bounds_margin: BoundsMargin::default(),
            texture_memory: TextureMemorySettings::default(),
            num_image_workers: 2,
            fps_update_interval_ms: 0,
            target_frame_time_ms: 16,
            enable_context_spy: false,
            force_webgl2: false,
        }
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Validates the numeric invariants spec §6 implies ("integers > 0",
    /// "positive floats") rather than panicking on a bad value supplied at
    /// the API boundary.
    pub fn validate(&self) -> CoreResult<()> {
        if self.app_width == 0 || self.app_height == 0 {
            return Err(CoreError::InvalidConfig(
                "app_width and app_height must be > 0".into(),
            ));
        }
        if self.device_logical_pixel_ratio <= 0.0 || self.device_physical_pixel_ratio <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "pixel ratios must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

macro_rules! setter {
    ($field:ident, $ty:ty) => {
        pub fn $field(mut self, value: $ty) -> Self {
            self.settings.$field = value;
            self
        }
    };
}

impl SettingsBuilder {
    setter!(app_width, u32);
    setter!(app_height, u32);
    setter!(device_logical_pixel_ratio, f32);
    setter!(device_physical_pixel_ratio, f32);
    setter!(clear_color, Color);
    setter!(num_image_workers, u32);
    setter!(fps_update_interval_ms, u32);
    setter!(target_frame_time_ms, u32);
    setter!(enable_context_spy, bool);
    setter!(force_webgl2, bool);

    pub fn bounds_margin(mut self, value: impl Into<BoundsMargin>) -> Self {
        self.settings.bounds_margin = value.into();
        self
    }

    pub fn texture_memory(mut self, value: TextureMemorySettings) -> Self {
        self.settings.texture_memory = value;
        self
    }

    pub fn build(self) -> CoreResult<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_app_width_is_rejected() {
        let result = Settings::builder().app_width(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn bounds_margin_accepts_uniform_and_per_side() {
        let uniform: BoundsMargin = 10.0.into();
        assert_eq!(uniform.top, 10.0);
        let sides: BoundsMargin = [1.0, 2.0, 3.0, 4.0].into();
        assert_eq!((sides.top, sides.right, sides.bottom, sides.left), (1.0, 2.0, 3.0, 4.0));
    }
}
