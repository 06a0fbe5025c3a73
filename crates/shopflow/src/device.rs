//! Device emulation profiles applied to a session's page.

use serde::{Deserialize, Serialize};

/// Viewport, pixel ratio and user agent for an emulated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Device name
    pub name: String,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Device scale factor
    pub device_scale_factor: f64,
    /// Is mobile device
    pub is_mobile: bool,
    /// Has touch support
    pub has_touch: bool,
    /// User agent override
    pub user_agent: String,
}

impl DeviceProfile {
    /// iPhone 6
    #[must_use]
    pub fn iphone_6() -> Self {
        Self {
            name: "iPhone 6".to_string(),
            viewport_width: 375,
            viewport_height: 667,
            device_scale_factor: 2.0,
            is_mobile: true,
            has_touch: true,
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 11_0 like Mac OS X) \
                AppleWebKit/604.1.38 (KHTML, like Gecko) Version/11.0 Mobile/15A372 Safari/604.1"
                .to_string(),
        }
    }

    /// iPhone 14 Pro
    #[must_use]
    pub fn iphone_14_pro() -> Self {
        Self {
            name: "iPhone 14 Pro".to_string(),
            viewport_width: 393,
            viewport_height: 852,
            device_scale_factor: 3.0,
            is_mobile: true,
            has_touch: true,
            user_agent:
                "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15"
                    .to_string(),
        }
    }

    /// Desktop 1080p
    #[must_use]
    pub fn desktop_1080p() -> Self {
        Self {
            name: "Desktop 1080p".to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iphone_6() {
        let device = DeviceProfile::iphone_6();
        assert_eq!(device.viewport_width, 375);
        assert_eq!(device.viewport_height, 667);
        assert!(device.is_mobile);
        assert!(device.has_touch);
    }

    #[test]
    fn test_desktop_is_not_mobile() {
        let device = DeviceProfile::desktop_1080p();
        assert!(!device.is_mobile);
        assert!(!device.has_touch);
    }
}
