use serde::{Deserialize, Serialize};

use crate::platform::{TouchSupport, Viewport};

/// User-agent fragments that mark a mobile browser, matched case-insensitively.
const MOBILE_UA_TOKENS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn from_viewport(viewport: Viewport) -> Self {
        if viewport.width > viewport.height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Portrait
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub is_mobile: bool,
    pub orientation: Orientation,
    pub is_touch: bool,
}

impl DeviceState {
    pub fn classify(
        viewport: Viewport,
        user_agent: &str,
        touch: TouchSupport,
        mobile_breakpoint: u32,
    ) -> Self {
        Self {
            is_mobile: viewport.width <= mobile_breakpoint || is_mobile_user_agent(user_agent),
            orientation: Orientation::from_viewport(viewport),
            is_touch: touch.touch_events || touch.max_touch_points > 0,
        }
    }
}

pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let user_agent = user_agent.to_ascii_lowercase();
    MOBILE_UA_TOKENS
        .iter()
        .any(|token| user_agent.contains(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36";

    fn viewport(width: u32, height: u32) -> Viewport {
        Viewport { width, height }
    }

    #[test]
    fn width_breakpoint_is_inclusive() {
        let touch = TouchSupport::default();
        assert!(DeviceState::classify(viewport(768, 1024), DESKTOP_UA, touch, 768).is_mobile);
        assert!(!DeviceState::classify(viewport(769, 1024), DESKTOP_UA, touch, 768).is_mobile);
        assert!(!DeviceState::classify(viewport(1024, 768), DESKTOP_UA, touch, 768).is_mobile);
    }

    #[test]
    fn mobile_user_agent_wins_on_wide_viewport() {
        let ua = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        let state = DeviceState::classify(viewport(1366, 1024), ua, TouchSupport::default(), 768);
        assert!(state.is_mobile);
        assert_eq!(state.orientation, Orientation::Landscape);
    }

    #[test]
    fn user_agent_match_ignores_case() {
        assert!(is_mobile_user_agent("OPERA MINI/4.2"));
        assert!(is_mobile_user_agent("Mozilla/5.0 (Linux; ANDROID 14)"));
        assert!(!is_mobile_user_agent(DESKTOP_UA));
    }

    #[test]
    fn square_viewport_is_portrait() {
        assert_eq!(
            Orientation::from_viewport(viewport(800, 800)),
            Orientation::Portrait
        );
        assert_eq!(
            Orientation::from_viewport(viewport(801, 800)),
            Orientation::Landscape
        );
    }

    #[test]
    fn touch_from_events_or_touch_points() {
        let by_events = TouchSupport {
            touch_events: true,
            max_touch_points: 0,
        };
        let by_points = TouchSupport {
            touch_events: false,
            max_touch_points: 5,
        };

        assert!(DeviceState::classify(viewport(1024, 768), DESKTOP_UA, by_events, 768).is_touch);
        assert!(DeviceState::classify(viewport(1024, 768), DESKTOP_UA, by_points, 768).is_touch);
        assert!(
            !DeviceState::classify(viewport(1024, 768), DESKTOP_UA, TouchSupport::default(), 768)
                .is_touch
        );
    }
}
