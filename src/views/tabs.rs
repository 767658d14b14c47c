use serde::{Deserialize, Serialize};

/// Horizontal travel (in px) a swipe needs before it switches tabs.
pub const SWIPE_THRESHOLD_PX: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Logs,
    Map,
}

impl Tab {
    /// Tab shown after a swipe of `delta_x` px (end minus start).
    ///
    /// Leftward swipes move from the list to the map, rightward swipes back.
    pub fn after_swipe(self, delta_x: f64) -> Tab {
        match self {
            Tab::Logs if delta_x < -SWIPE_THRESHOLD_PX => Tab::Map,
            Tab::Map if delta_x > SWIPE_THRESHOLD_PX => Tab::Logs,
            current => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swipe_left_opens_map() {
        assert_eq!(Tab::Logs.after_swipe(-80.0), Tab::Map);
        assert_eq!(Tab::Map.after_swipe(-80.0), Tab::Map);
    }

    #[test]
    fn test_swipe_right_returns_to_logs() {
        assert_eq!(Tab::Map.after_swipe(51.0), Tab::Logs);
        assert_eq!(Tab::Logs.after_swipe(200.0), Tab::Logs);
    }

    #[test]
    fn test_short_swipe_is_ignored() {
        assert_eq!(Tab::Logs.after_swipe(-50.0), Tab::Logs);
        assert_eq!(Tab::Map.after_swipe(50.0), Tab::Map);
    }

    #[test]
    fn test_tab_wire_names() {
        assert_eq!(serde_json::to_value(Tab::Map).unwrap(), "map");
        assert_eq!(serde_json::from_str::<Tab>("\"logs\"").unwrap(), Tab::Logs);
    }
}
