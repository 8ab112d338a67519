use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Icon tag shown next to a preset. Purely display metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PresetIcon {
    #[default]
    Timer,
    Eye,
    Brain,
    Bolt,
    Flame,
    Moon,
    Sun,
    Star,
    Heart,
    Leaf,
    Drop,
    Mountain,
}

impl std::str::FromStr for PresetIcon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
            .map_err(|_| format!("unknown icon: {s}"))
    }
}

/// Phase of the Pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(self) -> bool {
        !matches!(self, Phase::Focus)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::ShortBreak => "Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

/// A named timer configuration.
///
/// All durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub icon: PresetIcon,
    #[serde(default)]
    pub is_default: bool,
    pub focus_duration: u64,
    pub break_duration: u64,
    pub number_of_sessions: u32,
    #[serde(default)]
    pub long_break_duration: u64,
    /// Every k-th completed focus segment earns a long break.
    /// `None` keeps the plain focus/break alternation.
    #[serde(default)]
    pub long_break_interval: Option<u32>,
}

impl Preset {
    /// A user preset without a long break. The id is left nil so the catalog
    /// assigns one on insert.
    pub fn new(name: impl Into<String>, focus_duration: u64, break_duration: u64, number_of_sessions: u32) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            icon: PresetIcon::Timer,
            is_default: false,
            focus_duration,
            break_duration,
            number_of_sessions,
            long_break_duration: 0,
            long_break_interval: None,
        }
    }

    pub fn with_icon(mut self, icon: PresetIcon) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_long_break(mut self, duration: u64, every: u32) -> Self {
        self.long_break_duration = duration;
        self.long_break_interval = Some(every);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        if self.focus_duration == 0 {
            return Err(ValidationError::invalid("focus_duration", "must be greater than zero"));
        }
        if self.number_of_sessions == 0 {
            return Err(ValidationError::invalid("number_of_sessions", "must be at least 1"));
        }
        if self.long_break_interval == Some(0) {
            return Err(ValidationError::invalid("long_break_interval", "must be at least 1"));
        }
        Ok(())
    }

    /// The break that follows the `completed`-th focus segment of a cycle (1-based).
    pub fn break_after(&self, completed: u32) -> (Phase, u64) {
        match self.long_break_interval {
            Some(every) if every > 0 && completed % every == 0 && self.long_break_duration > 0 => {
                (Phase::LongBreak, self.long_break_duration)
            }
            _ => (Phase::ShortBreak, self.break_duration),
        }
    }

    pub fn phase_duration(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Focus => self.focus_duration,
            Phase::ShortBreak => self.break_duration,
            Phase::LongBreak => self.long_break_duration,
        }
    }

    pub fn total_focus_time(&self) -> u64 {
        self.focus_duration
            .saturating_mul(u64::from(self.number_of_sessions))
    }

    pub fn total_break_time(&self) -> u64 {
        (1..self.number_of_sessions)
            .map(|i| self.break_after(i).1)
            .sum()
    }

    pub fn total_duration(&self) -> u64 {
        self.total_focus_time() + self.total_break_time()
    }

    /// Human-readable focus length: "1h 30m", "4m 30s", "25m".
    pub fn formatted_duration(&self) -> String {
        format_compact(self.focus_duration)
    }

    /// "25m × 4" style one-liner for menus.
    pub fn summary(&self) -> String {
        format!("{} × {}", self.formatted_duration(), self.number_of_sessions)
    }
}

pub(crate) fn format_compact(secs: u64) -> String {
    let minutes = secs / 60;
    let seconds = secs % 60;
    if minutes >= 60 {
        let hours = minutes / 60;
        let rest = minutes % 60;
        return if rest > 0 {
            format!("{hours}h {rest}m")
        } else {
            format!("{hours}h")
        };
    }
    if seconds > 0 && minutes < 10 {
        return format!("{minutes}m {seconds}s");
    }
    format!("{minutes}m")
}

const FOCUS_ID: u128 = 0x6f1b_3c2e_0b8e_4d4a_9b1f_5e0c_0000_0001;
const DEEP_WORK_ID: u128 = 0x6f1b_3c2e_0b8e_4d4a_9b1f_5e0c_0000_0002;
const SPRINT_ID: u128 = 0x6f1b_3c2e_0b8e_4d4a_9b1f_5e0c_0000_0003;
const MARATHON_ID: u128 = 0x6f1b_3c2e_0b8e_4d4a_9b1f_5e0c_0000_0004;

/// The shipped presets, in display order. Ids are fixed so customisations
/// stored by the catalog keep pointing at the same entry across releases.
pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: Uuid::from_u128(FOCUS_ID),
            name: "Focus".into(),
            icon: PresetIcon::Eye,
            is_default: true,
            focus_duration: 25 * 60,
            break_duration: 5 * 60,
            number_of_sessions: 4,
            long_break_duration: 0,
            long_break_interval: None,
        },
        Preset {
            id: Uuid::from_u128(DEEP_WORK_ID),
            name: "Deep Work".into(),
            icon: PresetIcon::Brain,
            is_default: true,
            focus_duration: 50 * 60,
            break_duration: 10 * 60,
            number_of_sessions: 2,
            long_break_duration: 0,
            long_break_interval: None,
        },
        Preset {
            id: Uuid::from_u128(SPRINT_ID),
            name: "Sprint".into(),
            icon: PresetIcon::Bolt,
            is_default: true,
            focus_duration: 15 * 60,
            break_duration: 3 * 60,
            number_of_sessions: 6,
            long_break_duration: 15 * 60,
            long_break_interval: Some(3),
        },
        Preset {
            id: Uuid::from_u128(MARATHON_ID),
            name: "Marathon".into(),
            icon: PresetIcon::Mountain,
            is_default: true,
            focus_duration: 90 * 60,
            break_duration: 20 * 60,
            number_of_sessions: 2,
            long_break_duration: 0,
            long_break_interval: None,
        },
    ]
}

impl Default for Preset {
    fn default() -> Self {
        builtin_presets().remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_totals() {
        let p = Preset::new("Work", 1500, 300, 4);
        assert_eq!(p.total_focus_time(), 6000);
        assert_eq!(p.total_break_time(), 900);
        assert_eq!(p.total_duration(), 6900);
    }

    #[test]
    fn single_session_has_no_breaks() {
        let p = Preset::new("Once", 600, 300, 1);
        assert_eq!(p.total_break_time(), 0);
    }

    #[test]
    fn long_break_lands_on_interval() {
        let p = Preset::new("Sprint", 900, 180, 6).with_long_break(900, 3);
        assert_eq!(p.break_after(1), (Phase::ShortBreak, 180));
        assert_eq!(p.break_after(3), (Phase::LongBreak, 900));
        // breaks after sessions 1..=5: four short, one long
        assert_eq!(p.total_break_time(), 4 * 180 + 900);
    }

    #[test]
    fn validation_rejects_zero_focus_and_sessions() {
        assert!(Preset::new("x", 0, 60, 1).validate().is_err());
        assert!(Preset::new("x", 60, 60, 0).validate().is_err());
        assert!(Preset::new(" ", 60, 60, 1).validate().is_err());
        assert!(Preset::new("x", 60, 0, 1).validate().is_ok());
    }

    #[test]
    fn formatted_durations() {
        assert_eq!(Preset::new("a", 25 * 60, 0, 4).summary(), "25m × 4");
        assert_eq!(format_compact(90 * 60), "1h 30m");
        assert_eq!(format_compact(120 * 60), "2h");
        assert_eq!(format_compact(270), "4m 30s");
    }

    #[test]
    fn icon_parses_from_lowercase_name() {
        assert_eq!("Brain".parse::<PresetIcon>().unwrap(), PresetIcon::Brain);
        assert!("rocket".parse::<PresetIcon>().is_err());
    }

    #[test]
    fn builtins_have_stable_unique_ids() {
        let presets = builtin_presets();
        assert_eq!(presets.len(), 4);
        assert!(presets.iter().all(|p| p.is_default && p.validate().is_ok()));
        let again = builtin_presets();
        assert_eq!(presets[0].id, again[0].id);
        let mut ids: Vec<_> = presets.iter().map(|p| p.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
