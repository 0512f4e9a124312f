//! Trigger policy as read from configuration.
//!
//! The engine receives a fresh [`PolicySnapshot`] on every read and never
//! mutates it.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use strum::Display;

use super::view::ViewName;

/// What to do when a camera is triggered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TriggerAction {
    /// Navigate to the default view for the triggered camera.
    #[default]
    Default,
    /// Navigate to the live view for the triggered camera.
    Live,
    /// Navigate to the clip or snapshot of the triggering event.
    Media,
    None,
}

/// What to do when a camera is untriggered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UntriggerAction {
    /// Navigate back to the default view.
    Default,
    #[default]
    None,
}

/// Which interaction state allows trigger actions to navigate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InteractionMode {
    All,
    /// Only while a user is interacting.
    Active,
    /// Only while nobody is interacting.
    #[default]
    Inactive,
}

impl InteractionMode {
    pub fn permits(self, has_interaction: bool) -> bool {
        match self {
            InteractionMode::All => true,
            InteractionMode::Active => has_interaction,
            InteractionMode::Inactive => !has_interaction,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerActions {
    pub trigger: TriggerAction,
    pub untrigger: UntriggerAction,
    pub interaction_mode: InteractionMode,
}

/// Trigger behaviour for the dashboard.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggersPolicy {
    /// Ignore events from cameras unrelated to the selected camera.
    pub filter_selected_camera: bool,

    /// Quiet period after an end event before a camera is untriggered.
    pub untrigger_seconds: u64,

    pub actions: TriggerActions,
}

impl TriggersPolicy {
    pub fn untrigger_after(&self) -> Duration {
        Duration::from_secs(self.untrigger_seconds)
    }
}

/// Everything the engine reads from the configuration store in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySnapshot {
    pub triggers: TriggersPolicy,
    pub default_view: ViewName,
}

impl PolicySnapshot {
    /// Whether the configured trigger action ends up on the live view.
    pub fn trigger_switches_to_live(&self) -> bool {
        match self.triggers.actions.trigger {
            TriggerAction::Live => true,
            TriggerAction::Default => self.default_view == ViewName::Live,
            TriggerAction::Media | TriggerAction::None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_mode_gate() {
        assert!(InteractionMode::All.permits(true));
        assert!(InteractionMode::All.permits(false));
        assert!(InteractionMode::Active.permits(true));
        assert!(!InteractionMode::Active.permits(false));
        assert!(!InteractionMode::Inactive.permits(true));
        assert!(InteractionMode::Inactive.permits(false));
    }

    #[test]
    fn test_defaults() {
        let policy = TriggersPolicy::default();
        assert!(!policy.filter_selected_camera);
        assert_eq!(policy.untrigger_after(), Duration::ZERO);
        assert_eq!(policy.actions.trigger, TriggerAction::Default);
        assert_eq!(policy.actions.untrigger, UntriggerAction::None);
        assert_eq!(policy.actions.interaction_mode, InteractionMode::Inactive);
    }

    #[test]
    fn test_trigger_switches_to_live() {
        let mut snapshot = PolicySnapshot {
            triggers: TriggersPolicy::default(),
            default_view: ViewName::Live,
        };
        assert!(snapshot.trigger_switches_to_live());

        snapshot.default_view = ViewName::Clips;
        assert!(!snapshot.trigger_switches_to_live());

        snapshot.triggers.actions.trigger = TriggerAction::Live;
        assert!(snapshot.trigger_switches_to_live());

        snapshot.triggers.actions.trigger = TriggerAction::Media;
        assert!(!snapshot.trigger_switches_to_live());
    }

    #[test]
    fn test_parse_partial_policy() {
        let policy: TriggersPolicy = toml::from_str(
            r#"
            untrigger_seconds = 10

            [actions]
            trigger = "media"
            "#,
        )
        .unwrap();
        assert_eq!(policy.untrigger_seconds, 10);
        assert_eq!(policy.actions.trigger, TriggerAction::Media);
        assert_eq!(policy.actions.interaction_mode, InteractionMode::Inactive);
    }
}
