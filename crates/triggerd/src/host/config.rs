use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::Config;
use crate::engine::ConfigStore;
use crate::engine::PolicySnapshot;

/// The live configuration, swappable on reload.
#[derive(Debug)]
pub struct ConfigHandle {
    config: ArcSwap<Config>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn load(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Replace the configuration. Readers see it on their next load.
    pub fn replace(&self, config: Config) {
        self.config.store(Arc::new(config));
    }
}

impl ConfigStore for ConfigHandle {
    fn policy(&self) -> Option<PolicySnapshot> {
        let config = self.config.load();
        Some(PolicySnapshot {
            triggers: config.view.triggers.clone(),
            default_view: config.view.default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::policy::TriggerAction;
    use crate::engine::ViewName;

    #[test]
    fn test_policy_follows_replacement() {
        let handle = ConfigHandle::new(Config::default());
        let policy = handle.policy().unwrap();
        assert_eq!(policy.default_view, ViewName::Live);
        assert_eq!(policy.triggers.actions.trigger, TriggerAction::Default);

        let replacement = Config::parse(
            r#"
            [view]
            default = "timeline"

            [view.triggers.actions]
            trigger = "media"
            "#,
        )
        .unwrap();
        handle.replace(replacement);

        let policy = handle.policy().unwrap();
        assert_eq!(policy.default_view, ViewName::Timeline);
        assert_eq!(policy.triggers.actions.trigger, TriggerAction::Media);
    }
}
