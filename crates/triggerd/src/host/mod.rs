//! In-process implementations of the engine's collaborators.
//!
//! A [`Host`] owns one of each and hands them to the engine as
//! [`Capabilities`]. The API layer reads and drives the same instances.

mod condition;
mod config;
mod interaction;
mod refresh;
mod topology;
mod view;

use std::sync::Arc;
use std::time::Duration;

pub use condition::ConditionState;
pub use config::ConfigHandle;
pub use interaction::Interactions;
pub use refresh::Refresher;
pub use topology::Topology;
pub use view::ViewState;

use crate::config::Config;
use crate::engine::Capabilities;

#[derive(Debug, Clone)]
pub struct Host {
    pub config: Arc<ConfigHandle>,
    pub view: Arc<ViewState>,
    pub topology: Arc<Topology>,
    pub condition: Arc<ConditionState>,
    pub interactions: Arc<Interactions>,
    pub refresher: Arc<Refresher>,
}

impl Host {
    pub fn new(config: Config) -> Self {
        let interaction_window = Duration::from_secs(config.view.interaction_seconds);
        let config = Arc::new(ConfigHandle::new(config));

        Self {
            view: Arc::new(ViewState::new(config.clone())),
            topology: Arc::new(Topology::new(config.clone())),
            condition: Arc::new(ConditionState::default()),
            interactions: Arc::new(Interactions::new(interaction_window)),
            refresher: Arc::new(Refresher::default()),
            config,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            config: self.config.clone(),
            view: self.view.clone(),
            topology: self.topology.clone(),
            condition: self.condition.clone(),
            interaction: self.interactions.clone(),
            refresh: self.refresher.clone(),
        }
    }
}
