use std::collections::BTreeSet;

use tokio::sync::watch;

use crate::engine::ConditionStore;

/// The shared `triggered` condition.
#[derive(Debug)]
pub struct ConditionState {
    triggered: watch::Sender<Option<BTreeSet<String>>>,
}

impl Default for ConditionState {
    fn default() -> Self {
        let (triggered, _) = watch::channel(None);
        Self { triggered }
    }
}

impl ConditionState {
    pub fn subscribe(&self) -> watch::Receiver<Option<BTreeSet<String>>> {
        self.triggered.subscribe()
    }
}

impl ConditionStore for ConditionState {
    fn triggered(&self) -> Option<BTreeSet<String>> {
        self.triggered.borrow().clone()
    }

    fn set_triggered(&self, triggered: Option<BTreeSet<String>>) {
        // Observers only hear about real changes.
        self.triggered.send_if_modified(|current| {
            if *current == triggered {
                false
            } else {
                *current = triggered;
                true
            }
        });
    }
}
