use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;

use super::capabilities::Capabilities;
use super::event::CameraEvent;
use super::event::EventKind;
use super::event::Fidelity;
use super::policy::TriggerAction;
use super::policy::TriggersPolicy;
use super::policy::UntriggerAction;
use super::state::TriggeredCameras;
use super::timer::Debounce;
use super::timer::UntriggerTimers;
use super::timer::Wake;
use super::timer::WakeReceiver;
use super::view::ViewName;
use super::view::ViewParams;

/// Window for coalescing trigger actions across all cameras.
pub const TRIGGER_DEBOUNCE: Duration = Duration::from_secs(1);

/// Capacity for the event source→engine channel
const EVENT_CHANNEL_SIZE: usize = 256;

/// Trigger engine
///
/// Turns camera events into the set of triggered cameras, debounced navigation
/// and timed untriggers. All state is owned here and mutated only from the
/// task driving the engine, either [`TriggersEngine::run`] or direct calls.
pub struct TriggersEngine {
    capabilities: Capabilities,

    /// Triggered cameras (readers load the Arc, the engine stores a new one)
    triggered: Arc<ArcSwap<TriggeredCameras>>,

    untrigger_timers: UntriggerTimers,

    /// Latest trigger-worthy event waiting for the debounce window to close
    debounce: Debounce<CameraEvent>,

    wake_rx: WakeReceiver,

    /// Events from handles
    event_rx: mpsc::Receiver<CameraEvent>,
}

/// Cloneable access to a running engine: submit events and read trigger state.
#[derive(Clone, Debug)]
pub struct TriggersHandle {
    events: mpsc::Sender<CameraEvent>,
    triggered: Arc<ArcSwap<TriggeredCameras>>,
}

impl TriggersEngine {
    pub fn new(capabilities: Capabilities) -> (Self, TriggersHandle) {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let triggered = Arc::new(ArcSwap::from_pointee(TriggeredCameras::default()));

        let engine = Self {
            capabilities,
            triggered: triggered.clone(),
            untrigger_timers: UntriggerTimers::new(wake_tx.clone()),
            debounce: Debounce::new(TRIGGER_DEBOUNCE, wake_tx),
            wake_rx,
            event_rx,
        };
        let handle = TriggersHandle {
            events: event_tx,
            triggered,
        };
        (engine, handle)
    }

    /// Run the engine until every [`TriggersHandle`] is dropped.
    pub async fn run(mut self) {
        info!("Trigger engine starting");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.handle_camera_event(event),
                    None => break,
                },
                Some(wake) = self.wake_rx.recv() => self.handle_wake(wake),
            }
        }

        info!("Trigger engine shutting down");
    }

    /// React to a camera event.
    ///
    /// Events that arrive before configuration or a selected camera exist are
    /// dropped silently, as are events filtered out by policy.
    pub fn handle_camera_event(&mut self, event: CameraEvent) {
        let Some(policy) = self.capabilities.config.policy() else {
            debug!("No trigger policy, ignoring event from {}", event.camera_id);
            return;
        };
        let Some(selected_camera) = self.capabilities.view.view().and_then(|v| v.camera) else {
            debug!("No selected camera, ignoring event from {}", event.camera_id);
            return;
        };

        let dependent_cameras = self.capabilities.topology.dependent_cameras(&selected_camera);
        if policy.triggers.filter_selected_camera && !dependent_cameras.contains(&event.camera_id) {
            debug!(
                "Ignoring event from {} (not dependent on selected camera {})",
                event.camera_id, selected_camera
            );
            return;
        }

        if event.kind == EventKind::End {
            self.untrigger_timers
                .start(&event.camera_id, policy.triggers.untrigger_after());
            return;
        }

        // Retriggered: the camera is no longer waiting to be untriggered.
        self.untrigger_timers.cancel(&event.camera_id);

        let now = Instant::now();
        if self.update_triggered(|t| t.trigger(&event.camera_id, now)) {
            info!(
                "Camera {} triggered ({} fidelity)",
                event.camera_id, event.fidelity
            );
        } else {
            debug!("Camera {} retriggered", event.camera_id);
        }

        self.publish_condition_state();
        self.debounce.push(event);
    }

    /// Wait for the next timer to fall due and handle it.
    #[cfg(test)]
    pub(crate) async fn process_next_wake(&mut self) {
        if let Some(wake) = self.wake_rx.recv().await {
            self.handle_wake(wake);
        }
    }

    pub(super) fn handle_wake(&mut self, wake: Wake) {
        match wake {
            Wake::Debounce => {
                if let Some(event) = self.debounce.fire() {
                    self.execute_trigger_action(&event);
                }
            }
            Wake::Untrigger { camera_id, token } => {
                if self.untrigger_timers.take_if_current(&camera_id, token) {
                    self.untrigger(&camera_id);
                } else {
                    debug!("Dropping stale untrigger timer {} for {}", token, camera_id);
                }
            }
        }
    }

    /// Run the action for the latest debounced event against the current policy.
    fn execute_trigger_action(&self, event: &CameraEvent) {
        if let Some(policy) = self.capabilities.config.policy() {
            // Frigate may emit events with no new media. Only a switch to live
            // makes sense for those.
            if event.is_high_fidelity_without_media() && !policy.trigger_switches_to_live() {
                debug!(
                    "Suppressing {} action for {}: no new media",
                    policy.triggers.actions.trigger, event.camera_id
                );
                return;
            }

            if self.action_permitted(&policy.triggers) {
                self.navigate_for_trigger(policy.triggers.actions.trigger, event);
            }
        }

        self.capabilities.refresh.request_refresh();
    }

    fn navigate_for_trigger(&self, action: TriggerAction, event: &CameraEvent) {
        let view = &self.capabilities.view;
        match action {
            TriggerAction::Live => {
                info!("Trigger action: live view for {}", event.camera_id);
                view.set_view(ViewParams::new(ViewName::Live, &event.camera_id));
            }
            TriggerAction::Default => {
                info!("Trigger action: default view for {}", event.camera_id);
                view.set_default_view(Some(&event.camera_id));
            }
            TriggerAction::Media if event.fidelity == Fidelity::High => {
                let media = if event.clip {
                    ViewName::Clip
                } else {
                    ViewName::Snapshot
                };
                info!("Trigger action: {} view for {}", media, event.camera_id);
                view.set_view(ViewParams::new(media, &event.camera_id));
            }
            TriggerAction::Media | TriggerAction::None => {}
        }
    }

    fn untrigger(&mut self, camera_id: &str) {
        if let Some(policy) = self.capabilities.config.policy() {
            if policy.triggers.actions.untrigger == UntriggerAction::Default
                && self.action_permitted(&policy.triggers)
            {
                info!("Untrigger action: default view");
                self.capabilities.view.set_default_view(None);
            }
        }

        if self.update_triggered(|t| t.untrigger(camera_id)) {
            info!("Camera {} untriggered", camera_id);
        }
        self.publish_condition_state();
        self.capabilities.refresh.request_refresh();
    }

    fn action_permitted(&self, policy: &TriggersPolicy) -> bool {
        let mode = policy.actions.interaction_mode;
        let permitted = mode.permits(self.capabilities.interaction.has_interaction());
        if !permitted {
            debug!("Interaction mode {} does not permit navigation", mode);
        }
        permitted
    }

    /// Apply `f` to a copy of the triggered set and store the result.
    fn update_triggered<R>(&self, f: impl FnOnce(&mut TriggeredCameras) -> R) -> R {
        let mut triggered = TriggeredCameras::clone(&self.triggered.load());
        let result = f(&mut triggered);
        self.triggered.store(Arc::new(triggered));
        result
    }

    /// Publish the triggered set unless the store already holds the same cameras.
    fn publish_condition_state(&self) {
        let triggered = self.triggered.load().camera_ids();
        let current = self.capabilities.condition.triggered().unwrap_or_default();
        if triggered == current {
            return;
        }

        debug!("Publishing triggered cameras: {:?}", triggered);
        self.capabilities
            .condition
            .set_triggered((!triggered.is_empty()).then_some(triggered));
    }

    pub fn is_triggered(&self) -> bool {
        !self.triggered.load().is_empty()
    }

    pub fn triggered_camera_ids(&self) -> BTreeSet<String> {
        self.triggered.load().camera_ids()
    }

    pub fn most_recently_triggered_camera_id(&self) -> Option<String> {
        self.triggered.load().most_recent().map(str::to_string)
    }

    #[cfg(test)]
    pub(crate) fn has_untrigger_timer(&self, camera_id: &str) -> bool {
        self.untrigger_timers.contains(camera_id)
    }
}

impl TriggersHandle {
    /// Queue an event for the engine. Fails once the engine has stopped.
    pub async fn send_event(
        &self,
        event: CameraEvent,
    ) -> Result<(), mpsc::error::SendError<CameraEvent>> {
        self.events.send(event).await
    }

    /// Get a snapshot of the triggered cameras.
    ///
    /// Clones the `Arc` (atomic refcount bump), essentially free.
    pub fn snapshot(&self) -> Arc<TriggeredCameras> {
        self.triggered.load_full()
    }

    pub fn is_triggered(&self) -> bool {
        !self.triggered.load().is_empty()
    }

    pub fn triggered_camera_ids(&self) -> BTreeSet<String> {
        self.triggered.load().camera_ids()
    }

    pub fn most_recently_triggered_camera_id(&self) -> Option<String> {
        self.triggered.load().most_recent().map(str::to_string)
    }
}

impl std::fmt::Debug for TriggersEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggersEngine")
            .field("triggered", &self.triggered.load().camera_ids())
            .field("debounce_pending", &self.debounce.is_pending())
            .finish_non_exhaustive()
    }
}
