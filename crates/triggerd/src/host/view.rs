use std::sync::Arc;

use tokio::sync::watch;

use super::ConfigHandle;
use crate::engine::View;
use crate::engine::ViewController;
use crate::engine::ViewParams;

/// The current dashboard view, observable through a watch channel.
#[derive(Debug)]
pub struct ViewState {
    config: Arc<ConfigHandle>,
    view: watch::Sender<View>,
}

impl ViewState {
    /// Start on the configured default view and initial camera.
    pub fn new(config: Arc<ConfigHandle>) -> Self {
        let initial = {
            let config = config.load();
            View {
                view: config.view.default,
                camera: config.initial_camera(),
            }
        };
        let (view, _) = watch::channel(initial);
        Self { config, view }
    }

    pub fn current(&self) -> View {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }
}

impl ViewController for ViewState {
    fn view(&self) -> Option<View> {
        Some(self.current())
    }

    fn set_view(&self, params: ViewParams) {
        tracing::debug!("View {} on camera {}", params.view, params.camera);
        self.view.send_replace(View {
            view: params.view,
            camera: Some(params.camera),
        });
    }

    fn set_default_view(&self, camera: Option<&str>) {
        let default = self.config.load().view.default;
        self.view.send_modify(|view| {
            view.view = default;
            if let Some(camera) = camera {
                view.camera = Some(camera.to_string());
            }
        });
        tracing::debug!("Default view {}", default);
    }
}
