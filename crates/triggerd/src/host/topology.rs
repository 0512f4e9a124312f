use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::ConfigHandle;
use crate::config::CameraConfig;
use crate::engine::CameraTopology;

/// Camera grouping from the `[cameras]` configuration.
#[derive(Debug)]
pub struct Topology {
    config: Arc<ConfigHandle>,
}

impl Topology {
    pub fn new(config: Arc<ConfigHandle>) -> Self {
        Self { config }
    }
}

impl CameraTopology for Topology {
    fn dependent_cameras(&self, camera_id: &str) -> BTreeSet<String> {
        dependent_cameras(&self.config.load().cameras, camera_id)
    }
}

/// The camera plus every camera reachable through `dependencies`.
///
/// A camera with `all_cameras` set pulls in every configured camera.
fn dependent_cameras(
    cameras: &BTreeMap<String, CameraConfig>,
    camera_id: &str,
) -> BTreeSet<String> {
    let mut dependents = BTreeSet::new();
    if !cameras.contains_key(camera_id) {
        return dependents;
    }

    let mut pending = vec![camera_id.to_string()];
    while let Some(id) = pending.pop() {
        let Some(camera) = cameras.get(&id) else {
            continue;
        };
        if camera.all_cameras {
            return cameras.keys().cloned().collect();
        }
        if dependents.insert(id) {
            pending.extend(
                camera
                    .dependencies
                    .iter()
                    .filter(|d| !dependents.contains(*d))
                    .cloned(),
            );
        }
    }
    dependents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn cameras(toml: &str) -> BTreeMap<String, CameraConfig> {
        Config::parse(toml).unwrap().cameras
    }

    fn ids(cameras: &[&str]) -> BTreeSet<String> {
        cameras.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_camera_without_dependencies() {
        let cameras = cameras("[cameras.a]\n[cameras.b]");
        assert_eq!(dependent_cameras(&cameras, "a"), ids(&["a"]));
    }

    #[test]
    fn test_transitive_dependencies_with_cycle() {
        let cameras = cameras(
            r#"
            [cameras.a]
            dependencies = ["b"]
            [cameras.b]
            dependencies = ["c", "a"]
            [cameras.c]
            [cameras.d]
            "#,
        );
        assert_eq!(dependent_cameras(&cameras, "a"), ids(&["a", "b", "c"]));
        assert_eq!(dependent_cameras(&cameras, "c"), ids(&["c"]));
    }

    #[test]
    fn test_all_cameras() {
        let cameras = cameras(
            r#"
            [cameras.a]
            dependencies = ["b"]
            [cameras.b]
            all_cameras = true
            [cameras.c]
            "#,
        );
        assert_eq!(dependent_cameras(&cameras, "a"), ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_unknown_camera() {
        let cameras = cameras("[cameras.a]");
        assert!(dependent_cameras(&cameras, "z").is_empty());
    }
}
