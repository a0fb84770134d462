//! Bridge to the host scene that renders floating entities.
//!
//! The core never builds layout, colors or alignment. It asks the scene for a
//! node per spawned item and afterwards only reads and writes that node's
//! position.
//!
//! [`HeadlessScene`] is the implementation shipped with the binary: it keeps
//! positions in memory and logs what a renderer would draw.

use std::path::Path;

use bevy_ecs::prelude::Resource;
use fastrand::Rng;
use glam::Vec3;
use log::debug;

/// One node in the host scene.
pub trait SceneNode: Send + Sync {
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
}

/// Factory for scene nodes.
pub trait Scene: Send + Sync {
    /// Create the visual for one item and return a handle to it.
    fn create_visual_handle(&mut self, text: &str, image_path: &Path) -> Box<dyn SceneNode>;
}

/// Resource holding the active scene.
#[derive(Resource)]
pub struct SceneBridge {
    scene: Box<dyn Scene>,
}

impl SceneBridge {
    pub fn new(scene: impl Scene + 'static) -> Self {
        Self {
            scene: Box::new(scene),
        }
    }

    pub fn create_visual_handle(&mut self, text: &str, image_path: &Path) -> Box<dyn SceneNode> {
        self.scene.create_visual_handle(text, image_path)
    }
}

/// Start point of new nodes, below the viewer.
const SPAWN_ORIGIN: Vec3 = Vec3::new(0.05, -0.25, 0.0);
/// Half extents of the random jitter around [`SPAWN_ORIGIN`].
const SPAWN_JITTER: Vec3 = Vec3::new(0.075, 0.0, 0.2);

struct HeadlessNode {
    id: u64,
    position: Vec3,
}

impl SceneNode for HeadlessNode {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }
}

impl Drop for HeadlessNode {
    fn drop(&mut self) {
        debug!("node #{} released at {:?}", self.id, self.position);
    }
}

/// Scene without a renderer.
pub struct HeadlessScene {
    next_id: u64,
    rng: Rng,
}

impl Default for HeadlessScene {
    fn default() -> Self {
        Self::new(Rng::new())
    }
}

impl HeadlessScene {
    pub fn new(rng: Rng) -> Self {
        Self { next_id: 0, rng }
    }

    /// Nodes created so far.
    pub fn created(&self) -> u64 {
        self.next_id
    }

    fn jitter(&mut self) -> Vec3 {
        let mut unit = || self.rng.f32() * 2.0 - 1.0;
        Vec3::new(unit(), 0.0, unit()) * SPAWN_JITTER
    }
}

impl Scene for HeadlessScene {
    fn create_visual_handle(&mut self, text: &str, image_path: &Path) -> Box<dyn SceneNode> {
        self.next_id += 1;
        let position = SPAWN_ORIGIN + self.jitter();
        debug!(
            "node #{} at {:?} image={} text={:?}",
            self.next_id,
            position,
            image_path.display(),
            text
        );
        Box::new(HeadlessNode {
            id: self.next_id,
            position,
        })
    }
}
