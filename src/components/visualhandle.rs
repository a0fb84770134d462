//! Handle to the scene node that renders an entity.
//!
//! The scene collaborator owns the visual resource; the entity only keeps
//! the handle so systems can read and write its position.

use bevy_ecs::prelude::Component;
use glam::Vec3;

use crate::resources::scene::SceneNode;

#[derive(Component)]
pub struct VisualHandle {
    node: Box<dyn SceneNode>,
}

impl VisualHandle {
    pub fn new(node: Box<dyn SceneNode>) -> Self {
        VisualHandle { node }
    }

    pub fn position(&self) -> Vec3 {
        self.node.position()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.node.set_position(position);
    }
}

impl std::fmt::Debug for VisualHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualHandle")
            .field("position", &self.node.position())
            .finish()
    }
}
