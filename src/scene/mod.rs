//! Scene Module
//!
//! What the view renders:
//! - Scene: root container owning a partition and its change listeners
//! - Partition: renderables and lights, traversed into an entity collector
//! - Camera: world transform plus a Lens
//! - Lens: projection, aspect ratio, viewport and scissor rect
//! - Light: directional, point and probe lights

pub mod camera;
pub mod lens;
pub mod light;
pub mod partition;
pub mod scene;

pub use camera::{Camera, Frustum, Ray};
pub use lens::{Lens, Projection};
pub use light::{Light, LightKind};
pub use partition::{Partition, PartitionId, Renderable};
pub use scene::Scene;

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::new_key_type;

pub type SharedCamera = Rc<RefCell<Camera>>;
pub type SharedScene = Rc<RefCell<Scene>>;

new_key_type! {
    pub struct EntityKey;
    pub struct LightKey;
    pub struct ListenerKey;
}
