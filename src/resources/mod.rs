pub mod geometry;
pub mod primitives;
pub mod texture;
pub mod version_tracker;

pub use geometry::{CompactSubGeometry, StridedSliceMut};
pub use texture::{Texture2D, TextureRef};
pub use version_tracker::ChangeTracker;
