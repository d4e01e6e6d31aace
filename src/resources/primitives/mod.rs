pub mod primitive;
pub mod sphere;

pub use primitive::{Primitive, PrimitiveState};
pub use sphere::{create_sphere, SphereGeometry, SphereOptions};
