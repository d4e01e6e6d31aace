pub mod settings;
pub mod view3d;

pub use settings::ViewSettings;
pub use view3d::View3D;
