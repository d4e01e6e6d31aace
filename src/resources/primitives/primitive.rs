use crate::errors::Result;
use crate::resources::geometry::CompactSubGeometry;

/// Invalidation state shared by every parametric primitive.
///
/// Geometry and UVs are tracked separately: changing a radius moves
/// vertices but leaves texture coordinates alone, while changing segment
/// counts invalidates both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveState {
    geometry_dirty: bool,
    uvs_dirty: bool,
}

impl Default for PrimitiveState {
    fn default() -> Self {
        Self {
            geometry_dirty: true,
            uvs_dirty: true,
        }
    }
}

impl PrimitiveState {
    #[inline]
    pub fn invalidate_geometry(&mut self) {
        self.geometry_dirty = true;
    }

    #[inline]
    pub fn invalidate_uvs(&mut self) {
        self.uvs_dirty = true;
    }

    #[inline]
    #[must_use]
    pub fn is_geometry_dirty(&self) -> bool {
        self.geometry_dirty
    }

    #[inline]
    #[must_use]
    pub fn is_uvs_dirty(&self) -> bool {
        self.uvs_dirty
    }
}

/// A shape generated from scalar parameters into a caller-owned target.
pub trait Primitive {
    fn state(&self) -> &PrimitiveState;
    fn state_mut(&mut self) -> &mut PrimitiveState;

    /// Writes positions, normals, tangents and indices into `target`.
    fn build_geometry(&mut self, target: &mut CompactSubGeometry) -> Result<()>;

    /// Writes texture coordinates into `target`, in the same vertex order
    /// as [`build_geometry`](Self::build_geometry).
    fn build_uvs(&mut self, target: &mut CompactSubGeometry) -> Result<()>;

    /// Rebuilds whatever was invalidated since the last update.
    ///
    /// A UV pass that had to reallocate storage invalidates the geometry
    /// again, so geometry is checked once more afterwards.
    fn update(&mut self, target: &mut CompactSubGeometry) -> Result<()> {
        if self.state().geometry_dirty {
            self.build_geometry(target)?;
            self.state_mut().geometry_dirty = false;
        }
        if self.state().uvs_dirty {
            self.build_uvs(target)?;
            self.state_mut().uvs_dirty = false;
        }
        if self.state().geometry_dirty {
            self.build_geometry(target)?;
            self.state_mut().geometry_dirty = false;
        }
        Ok(())
    }
}
