// geometry.rs
// Geometry collaborator interface. Boundary intersection and volume lookup
// are external concerns; the transport core consumes them through the
// `Geometry` trait. A layered slab stack is provided for tests and demos.

use serde::{Deserialize, Serialize};
use ultraviolet::DVec3;

use crate::physics::material::MaterialId;

/// Opaque volume identifier assigned by the geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VolumeId(pub usize);

/// Geometry queries needed by the stepping loop.
///
/// All methods are read-only and must be safe to call concurrently from
/// every track slot.
pub trait Geometry: Send + Sync {
    /// Volume containing the given point, or `None` outside the world.
    fn volume_at(&self, pos: DVec3) -> Option<VolumeId>;

    /// Lower bound on the distance from `pos` to the nearest boundary.
    fn safety(&self, pos: DVec3, volume: VolumeId) -> f64;

    /// Distance along `dir` to the exit of the current volume.
    fn distance_to_boundary(&self, pos: DVec3, dir: DVec3, volume: VolumeId) -> f64;

    /// Material filling the given volume.
    fn material_of(&self, volume: VolumeId) -> MaterialId;
}

/// A stack of slabs perpendicular to the x axis, unbounded transversally.
///
/// Volume `i` spans `planes[i] <= x < planes[i + 1]`. Mirrors the layered
/// calorimeter layouts used by the transport test harnesses.
#[derive(Clone, Debug)]
pub struct SlabStack {
    planes: Vec<f64>,
    materials: Vec<MaterialId>,
}

impl SlabStack {
    /// Build from ascending plane positions and per-slab materials.
    pub fn new(planes: Vec<f64>, materials: Vec<MaterialId>) -> Self {
        assert!(planes.len() >= 2, "a slab stack needs at least one slab");
        assert_eq!(materials.len(), planes.len() - 1);
        assert!(
            planes.windows(2).all(|w| w[0] < w[1]),
            "slab planes must be strictly ascending"
        );
        Self { planes, materials }
    }

    /// A single homogeneous box, for simple setups.
    pub fn single(x_lo: f64, x_hi: f64, material: MaterialId) -> Self {
        Self::new(vec![x_lo, x_hi], vec![material])
    }

    pub fn num_volumes(&self) -> usize {
        self.materials.len()
    }
}

impl Geometry for SlabStack {
    fn volume_at(&self, pos: DVec3) -> Option<VolumeId> {
        let x = pos.x;
        if x < self.planes[0] || x >= self.planes[self.planes.len() - 1] {
            return None;
        }
        // Slab count is small; a linear scan keeps this branch-predictable.
        let idx = self.planes.windows(2).position(|w| x >= w[0] && x < w[1])?;
        Some(VolumeId(idx))
    }

    fn safety(&self, pos: DVec3, volume: VolumeId) -> f64 {
        let lo = self.planes[volume.0];
        let hi = self.planes[volume.0 + 1];
        (pos.x - lo).min(hi - pos.x).max(0.0)
    }

    fn distance_to_boundary(&self, pos: DVec3, dir: DVec3, volume: VolumeId) -> f64 {
        let lo = self.planes[volume.0];
        let hi = self.planes[volume.0 + 1];
        if dir.x > 0.0 {
            ((hi - pos.x) / dir.x).max(0.0)
        } else if dir.x < 0.0 {
            ((lo - pos.x) / dir.x).max(0.0)
        } else {
            f64::INFINITY
        }
    }

    fn material_of(&self, volume: VolumeId) -> MaterialId {
        self.materials[volume.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> SlabStack {
        SlabStack::new(vec![0.0, 1.0, 3.0], vec![MaterialId(0), MaterialId(1)])
    }

    #[test]
    fn volume_lookup_covers_slabs_and_outside() {
        let g = stack();
        assert_eq!(g.volume_at(DVec3::new(0.5, 9.0, -4.0)), Some(VolumeId(0)));
        assert_eq!(g.volume_at(DVec3::new(2.0, 0.0, 0.0)), Some(VolumeId(1)));
        assert_eq!(g.volume_at(DVec3::new(-0.1, 0.0, 0.0)), None);
        assert_eq!(g.volume_at(DVec3::new(3.0, 0.0, 0.0)), None, "upper edge is exclusive");
    }

    #[test]
    fn safety_is_distance_to_nearest_plane() {
        let g = stack();
        let s = g.safety(DVec3::new(0.25, 0.0, 0.0), VolumeId(0));
        assert_eq!(s, 0.25);
        let s = g.safety(DVec3::new(2.5, 0.0, 0.0), VolumeId(1));
        assert_eq!(s, 0.5);
    }

    #[test]
    fn boundary_distance_follows_direction() {
        let g = stack();
        let pos = DVec3::new(0.25, 0.0, 0.0);
        let fwd = g.distance_to_boundary(pos, DVec3::new(1.0, 0.0, 0.0), VolumeId(0));
        assert!((fwd - 0.75).abs() < 1e-12);
        let back = g.distance_to_boundary(pos, DVec3::new(-1.0, 0.0, 0.0), VolumeId(0));
        assert!((back - 0.25).abs() < 1e-12);
        let tangent = g.distance_to_boundary(pos, DVec3::new(0.0, 1.0, 0.0), VolumeId(0));
        assert_eq!(tangent, f64::INFINITY);
    }
}
