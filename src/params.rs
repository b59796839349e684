// params.rs
// Immutable shared run parameters: configuration, materials, physics
// tables, and the geometry collaborator. Constructed once per run and read
// concurrently by every slot; no mutable global state.

use std::sync::Arc;

use crate::config::TransportConfig;
use crate::error::TrackError;
use crate::geometry::{Geometry, VolumeId};
use crate::physics::material::{Material, MaterialId};
use crate::physics::tables::PhysicsTables;

pub struct CoreParams {
    pub config: TransportConfig,
    pub materials: Vec<Material>,
    pub tables: PhysicsTables,
    pub geometry: Arc<dyn Geometry>,
}

impl CoreParams {
    pub fn new(
        config: TransportConfig,
        materials: Vec<Material>,
        tables: PhysicsTables,
        geometry: Arc<dyn Geometry>,
    ) -> Self {
        Self { config, materials, tables, geometry }
    }

    /// Material of one volume; an unknown volume is a per-track error.
    pub fn material(&self, id: MaterialId) -> Result<&Material, TrackError> {
        self.materials.get(id.0).ok_or(TrackError::MissingTables)
    }

    /// Resolve the material for a volume through the geometry.
    pub fn material_of_volume(&self, volume: VolumeId) -> MaterialId {
        self.geometry.material_of(volume)
    }
}
