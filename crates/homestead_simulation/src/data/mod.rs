//! Species data: RON definitions, registry, spawning

use bevy::prelude::*;

pub mod error;
pub mod spawn;
pub mod species;

pub use error::DataLoadError;
pub use spawn::{spawn_from_definition, spawn_species, UidAllocator};
pub use species::{load_species_dir, SpeciesDefinition, SpeciesRegistry};

use crate::SimSet;

pub struct SpeciesPlugin;

impl Plugin for SpeciesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpeciesRegistry>()
            .init_resource::<UidAllocator>()
            .add_systems(FixedUpdate, spawn::spawn_grown_species.in_set(SimSet::Growth));
    }
}
