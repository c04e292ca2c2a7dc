//! Спавн животных по species definition
//!
//! Wander мозги стартуют с заряженным state_timer: первая цель выбирается на первом тике.

use bevy::prelude::*;
use rand::Rng;

use super::error::DataLoadError;
use super::species::{SpeciesDefinition, SpeciesRegistry};
use crate::ai::machine::SLOW_UPDATE_INTERVAL;
use crate::ai::{BirdState, Brain, GrowRequested, LivestockState, PetOwner, PetState, WildState};
use crate::combat::{CombatState, Destructible};
use crate::components::{Actor, Colliders, Health, UniqueId};
use crate::locomotion::Locomotion;
use crate::steering::math::forward;
use crate::DeterministicRng;

/// Выдаёт `{prefix}_{n}` для новых entity
#[derive(Resource, Debug, Default)]
pub struct UidAllocator {
    next: u64,
}

impl UidAllocator {
    pub fn allocate(&mut self, prefix: &str) -> UniqueId {
        self.next += 1;
        UniqueId::new(format!("{}_{}", prefix, self.next))
    }
}

pub fn spawn_from_definition(
    commands: &mut Commands,
    definition: &SpeciesDefinition,
    position: Vec3,
    rotation: Quat,
    unique_id: UniqueId,
    slow_phase: f32,
) -> Result<Entity, DataLoadError> {
    let Some(kind) = definition.behavior() else {
        return Err(DataLoadError::InvalidDefinition {
            id: definition.id.clone(),
            reason: "no behavior block".to_string(),
        });
    };

    let mut entity = commands.spawn((
        Actor {
            behavior: kind,
            groups: definition.groups.clone(),
        },
        Health::new(definition.max_health),
        Destructible {
            hit_range: definition.hit_range,
            corpse_duration: definition.corpse_duration,
        },
        Transform::from_translation(position).with_rotation(rotation),
        unique_id,
        Colliders::default(),
        definition.locomotion.clone(),
        Locomotion::new(position, forward(rotation)),
    ));

    if let Some(stats) = &definition.combat {
        entity.insert((CombatState::new(stats), stats.clone()));
    }

    if let Some(wild) = &definition.wild {
        let brain = Brain::new(WildState::Wander, position)
            .with_state_timer(wild.wander.interval)
            .with_slow_phase(slow_phase);
        entity.insert((wild.clone(), brain));
    }
    if let Some(livestock) = &definition.livestock {
        let brain = Brain::new(LivestockState::Wander, position)
            .with_state_timer(livestock.wander.interval)
            .with_slow_phase(slow_phase);
        entity.insert((livestock.clone(), brain));
    }
    if let Some(bird) = &definition.bird {
        let brain = Brain::new(BirdState::Sit, position).with_slow_phase(slow_phase);
        entity.insert((bird.clone(), brain));
    }
    if let Some(pet) = &definition.pet {
        let brain = Brain::new(PetState::Idle, position)
            .with_state_timer(pet.wander.interval)
            .with_slow_phase(slow_phase);
        entity.insert((pet.clone(), PetOwner::default(), brain));
    }

    Ok(entity.id())
}

/// Спавн напрямую в World (demo, тесты)
pub fn spawn_species(world: &mut World, id: &str, position: Vec3) -> Result<Entity, DataLoadError> {
    let definition = world
        .get_resource::<SpeciesRegistry>()
        .ok_or_else(|| DataLoadError::UnknownSpecies(id.to_string()))?
        .require(id)?
        .clone();
    let unique_id = match world.get_resource_mut::<UidAllocator>() {
        Some(mut uids) => uids.allocate(id),
        None => UniqueId::new(id),
    };
    let slow_phase = world
        .get_resource_mut::<DeterministicRng>()
        .map_or(0.0, |mut rng| rng.rng.gen_range(0.0..SLOW_UPDATE_INTERVAL));

    let mut commands = world.commands();
    let entity = spawn_from_definition(&mut commands, &definition, position, Quat::IDENTITY, unique_id, slow_phase)?;
    world.flush();
    Ok(entity)
}

/// GrowRequested → взрослая особь на месте старой
pub fn spawn_grown_species(
    mut commands: Commands,
    mut grow_events: EventReader<GrowRequested>,
    registry: Res<SpeciesRegistry>,
    mut uids: ResMut<UidAllocator>,
    mut rng: ResMut<DeterministicRng>,
) {
    for event in grow_events.read() {
        let definition = match registry.require(&event.species_id) {
            Ok(definition) => definition,
            Err(e) => {
                crate::log_error(&format!("Grow of {:?} failed: {}", event.entity, e));
                continue;
            }
        };

        let slow_phase = rng.rng.gen_range(0.0..SLOW_UPDATE_INTERVAL);
        let unique_id = uids.allocate(&definition.id);
        match spawn_from_definition(
            &mut commands,
            definition,
            event.position,
            event.rotation,
            unique_id,
            slow_phase,
        ) {
            Ok(entity) => crate::log_info(&format!("🐄 {:?} grew into {:?} ({})", event.entity, entity, definition.id)),
            Err(e) => crate::log_error(&format!("Grow of {:?} failed: {}", event.entity, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{LivestockConfig, WildConfig};
    use crate::combat::CombatStats;
    use crate::locomotion::LocomotionConfig;

    fn definition() -> SpeciesDefinition {
        SpeciesDefinition {
            id: "boar".to_string(),
            name: "Boar".to_string(),
            max_health: 80,
            hit_range: 0.7,
            groups: vec!["boars".to_string()],
            locomotion: LocomotionConfig::default(),
            combat: Some(CombatStats::default()),
            corpse_duration: 5.0,
            wild: Some(WildConfig::default()),
            livestock: None,
            bird: None,
            pet: None,
        }
    }

    #[test]
    fn test_spawn_builds_full_actor() {
        let mut world = World::new();
        let mut registry = SpeciesRegistry::default();
        registry.insert(definition()).expect("valid");
        world.insert_resource(registry);
        world.init_resource::<UidAllocator>();

        let entity = spawn_species(&mut world, "boar", Vec3::new(1.0, 0.0, 2.0)).expect("spawned");

        let entity_ref = world.entity(entity);
        assert_eq!(entity_ref.get::<Health>().map(|h| h.max), Some(80));
        assert_eq!(entity_ref.get::<Destructible>().map(|d| d.hit_range), Some(0.7));
        assert_eq!(entity_ref.get::<UniqueId>().map(|u| u.as_str().to_string()), Some("boar_1".to_string()));
        assert!(entity_ref.get::<CombatState>().is_some());
        let brain = entity_ref.get::<Brain<WildState>>().expect("wild brain");
        assert!(brain.is(WildState::Wander));
        assert_eq!(brain.home(), Vec3::new(1.0, 0.0, 2.0));
        assert!(entity_ref.get::<Brain<LivestockState>>().is_none());
    }

    #[test]
    fn test_unknown_species() {
        let mut world = World::new();
        world.init_resource::<SpeciesRegistry>();
        assert!(matches!(
            spawn_species(&mut world, "dragon", Vec3::ZERO),
            Err(DataLoadError::UnknownSpecies(_))
        ));
    }

    #[test]
    fn test_livestock_without_combat() {
        let mut world = World::new();
        let mut registry = SpeciesRegistry::default();
        registry
            .insert(SpeciesDefinition {
                id: "sheep".to_string(),
                combat: None,
                wild: None,
                livestock: Some(LivestockConfig::default()),
                ..definition()
            })
            .expect("valid");
        world.insert_resource(registry);

        let entity = spawn_species(&mut world, "sheep", Vec3::ZERO).expect("spawned");
        assert!(world.entity(entity).get::<CombatState>().is_none());
        assert!(world.entity(entity).get::<Brain<LivestockState>>().is_some());
    }
}
