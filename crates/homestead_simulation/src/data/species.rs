//! Species definitions (RON) + registry
//!
//! Один файл = один вид. Ровно один behavior блок (wild / livestock / bird / pet).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::DataLoadError;
use crate::ai::{BirdConfig, LivestockConfig, PetConfig, WildConfig};
use crate::combat::CombatStats;
use crate::components::BehaviorKind;
use crate::locomotion::LocomotionConfig;

fn default_max_health() -> u32 {
    100
}

fn default_hit_range() -> f32 {
    0.5
}

fn default_corpse_duration() -> f32 {
    10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "default_max_health")]
    pub max_health: u32,
    #[serde(default = "default_hit_range")]
    pub hit_range: f32,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub locomotion: LocomotionConfig,
    #[serde(default)]
    pub combat: Option<CombatStats>,
    #[serde(default = "default_corpse_duration")]
    pub corpse_duration: f32,

    #[serde(default)]
    pub wild: Option<WildConfig>,
    #[serde(default)]
    pub livestock: Option<LivestockConfig>,
    #[serde(default)]
    pub bird: Option<BirdConfig>,
    #[serde(default)]
    pub pet: Option<PetConfig>,
}

impl SpeciesDefinition {
    /// Какой state machine получит животное
    pub fn behavior(&self) -> Option<BehaviorKind> {
        let blocks = [
            (self.wild.is_some(), BehaviorKind::Wild),
            (self.livestock.is_some(), BehaviorKind::Livestock),
            (self.bird.is_some(), BehaviorKind::Bird),
            (self.pet.is_some(), BehaviorKind::Pet),
        ];
        let mut present = blocks.iter().filter(|(present, _)| *present);
        match (present.next(), present.next()) {
            (Some((_, kind)), None) => Some(*kind),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), DataLoadError> {
        let invalid = |reason: &str| DataLoadError::InvalidDefinition {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.is_empty() {
            return Err(invalid("empty id"));
        }
        if self.max_health == 0 {
            return Err(invalid("max_health must be positive"));
        }
        if self.behavior().is_none() {
            return Err(invalid("exactly one of wild/livestock/bird/pet is required"));
        }
        if let Some(combat) = &self.combat {
            if combat.attack_windup > combat.attack_duration {
                return Err(invalid("attack_windup is longer than attack_duration"));
            }
            if combat.attack_range < 0.0 {
                return Err(invalid("negative attack_range"));
            }
        }
        if self.locomotion.move_speed < 0.0 {
            return Err(invalid("negative move_speed"));
        }
        Ok(())
    }

    pub fn from_ron(text: &str, path: &str) -> Result<Self, DataLoadError> {
        let definition: Self = ron::from_str(text).map_err(|e| DataLoadError::ParseError {
            path: path.to_string(),
            details: e.to_string(),
        })?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(DataLoadError::FileNotFound(display));
        }
        let text = fs::read_to_string(path).map_err(|e| DataLoadError::ReadError {
            path: display.clone(),
            details: e.to_string(),
        })?;
        Self::from_ron(&text, &display)
    }
}

/// Все загруженные виды по id (read-only для симуляции)
#[derive(Resource, Debug, Default)]
pub struct SpeciesRegistry {
    definitions: HashMap<String, SpeciesDefinition>,
}

impl SpeciesRegistry {
    pub fn insert(&mut self, definition: SpeciesDefinition) -> Result<(), DataLoadError> {
        definition.validate()?;
        if self.definitions.contains_key(&definition.id) {
            return Err(DataLoadError::DuplicateSpecies(definition.id));
        }
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SpeciesDefinition> {
        self.definitions.get(id)
    }

    pub fn require(&self, id: &str) -> Result<&SpeciesDefinition, DataLoadError> {
        self.get(id).ok_or_else(|| DataLoadError::UnknownSpecies(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Id в детерминированном порядке
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Ссылки между видами (grow_to) должны резолвиться
    pub fn check_links(&self) -> Result<(), DataLoadError> {
        for id in self.ids() {
            let Some(definition) = self.get(id) else {
                continue;
            };
            let grow_to = definition.livestock.as_ref().and_then(|l| l.grow_to.as_deref());
            if let Some(target) = grow_to {
                if self.get(target).is_none() {
                    return Err(DataLoadError::InvalidDefinition {
                        id: id.to_string(),
                        reason: format!("grow_to '{}' is not a known species", target),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Все `*.ron` из директории. Первая ошибка прерывает загрузку.
pub fn load_species_dir(dir: &Path) -> Result<SpeciesRegistry, DataLoadError> {
    if !dir.exists() {
        return Err(DataLoadError::FileNotFound(dir.display().to_string()));
    }
    let entries = fs::read_dir(dir).map_err(|e| DataLoadError::ReadError {
        path: dir.display().to_string(),
        details: e.to_string(),
    })?;

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    paths.sort();

    let mut registry = SpeciesRegistry::default();
    for path in paths {
        let definition = SpeciesDefinition::load(&path)?;
        crate::log(&format!("📦 Loaded species '{}' ({})", definition.id, definition.name));
        registry.insert(definition)?;
    }
    registry.check_links()?;

    crate::log_info(&format!("📦 Loaded {} species definitions", registry.len()));
    Ok(registry)
}
