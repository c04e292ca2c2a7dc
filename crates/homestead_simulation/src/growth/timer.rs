//! Elapsed-game-time threshold checks (hunger, growth, produce, smelting)
//!
//! Два режима:
//! - GameDays: дискретный счётчик дней, порог округляется (ties-to-even,
//!   как `RoundToInt` у сохранений исходной игры)
//! - GameHours: непрерывное время, строгое `>`

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::clock::GameClock;
use crate::persistence::{custom_key, SaveStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum TimeType {
    #[default]
    GameHours,
    GameDays,
}

impl TimeType {
    /// Текущее значение счётчика, с которым сравнивается checkpoint
    pub fn now(self, clock: &GameClock) -> f32 {
        match self {
            TimeType::GameDays => clock.day as f32,
            TimeType::GameHours => clock.total_time as f32,
        }
    }
}

pub fn has_elapsed(time_type: TimeType, now: f32, checkpoint: f32, threshold: f32) -> bool {
    match time_type {
        TimeType::GameDays => now >= (checkpoint + threshold).round_ties_even(),
        TimeType::GameHours => now > checkpoint + threshold,
    }
}

/// Persisted timer: checkpoint лежит в `SaveStore` под `{uid}_{tag}`
#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
pub struct GrowthTimer {
    pub tag: String,
    pub time_type: TimeType,
    pub duration: f32,
}

impl GrowthTimer {
    pub fn new(tag: impl Into<String>, time_type: TimeType, duration: f32) -> Self {
        Self {
            tag: tag.into(),
            time_type,
            duration,
        }
    }

    pub fn key(&self, unique_id: &str) -> String {
        custom_key(unique_id, &self.tag)
    }

    pub fn checkpoint(&self, store: &SaveStore, unique_id: &str) -> f32 {
        store.get_custom_float(&self.key(unique_id))
    }

    pub fn has_elapsed(&self, store: &SaveStore, clock: &GameClock, unique_id: &str) -> bool {
        has_elapsed(
            self.time_type,
            self.time_type.now(clock),
            self.checkpoint(store, unique_id),
            self.duration,
        )
    }

    pub fn reset(&self, store: &mut SaveStore, clock: &GameClock, unique_id: &str) {
        store.set_custom_float(self.key(unique_id), self.time_type.now(clock));
    }

    /// Stamp при создании entity (не трогает уже сохранённый checkpoint)
    pub fn ensure_started(&self, store: &mut SaveStore, clock: &GameClock, unique_id: &str) {
        if !store.has_custom_float(&self.key(unique_id)) {
            self.reset(store, clock, unique_id);
        }
    }
}
