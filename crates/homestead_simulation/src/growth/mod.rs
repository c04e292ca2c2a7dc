//! Игровое время и всё, что от него зависит
//!
//! - clock: день / время суток / суммарные часы
//! - timer: GrowthTimer (дни с округлением, часы строго)
//! - producers: растения, источники предметов, печи

use bevy::prelude::*;

pub mod clock;
pub mod producers;
pub mod timer;

pub use clock::{advance_game_clock, GameClock, HOURS_PER_DAY};
pub use producers::{take_collected, Furnace, ItemProduced, ItemProvider, Plant};
pub use timer::{has_elapsed, GrowthTimer, TimeType};

use crate::SimSet;

pub struct GrowthPlugin;

impl Plugin for GrowthPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ItemProduced>()
            .register_type::<Plant>()
            .register_type::<ItemProvider>()
            .register_type::<Furnace>()
            .add_systems(FixedUpdate, advance_game_clock.in_set(SimSet::Clock))
            .add_systems(
                FixedUpdate,
                (
                    producers::grow_plants,
                    producers::tick_item_providers,
                    producers::tick_furnaces,
                )
                    .chain()
                    .in_set(SimSet::Growth),
            );
    }
}
