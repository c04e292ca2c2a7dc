//! Игровые часы (день + время суток)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub const HOURS_PER_DAY: f32 = 24.0;

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameClock {
    /// Номер дня (с 1)
    pub day: i32,
    /// Время суток в часах (0..24)
    pub day_time: f32,
    /// Суммарное игровое время в часах
    pub total_time: f64,
    /// Скорость: игровых часов за секунду реального времени (0 = пауза)
    pub game_hours_per_second: f32,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            day: 1,
            day_time: 6.0,
            total_time: 0.0,
            game_hours_per_second: 0.1,
        }
    }
}

impl GameClock {
    pub fn paused() -> Self {
        Self {
            game_hours_per_second: 0.0,
            ..Default::default()
        }
    }

    pub fn advance(&mut self, dt: f32) {
        let hours = dt * self.game_hours_per_second;
        if hours <= 0.0 {
            return;
        }
        self.total_time += hours as f64;
        self.day_time += hours;
        while self.day_time >= HOURS_PER_DAY {
            self.day_time -= HOURS_PER_DAY;
            self.day += 1;
        }
    }

    pub fn is_night(&self) -> bool {
        self.day_time < 6.0 || self.day_time >= 21.0
    }
}

/// FixedUpdate: часы идут в такт симуляции
pub fn advance_game_clock(mut clock: ResMut<GameClock>, time: Res<Time<Fixed>>) {
    let dt = time.delta_secs();
    clock.advance(dt);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_rolls_over() {
        let mut clock = GameClock {
            day: 1,
            day_time: 23.0,
            total_time: 0.0,
            game_hours_per_second: 1.0,
        };
        clock.advance(2.0);
        assert_eq!(clock.day, 2);
        assert!((clock.day_time - 1.0).abs() < 1e-5);
        assert!((clock.total_time - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_paused_clock_does_not_move() {
        let mut clock = GameClock::paused();
        clock.advance(100.0);
        assert_eq!(clock, GameClock::paused());
    }
}
