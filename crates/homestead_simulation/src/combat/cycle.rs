//! Attack cycle: Idle → Windup → Strike → Idle
//!
//! Один `attack_timer` против cooldown / windup / duration.
//! Инвариант: не больше одного hit за strike (`attack_hit`).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::steering::math::flat_distance;

/// Вертикальный offset прицела снарядов (грудь цели)
pub const PROJECTILE_AIM_HEIGHT: f32 = 1.5;

#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileStats {
    pub speed: f32,
    pub lifetime: f32,
    pub radius: f32,
}

impl Default for ProjectileStats {
    fn default() -> Self {
        Self {
            speed: 15.0,
            lifetime: 3.0,
            radius: 0.3,
        }
    }
}

/// Боевые параметры (из species definition)
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct CombatStats {
    pub attack_enabled: bool,
    pub attack_damage: u32,
    pub attack_range: f32,
    /// Между началами замахов
    pub attack_cooldown: f32,
    /// Момент удара от начала замаха
    pub attack_windup: f32,
    /// Конец strike окна
    pub attack_duration: f32,
    /// Дальняя атака: вместо прямого урона снаряд
    pub projectile: Option<ProjectileStats>,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            attack_enabled: true,
            attack_damage: 10,
            attack_range: 1.2,
            attack_cooldown: 2.0,
            attack_windup: 0.7,
            attack_duration: 1.2,
            projectile: None,
        }
    }
}

/// Цель: либо destructible entity, либо игрок, не оба сразу
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombatTarget {
    #[default]
    None,
    Destructible(Entity),
    Player(Entity),
}

impl CombatTarget {
    pub fn entity(&self) -> Option<Entity> {
        match self {
            CombatTarget::None => None,
            CombatTarget::Destructible(entity) | CombatTarget::Player(entity) => Some(*entity),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CombatTarget::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttackPhase {
    #[default]
    Idle,
    Windup,
    Strike,
}

/// Что цикл видит о цели в этом тике
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetView {
    pub position: Vec3,
    /// У игрока нет hit_range
    pub hit_range: Option<f32>,
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatSignal {
    AttackStarted,
    Hit { aim: Vec3 },
    TargetLost,
}

/// Что locomotion должна сделать по итогам тика
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatMotion {
    Seek { target: Vec3, reach: f32 },
    Hold { face: Vec3 },
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatTick {
    pub signals: Vec<CombatSignal>,
    pub motion: Option<CombatMotion>,
}

#[derive(Component, Debug, Clone, PartialEq)]
pub struct CombatState {
    pub target: CombatTarget,
    pub attack_timer: f32,
    pub phase: AttackPhase,
    pub attack_hit: bool,
}

impl CombatState {
    /// Timer заранее заряжен: первый замах без ожидания cooldown
    pub fn new(stats: &CombatStats) -> Self {
        Self {
            target: CombatTarget::None,
            attack_timer: stats.attack_cooldown,
            phase: AttackPhase::Idle,
            attack_hit: false,
        }
    }

    pub fn attack(&mut self, target: CombatTarget) {
        self.target = target;
    }

    pub fn stop_attack(&mut self) {
        self.target = CombatTarget::None;
        self.phase = AttackPhase::Idle;
    }

    pub fn is_attacking(&self) -> bool {
        self.phase != AttackPhase::Idle
    }

    pub fn hit_range(stats: &CombatStats, view: &TargetView) -> f32 {
        stats.attack_range + view.hit_range.unwrap_or(0.0)
    }

    pub fn tick(&mut self, stats: &CombatStats, position: Vec3, target: Option<TargetView>, dt: f32) -> CombatTick {
        let mut out = CombatTick::default();
        self.attack_timer += dt;

        if self.target.is_none() {
            self.phase = AttackPhase::Idle;
            return out;
        }

        let Some(view) = target.filter(|view| view.alive) else {
            self.stop_attack();
            out.signals.push(CombatSignal::TargetLost);
            out.motion = Some(CombatMotion::Stop);
            return out;
        };

        let hit_range = Self::hit_range(stats, &view);
        let in_range = flat_distance(position, view.position) <= hit_range;

        match self.phase {
            AttackPhase::Idle => {
                if !in_range {
                    out.motion = Some(CombatMotion::Seek {
                        target: view.position,
                        reach: hit_range,
                    });
                } else {
                    out.motion = Some(CombatMotion::Hold { face: view.position });
                    if stats.attack_enabled && self.attack_timer > stats.attack_cooldown {
                        self.phase = AttackPhase::Windup;
                        self.attack_timer = 0.0;
                        self.attack_hit = false;
                        out.signals.push(CombatSignal::AttackStarted);
                    }
                }
            }
            AttackPhase::Windup | AttackPhase::Strike => {
                out.motion = Some(CombatMotion::Hold { face: view.position });

                if !self.attack_hit && self.attack_timer > stats.attack_windup {
                    self.attack_hit = true;
                    self.phase = AttackPhase::Strike;
                    out.signals.push(CombatSignal::Hit {
                        aim: view.position + Vec3::Y * PROJECTILE_AIM_HEIGHT,
                    });
                }

                // Конец strike: следующий тик заново проверит дистанцию
                if self.attack_timer > stats.attack_duration {
                    self.phase = AttackPhase::Idle;
                }
            }
        }

        out
    }
}
