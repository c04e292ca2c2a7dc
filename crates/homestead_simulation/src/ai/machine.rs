//! Generic behavior state machine
//!
//! Один engine на все виды животных: `Brain<S>` (state + timers + target)
//! и `TransitionTable<S, C>` со списком guard'ов на каждое состояние.
//! Species задаёт только enum состояний, context и таблицу.
//!
//! Порядок тика (per entity):
//! 1. `Brain::tick` (state_timer) + `poll_slow_update`
//! 2. state-local действия species
//! 3. `advance`: Fast правила, на slow тике ещё и Slow правила
//! 4. entry действия нового состояния (делает species)

use std::fmt::Debug;
use std::hash::Hash;

use bevy::prelude::*;
use rand::Rng;

use crate::components::BehaviorKind;

/// Период медленного апдейта (дорогие сканы)
pub const SLOW_UPDATE_INTERVAL: f32 = 0.5;
/// Разброс фазы между entity
pub const SLOW_UPDATE_JITTER: f32 = 0.1;

pub trait BehaviorState: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Поглощающее состояние
    const DEAD: Self;
    const KIND: BehaviorKind;

    fn name(&self) -> &'static str;
}

#[derive(Component, Debug, Clone)]
pub struct Brain<S: BehaviorState> {
    state: S,
    state_timer: f32,
    slow_timer: f32,
    stuck_time: f32,
    force_action: bool,
    target: Option<Entity>,
    home: Vec3,
    transition: Option<(S, S)>,
}

impl<S: BehaviorState> Brain<S> {
    pub fn new(initial: S, home: Vec3) -> Self {
        Self {
            state: initial,
            state_timer: 0.0,
            slow_timer: 0.0,
            stuck_time: 0.0,
            force_action: false,
            target: None,
            home,
            transition: None,
        }
    }

    /// Заранее заряженный state_timer (действие на первом тике)
    pub fn with_state_timer(mut self, timer: f32) -> Self {
        self.state_timer = timer;
        self
    }

    /// Сдвиг фазы slow update
    pub fn with_slow_phase(mut self, phase: f32) -> Self {
        self.slow_timer = phase;
        self
    }

    pub fn state(&self) -> S {
        self.state
    }

    pub fn is(&self, state: S) -> bool {
        self.state == state
    }

    pub fn is_dead(&self) -> bool {
        self.state == S::DEAD
    }

    pub fn state_timer(&self) -> f32 {
        self.state_timer
    }

    pub fn set_state_timer(&mut self, timer: f32) {
        self.state_timer = timer;
    }

    pub fn stuck_time(&self) -> f32 {
        self.stuck_time
    }

    pub fn force_action(&self) -> bool {
        self.force_action
    }

    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<Entity>) {
        self.target = target;
    }

    pub fn home(&self) -> Vec3 {
        self.home
    }

    pub fn set_home(&mut self, home: Vec3) {
        self.home = home;
    }

    /// Накопление таймеров. Мертвый мозг не тикает.
    pub fn tick(&mut self, dt: f32, stuck: bool) {
        if self.is_dead() {
            return;
        }
        self.state_timer += dt;
        if stuck {
            self.stuck_time += dt;
        }
    }

    /// true раз в ~0.5s (следующий период со случайным сдвигом ±0.1s)
    pub fn poll_slow_update(&mut self, dt: f32, rng: &mut impl Rng) -> bool {
        self.slow_timer += dt;
        if self.slow_timer < SLOW_UPDATE_INTERVAL {
            return false;
        }
        self.slow_timer = rng.gen_range(-SLOW_UPDATE_JITTER..SLOW_UPDATE_JITTER);
        true
    }

    /// Смена состояния: state_timer в 0. Из Dead выхода нет.
    pub fn change_state(&mut self, to: S) -> bool {
        if self.is_dead() {
            return false;
        }
        if to != self.state {
            self.transition = Some((self.state, to));
        }
        self.state = to;
        self.state_timer = 0.0;
        self.stuck_time = 0.0;
        true
    }

    /// Внешняя команда: сбрасывает таймер и старую цель
    pub fn command(&mut self, to: S, force: bool) -> bool {
        if !self.change_state(to) {
            return false;
        }
        self.target = None;
        self.force_action = force;
        true
    }

    pub fn clear_force(&mut self) {
        self.force_action = false;
    }

    pub fn kill(&mut self) {
        if self.is_dead() {
            return;
        }
        self.transition = Some((self.state, S::DEAD));
        self.state = S::DEAD;
        self.state_timer = 0.0;
        self.target = None;
        self.force_action = false;
    }

    /// Последний переход (from, to), для BehaviorChanged
    pub fn take_transition(&mut self) -> Option<(S, S)> {
        self.transition.take()
    }

    pub fn has_pending_transition(&self) -> bool {
        self.transition.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Каждый тик (state-local условия)
    Fast,
    /// Только на slow update (сканы мира)
    Slow,
}

pub struct Rule<S, C> {
    pub from: S,
    pub phase: Phase,
    pub guard: fn(&C) -> bool,
    pub to: S,
}

/// Правила проверяются в порядке объявления, первое сработавшее побеждает
pub struct TransitionTable<S, C> {
    rules: Vec<Rule<S, C>>,
}

impl<S: BehaviorState, C> Default for TransitionTable<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BehaviorState, C> TransitionTable<S, C> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn on(mut self, from: S, phase: Phase, guard: fn(&C) -> bool, to: S) -> Self {
        self.rules.push(Rule { from, phase, guard, to });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn next(&self, from: S, phase: Phase, context: &C) -> Option<S> {
        self.rules
            .iter()
            .filter(|rule| rule.from == from && rule.phase == phase)
            .find(|rule| (rule.guard)(context))
            .map(|rule| rule.to)
    }
}

/// Шаг машины: Fast правила, затем (на slow тике) Slow. Возвращает новое состояние.
pub fn advance<S: BehaviorState, C>(brain: &mut Brain<S>, table: &TransitionTable<S, C>, context: &C, slow: bool) -> Option<S> {
    if brain.is_dead() {
        return None;
    }

    let from = brain.state();
    let next = table
        .next(from, Phase::Fast, context)
        .or_else(|| if slow { table.next(from, Phase::Slow, context) } else { None })?;

    brain.change_state(next).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Toy {
        Idle,
        Run,
        Dead,
    }

    impl BehaviorState for Toy {
        const DEAD: Self = Toy::Dead;
        const KIND: BehaviorKind = BehaviorKind::Wild;

        fn name(&self) -> &'static str {
            match self {
                Toy::Idle => "Idle",
                Toy::Run => "Run",
                Toy::Dead => "Dead",
            }
        }
    }

    struct Ctx {
        scared: bool,
        tired: bool,
    }

    fn table() -> TransitionTable<Toy, Ctx> {
        TransitionTable::<Toy, Ctx>::new()
            .on(Toy::Idle, Phase::Slow, |c| c.scared, Toy::Run)
            .on(Toy::Run, Phase::Fast, |c| c.tired, Toy::Idle)
            .on(Toy::Dead, Phase::Fast, |_| true, Toy::Idle)
    }

    #[test]
    fn test_slow_rules_wait_for_slow_tick() {
        let mut brain = Brain::new(Toy::Idle, Vec3::ZERO);
        let ctx = Ctx { scared: true, tired: false };
        assert_eq!(advance(&mut brain, &table(), &ctx, false), None);
        assert_eq!(advance(&mut brain, &table(), &ctx, true), Some(Toy::Run));
        assert_eq!(brain.take_transition(), Some((Toy::Idle, Toy::Run)));
        assert_eq!(brain.take_transition(), None);
    }

    #[test]
    fn test_change_state_resets_timer() {
        let mut brain = Brain::new(Toy::Run, Vec3::ZERO);
        brain.tick(3.0, true);
        assert_eq!(brain.state_timer(), 3.0);
        assert_eq!(brain.stuck_time(), 3.0);

        let ctx = Ctx { scared: false, tired: true };
        advance(&mut brain, &table(), &ctx, false);
        assert!(brain.is(Toy::Idle));
        assert_eq!(brain.state_timer(), 0.0);
        assert_eq!(brain.stuck_time(), 0.0);
    }

    #[test]
    fn test_dead_is_absorbing() {
        let mut brain = Brain::new(Toy::Idle, Vec3::ZERO);
        brain.kill();
        assert!(brain.is_dead());

        let ctx = Ctx { scared: true, tired: true };
        for _ in 0..10 {
            brain.tick(1.0, false);
            assert_eq!(advance(&mut brain, &table(), &ctx, true), None);
        }
        assert!(!brain.change_state(Toy::Run));
        assert!(!brain.command(Toy::Idle, true));
        assert!(brain.is_dead());
        assert_eq!(brain.state_timer(), 0.0);
    }

    #[test]
    fn test_command_clears_target_and_sets_force() {
        let mut brain = Brain::new(Toy::Idle, Vec3::ZERO);
        brain.set_target(Some(Entity::from_raw(4)));
        brain.tick(2.0, false);

        assert!(brain.command(Toy::Run, true));
        assert!(brain.force_action());
        assert_eq!(brain.target(), None);
        assert_eq!(brain.state_timer(), 0.0);

        // Повторная команда в то же состояние тоже сбрасывает таймер
        brain.tick(1.0, false);
        brain.command(Toy::Run, false);
        assert_eq!(brain.state_timer(), 0.0);
        assert!(!brain.force_action());
    }

    #[test]
    fn test_slow_update_period_is_jittered() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut brain = Brain::new(Toy::Idle, Vec3::ZERO);
        let dt = 1.0 / 60.0;

        let mut fired_at = Vec::new();
        for tick in 0..600 {
            if brain.poll_slow_update(dt, &mut rng) {
                fired_at.push(tick);
            }
        }
        // 10s / ~0.5s
        assert!((17..=25).contains(&fired_at.len()), "fired {} times", fired_at.len());
        for pair in fired_at.windows(2) {
            let gap = (pair[1] - pair[0]) as f32 * dt;
            assert!(gap > 0.38 && gap < 0.63, "gap {}", gap);
        }
    }
}
