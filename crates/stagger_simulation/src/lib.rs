//! STAGGER Simulation Core
//!
//! ECS-симуляция ragdoll-бега на Bevy 0.16 + Rapier 2D.
//! Host (рендер, клавиатура) подключается поверх: заполняет LimbInput,
//! читает VisualCue и Session.
//!
//! Детерминизм: fixed timestep 60Hz, seeded RNG, enhanced-determinism
//! у Rapier. Один и тот же seed + одна последовательность input'ов
//! дают одну и ту же симуляцию.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_rapier2d::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod collision;
pub mod combat;
pub mod components;
pub mod config;
pub mod control;
pub mod enemy;
pub mod logger;
pub mod rig;
pub mod session;

// Re-export основных типов для host'а
pub use collision::{EnemyHitGate, GoalReached, GroundContactTracker};
pub use combat::{CharacterIncapacitated, CueKind, EnemyStruck, LimbHit, VisualCue};
pub use components::{ControlCooldown, Enemy, LimbHealth, SegmentRole, Side};
pub use config::{EnemyAttackStyle, RigVariant, TuningConfig};
pub use control::{AxisInput, LimbInput, PunchState};
pub use logger::{init_logger, log, log_error, log_info, log_warning, set_logger, LogPrinter};
pub use session::{
    ResetRequested, ScheduledEvents, Session, SessionState, SimClock,
};

/// Главный plugin симуляции (объединяет все подсистемы)
///
/// Кастомный TuningConfig вставляется ДО plugin'а — init_resource
/// не перезапишет уже вставленный.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            // Детерминистичный RNG (seed по умолчанию)
            .insert_resource(DeterministicRng::new(42))
            .init_resource::<TuningConfig>()
            .init_resource::<Session>()
            .init_resource::<SimClock>()
            .init_resource::<ScheduledEvents>()
            .init_resource::<LimbInput>()
            .init_resource::<PunchState>()
            .init_resource::<GroundContactTracker>()
            .init_resource::<EnemyHitGate>()
            .add_event::<ResetRequested>()
            .add_event::<GoalReached>()
            .add_event::<LimbHit>()
            .add_event::<EnemyStruck>()
            .add_event::<CharacterIncapacitated>()
            .add_event::<VisualCue>()
            // Физика шагает вместе с simulation tick
            .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
            .add_systems(Startup, (setup_physics, spawn_initial_session).chain())
            // До physics step: часы, input, импульсы управления
            .add_systems(
                FixedUpdate,
                (
                    session::advance_clock,
                    session::drain_scheduled,
                    session::handle_session_input,
                    session::apply_reset,
                    control::apply_limb_controls,
                    control::apply_punch,
                    control::tick_control_cooldowns,
                )
                    .chain()
                    .before(PhysicsSet::SyncBackend),
            )
            // После physics step: контакты, урон, AI, терминальные условия
            .add_systems(
                FixedUpdate,
                (
                    control::reset_one_shot_impulses,
                    collision::resolve_collisions,
                    combat::apply_limb_damage,
                    combat::apply_enemy_damage,
                    enemy::update_enemy,
                    enemy::enemy_attack,
                    session::check_game_state,
                    control::clear_input_edges,
                )
                    .chain()
                    .after(PhysicsSet::Writeback),
            );
    }
}

/// Гравитация из конфига (перекрывает дефолт Rapier'а)
fn setup_physics(config: Res<TuningConfig>, mut rapier_config: Query<&mut RapierConfiguration>) {
    for mut rc in rapier_config.iter_mut() {
        rc.gravity = Vec2::new(0.0, config.session.gravity_y);
    }
}

/// Первая сборка сессии (reset идет тем же путем через rig::spawn_session)
fn spawn_initial_session(
    mut commands: Commands,
    config: Res<TuningConfig>,
    mut session: ResMut<Session>,
) {
    rig::spawn_session(&mut commands, &config, &mut session);
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время продвигается вручную ровно на один тик за app.update() —
/// тесты управляют ходом симуляции детерминистично, без wall clock.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins((MinimalPlugins, TransformPlugin))
    .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
        1.0 / 60.0,
    )))
    .add_plugins(SimulationPlugin)
    .insert_resource(DeterministicRng::new(seed));

    app
}
