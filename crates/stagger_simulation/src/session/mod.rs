//! Жизненный цикл игровой сессии
//!
//! Session — явный агрегат вместо «полей на сцене»: владеет хэндлами
//! персонажа, врага и уровня, плюс терминальный автомат
//! Active → Paused / Over / Won → (reset) → Active.
//!
//! Гарантия заморозки двойная: physics pipeline выключается И каждая
//! per-tick система явно проверяет состояние — одного выключения физики
//! недостаточно, силы продолжали бы применяться.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::collision::{GoalReached, GroundContactTracker};
use crate::combat::CharacterIncapacitated;
use crate::components::SegmentRole;
use crate::config::TuningConfig;
use crate::control::{LimbInput, PunchState};
use crate::logger;
use crate::rig;

/// Состояние сессии
///
/// Over/Won — терминальные: геймплейные системы не работают до reset.
/// Active ↔ Paused — единственный обратимый переход.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Active,
    Paused,
    Over { reason: String },
    Won,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Over { .. } | Self::Won)
    }
}

/// Хэндлы сегментов персонажа
///
/// Слот конечности очищается при уничтожении: «возможно отсутствующий»
/// сегмент — это Option + проверяемый Query::get, а не флаг на объекте.
#[derive(Debug, Clone)]
pub struct CharacterRig {
    pub torso: Entity,
    pub head: Entity,
    limbs: Vec<(SegmentRole, Option<Entity>)>,
}

impl CharacterRig {
    pub fn new(torso: Entity, head: Entity, limbs: Vec<(SegmentRole, Entity)>) -> Self {
        Self {
            torso,
            head,
            limbs: limbs.into_iter().map(|(r, e)| (r, Some(e))).collect(),
        }
    }

    /// Entity конечности, если она еще не потеряна
    pub fn limb(&self, role: SegmentRole) -> Option<Entity> {
        self.limbs
            .iter()
            .find(|(r, _)| *r == role)
            .and_then(|(_, e)| *e)
    }

    /// Очистить слот уничтоженной конечности
    pub fn clear_limb(&mut self, role: SegmentRole) {
        if let Some(slot) = self.limbs.iter_mut().find(|(r, _)| *r == role) {
            slot.1 = None;
        }
    }

    /// Активные конечности (роль + entity)
    pub fn active_limbs(&self) -> impl Iterator<Item = (SegmentRole, Entity)> + '_ {
        self.limbs.iter().filter_map(|(r, e)| e.map(|e| (*r, e)))
    }

    /// Количество живых upper-конечностей — вход правила несдееспособности
    pub fn active_upper_limbs(&self) -> usize {
        self.active_limbs()
            .filter(|(role, _)| role.is_upper_limb())
            .count()
    }

    /// Все живые entity рига (для teardown)
    pub fn entities(&self) -> Vec<Entity> {
        let mut out = vec![self.torso, self.head];
        out.extend(self.active_limbs().map(|(_, e)| e));
        out
    }
}

/// Хэндлы врага (корпус + руки или sensor-пасть)
#[derive(Debug, Clone)]
pub struct EnemyRig {
    pub body: Entity,
    pub left_arm: Option<Entity>,
    pub right_arm: Option<Entity>,
    pub mouth: Option<Entity>,
}

impl EnemyRig {
    pub fn entities(&self) -> Vec<Entity> {
        let mut out = vec![self.body];
        out.extend(self.left_arm);
        out.extend(self.right_arm);
        out.extend(self.mouth);
        out
    }
}

/// Статика уровня
#[derive(Debug, Clone)]
pub struct LevelRig {
    pub ground: Entity,
    pub goal: Entity,
    pub goal_x: f32,
}

/// Агрегат сессии (Resource)
///
/// player_health — сессионное здоровье, отдельное от здоровья конечностей.
#[derive(Resource, Debug)]
pub struct Session {
    pub state: SessionState,
    /// Токен поколения: инкрементируется на каждом reset,
    /// отложенные события со старым токеном отбрасываются
    pub generation: u32,
    pub player_health: u32,
    pub character: Option<CharacterRig>,
    pub enemy: Option<EnemyRig>,
    pub level: Option<LevelRig>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Active,
            generation: 0,
            player_health: 0,
            character: None,
            enemy: None,
            level: None,
        }
    }
}

/// Часы симуляции (мс); замирают в Paused, идут в терминальных
/// состояниях (отложенный рестарт после победы должен сработать)
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct SimClock {
    pub elapsed_ms: f64,
    pub tick: u64,
}

/// Эффект отложенного события
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEffect {
    /// Полный рестарт сессии (после победы, с задержкой)
    RestartSession,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledEntry {
    fire_at_ms: f64,
    generation: u32,
    effect: ScheduledEffect,
}

/// Очередь отложенных событий вместо замыканий на таймерах
///
/// Каждая запись несет токен поколения; запись пережившая reset
/// молча отбрасывается при наступлении срока.
#[derive(Resource, Debug, Default)]
pub struct ScheduledEvents {
    entries: Vec<ScheduledEntry>,
}

impl ScheduledEvents {
    pub fn push(&mut self, fire_at_ms: f64, generation: u32, effect: ScheduledEffect) {
        self.entries.push(ScheduledEntry {
            fire_at_ms,
            generation,
            effect,
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Снять наступившие записи; вернуть эффекты текущего поколения,
    /// устаревшие — отбросить
    pub fn drain_due(&mut self, now_ms: f64, generation: u32) -> Vec<ScheduledEffect> {
        let mut fired = Vec::new();
        self.entries.retain(|entry| {
            if entry.fire_at_ms > now_ms {
                return true;
            }
            if entry.generation == generation {
                fired.push(entry.effect);
            }
            false
        });
        fired
    }
}

/// Событие: запрошен полный рестарт сессии
#[derive(Event, Debug, Clone, Copy)]
pub struct ResetRequested;

// --- Системы ---

/// Система: продвижение часов симуляции
///
/// Первая в тике. В Paused часы стоят — все ms-cooldown'ы замирают
/// вместе с физикой.
pub fn advance_clock(
    mut clock: ResMut<SimClock>,
    session: Res<Session>,
    time: Res<Time<Fixed>>,
) {
    if matches!(session.state, SessionState::Paused) {
        return;
    }
    clock.elapsed_ms += time.delta_secs_f64() * 1000.0;
    clock.tick += 1;
}

/// Система: pause toggle и reset input
///
/// Пауза выключает physics pipeline — симуляция замирает на месте,
/// позиции и скорости сохраняются. Reset доступен только из
/// терминальных состояний.
pub fn handle_session_input(
    input: Res<LimbInput>,
    mut session: ResMut<Session>,
    mut rapier_config: Query<&mut RapierConfiguration>,
    mut reset_events: EventWriter<ResetRequested>,
) {
    if input.pause_pressed {
        match session.state {
            SessionState::Active => {
                session.state = SessionState::Paused;
                set_physics_pipeline(&mut rapier_config, false);
                logger::log_info("Session paused");
            }
            SessionState::Paused => {
                session.state = SessionState::Active;
                set_physics_pipeline(&mut rapier_config, true);
                logger::log_info("Session resumed");
            }
            _ => {}
        }
    }

    if input.reset_pressed && session.state.is_terminal() {
        reset_events.write(ResetRequested);
    }
}

/// Система: дренаж очереди отложенных событий
pub fn drain_scheduled(
    mut scheduled: ResMut<ScheduledEvents>,
    clock: Res<SimClock>,
    session: Res<Session>,
    mut reset_events: EventWriter<ResetRequested>,
) {
    for effect in scheduled.drain_due(clock.elapsed_ms, session.generation) {
        match effect {
            ScheduledEffect::RestartSession => {
                reset_events.write(ResetRequested);
            }
        }
    }
}

/// Система: полный рестарт сессии
///
/// Терапия вместо хирургии: сносим весь риг и собираем заново,
/// никакой починки состояния на месте.
pub fn apply_reset(
    mut commands: Commands,
    mut reset_events: EventReader<ResetRequested>,
    config: Res<TuningConfig>,
    mut session: ResMut<Session>,
    mut scheduled: ResMut<ScheduledEvents>,
    mut tracker: ResMut<GroundContactTracker>,
    mut punch: ResMut<PunchState>,
    mut rapier_config: Query<&mut RapierConfiguration>,
) {
    // Дубликаты за один тик (отложенный рестарт + нажатие reset)
    // схлопываются в одну пересборку
    if reset_events.read().count() == 0 {
        return;
    }

    // Teardown: персонаж, враг, уровень
    let mut doomed = Vec::new();
    if let Some(character) = session.character.take() {
        doomed.extend(character.entities());
    }
    if let Some(enemy) = session.enemy.take() {
        doomed.extend(enemy.entities());
    }
    if let Some(level) = session.level.take() {
        doomed.push(level.ground);
        doomed.push(level.goal);
    }
    for entity in doomed {
        // Сегмент мог быть уже уничтожен (потерянная конечность)
        if let Ok(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.despawn();
        }
    }

    session.generation = session.generation.wrapping_add(1);
    scheduled.clear();
    tracker.clear();
    punch.reset();

    rig::spawn_session(&mut commands, &config, &mut session);
    set_physics_pipeline(&mut rapier_config, true);

    logger::log_info(&format!(
        "Session reset (generation {})",
        session.generation
    ));
}

/// Система: агрегация терминальных условий
///
/// Выполняется последней в тике — видит финальные позиции. Порядок
/// проверок фиксированный; первый сработавший переход закрывает тик.
pub fn check_game_state(
    config: Res<TuningConfig>,
    clock: Res<SimClock>,
    mut session: ResMut<Session>,
    mut goal_events: EventReader<GoalReached>,
    mut incap_events: EventReader<CharacterIncapacitated>,
    tracker: Res<GroundContactTracker>,
    bodies: Query<(&Transform, &Velocity)>,
    mut scheduled: ResMut<ScheduledEvents>,
    mut rapier_config: Query<&mut RapierConfiguration>,
) {
    if !session.state.is_active() {
        goal_events.clear();
        incap_events.clear();
        return;
    }

    // Победа первой: контакт с финишем уже отфильтрован resolver'ом.
    // Несколько сегментов в сенсоре за один тик — переход все равно один.
    if goal_events.read().next().is_some() {
        session.state = SessionState::Won;
        let fire_at = clock.elapsed_ms + config.session.win_restart_delay_ms;
        let generation = session.generation;
        scheduled.push(fire_at, generation, ScheduledEffect::RestartSession);
        set_physics_pipeline(&mut rapier_config, false);
        logger::log_info("You win! Restart scheduled");
        return;
    }

    let incapacitated = incap_events.read().next().is_some();

    let (torso, enemy_body) = match session.character.as_ref() {
        Some(character) => (
            character.torso,
            session.enemy.as_ref().map(|e| e.body),
        ),
        // Персонаж мог быть снесен reset'ом в этом же тике
        None => return,
    };

    let Ok((torso_tf, torso_vel)) = bodies.get(torso) else {
        return;
    };
    let torso_pos = torso_tf.translation.truncate();
    let torso_speed = torso_vel.linvel.length();

    let s = &config.session;
    let reason: Option<String> = if incapacitated {
        Some("Character lost too many limbs!".to_string())
    } else if session.player_health == 0 {
        Some("Enemy beat you down!".to_string())
    } else if fall_detected(tracker.touch_since_ms(), clock.elapsed_ms, torso_speed, s.fall_grounded_ms, s.still_speed) {
        Some("Character fell down!".to_string())
    } else if torso_tilt(torso_tf).abs() > s.max_torso_tilt {
        Some("Character fell over!".to_string())
    } else if torso_pos.x < s.bounds_min_x
        || torso_pos.x > s.bounds_max_x
        || torso_pos.y < s.bounds_min_y
    {
        Some("Character left the level!".to_string())
    } else if let Some(enemy_body) = enemy_body {
        bodies.get(enemy_body).ok().and_then(|(enemy_tf, _)| {
            let distance = enemy_tf.translation.truncate().distance(torso_pos);
            (distance < s.catch_distance).then(|| "Enemy caught you!".to_string())
        })
    } else {
        None
    };

    if let Some(reason) = reason {
        logger::log_info(&format!("Game over: {}", reason));
        session.state = SessionState::Over { reason };
        set_physics_pipeline(&mut rapier_config, false);
    }
}

/// Угол наклона торса вокруг Z (радианы)
pub fn torso_tilt(transform: &Transform) -> f32 {
    transform.rotation.to_euler(EulerRot::ZYX).0
}

/// Падение: непрерывный контакт торса с землей дольше порога
/// при почти нулевой скорости
pub fn fall_detected(
    touch_since_ms: Option<f64>,
    now_ms: f64,
    torso_speed: f32,
    grounded_ms: f64,
    still_speed: f32,
) -> bool {
    match touch_since_ms {
        Some(since) => now_ms - since > grounded_ms && torso_speed < still_speed,
        None => false,
    }
}

fn set_physics_pipeline(query: &mut Query<&mut RapierConfiguration>, active: bool) {
    for mut config in query.iter_mut() {
        config.physics_pipeline_active = active;
    }
}
