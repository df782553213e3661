//! Limb Controller: input → импульсы на сегменты конечностей
//!
//! Input приходит из host'а через LimbInput resource (для headless
//! тестов — mock input, как и всё остальное управление).
//!
//! Каждая конечность гейтится cooldown'ом в тиках: без него силы
//! накапливаются быстрее, чем constraint solver остается стабильным.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::combat::{CueKind, VisualCue};
use crate::components::{ControlCooldown, SegmentRole, Side};
use crate::config::TuningConfig;
use crate::logger;
use crate::session::{Session, SimClock};

/// Пара направлений одной конечности (isDown-состояние клавиш)
#[derive(Debug, Default, Clone, Copy)]
pub struct AxisInput {
    pub raise: bool,
    pub lower: bool,
}

impl AxisInput {
    /// Результирующее направление: обе клавиши гасят друг друга
    pub fn direction(&self) -> f32 {
        (self.raise as i8 - self.lower as i8) as f32
    }
}

/// Состояние ввода, заполняется host'ом раз в тик
///
/// Поля *_pressed — edge-triggered ("just pressed"), сбрасываются
/// в конце тика системой clear_input_edges.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct LimbInput {
    /// Q/A
    pub left_arm: AxisInput,
    /// P/L
    pub right_arm: AxisInput,
    /// W/S
    pub left_leg: AxisInput,
    /// O/K
    pub right_leg: AxisInput,
    pub punch_pressed: bool,
    pub pause_pressed: bool,
    pub reset_pressed: bool,
}

impl LimbInput {
    /// Фиксированная привязка осей к слотам рига
    /// (в 8-сегментном варианте управляются upper-сегменты)
    pub fn axes(&self) -> [(SegmentRole, AxisInput); 4] {
        [
            (SegmentRole::UpperArm(Side::Left), self.left_arm),
            (SegmentRole::UpperArm(Side::Right), self.right_arm),
            (SegmentRole::UpperLeg(Side::Left), self.left_leg),
            (SegmentRole::UpperLeg(Side::Right), self.right_leg),
        ]
    }
}

/// Состояние джеба: чередование рук + ms-cooldown
#[derive(Resource, Debug, Clone, Copy)]
pub struct PunchState {
    pub next_side: Side,
    pub last_punch_ms: f64,
}

impl Default for PunchState {
    fn default() -> Self {
        Self {
            next_side: Side::Left,
            last_punch_ms: f64::MIN,
        }
    }
}

impl PunchState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn ready(&self, now_ms: f64, cooldown_ms: f64) -> bool {
        now_ms - self.last_punch_ms >= cooldown_ms
    }

    fn alternate(&mut self) -> Side {
        let side = self.next_side;
        self.next_side = match side {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        };
        side
    }
}

/// Система: вертикальные импульсы конечностей от удерживаемых клавиш
///
/// Уничтоженная конечность (entity нет) — молчаливый no-op.
pub fn apply_limb_controls(
    session: Res<Session>,
    config: Res<TuningConfig>,
    input: Res<LimbInput>,
    mut limbs: Query<(&mut ControlCooldown, &mut ExternalImpulse)>,
) {
    if !session.state.is_active() {
        return;
    }
    let Some(character) = session.character.as_ref() else {
        return;
    };

    for (role, axis) in input.axes() {
        let direction = axis.direction();
        if direction == 0.0 {
            continue;
        }
        let Some(entity) = character.limb(role) else {
            continue;
        };
        let Ok((mut cooldown, mut impulse)) = limbs.get_mut(entity) else {
            continue;
        };
        if !cooldown.ready() {
            continue;
        }
        impulse.impulse += Vec2::new(0.0, direction * config.control.limb_impulse);
        cooldown.arm(config.control.cooldown_ticks);
    }
}

/// Система: декремент тиковых cooldown'ов (независимо от input)
pub fn tick_control_cooldowns(
    session: Res<Session>,
    mut cooldowns: Query<&mut ControlCooldown>,
) {
    if !session.state.is_active() {
        return;
    }
    for mut cooldown in cooldowns.iter_mut() {
        cooldown.tick();
    }
}

/// Система: джеб по edge-нажатию
///
/// Чередует руки, обнуляет их скорость перед импульсом (иначе замах
/// складывается с остаточным вращением) и держит ms-cooldown,
/// независимый от тикового.
pub fn apply_punch(
    session: Res<Session>,
    config: Res<TuningConfig>,
    input: Res<LimbInput>,
    clock: Res<SimClock>,
    mut punch: ResMut<PunchState>,
    mut bodies: Query<(&mut Velocity, &mut ExternalImpulse)>,
    mut cues: EventWriter<VisualCue>,
) {
    if !session.state.is_active() || !input.punch_pressed {
        return;
    }
    if !punch.ready(clock.elapsed_ms, config.control.punch_cooldown_ms) {
        return;
    }
    let Some(character) = session.character.as_ref() else {
        return;
    };

    let side = punch.alternate();
    let Some(upper) = character.limb(SegmentRole::UpperArm(side)) else {
        // Рука потеряна: cooldown не тратим, в следующий раз бьет другая
        return;
    };

    let c = &config.control;
    if let Ok((mut velocity, mut impulse)) = bodies.get_mut(upper) {
        velocity.linvel = Vec2::ZERO;
        velocity.angvel = 0.0;
        impulse.impulse += Vec2::new(c.punch_upper_x, c.punch_upper_y);
    }
    // Lower-сегмент бьет сильнее (есть только в 8-сегментном риге)
    if let Some(lower) = character.limb(SegmentRole::LowerArm(side)) {
        if let Ok((mut velocity, mut impulse)) = bodies.get_mut(lower) {
            velocity.linvel = Vec2::ZERO;
            velocity.angvel = 0.0;
            impulse.impulse += Vec2::new(c.punch_lower_x, c.punch_lower_y);
        }
    }

    punch.last_punch_ms = clock.elapsed_ms;
    cues.write(VisualCue {
        kind: CueKind::CameraShake,
    });
    logger::log(&format!("Punch: {:?} arm", side));
}

/// Система: сброс edge-флагов в конце тика
pub fn clear_input_edges(mut input: ResMut<LimbInput>) {
    input.punch_pressed = false;
    input.pause_pressed = false;
    input.reset_pressed = false;
}

/// Система: обнуление one-shot импульсов после physics step
///
/// Первая в post-physics цепочке: импульсы поставленные до шага уже
/// применены, а поставленные ПОСЛЕ (атака врага, knockback) доживут
/// до следующего шага.
pub fn reset_one_shot_impulses(mut impulses: Query<&mut ExternalImpulse>) {
    for mut impulse in impulses.iter_mut() {
        impulse.impulse = Vec2::ZERO;
        impulse.torque_impulse = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_direction() {
        let mut axis = AxisInput::default();
        assert_eq!(axis.direction(), 0.0);

        axis.raise = true;
        assert_eq!(axis.direction(), 1.0);

        axis.lower = true; // обе клавиши — гасятся
        assert_eq!(axis.direction(), 0.0);

        axis.raise = false;
        assert_eq!(axis.direction(), -1.0);
    }

    #[test]
    fn test_punch_alternates_sides() {
        let mut punch = PunchState::default();
        assert_eq!(punch.alternate(), Side::Left);
        assert_eq!(punch.alternate(), Side::Right);
        assert_eq!(punch.alternate(), Side::Left);
    }

    #[test]
    fn test_punch_cooldown_window() {
        let mut punch = PunchState::default();
        assert!(punch.ready(0.0, 500.0)); // первый джеб сразу

        punch.last_punch_ms = 1000.0;
        assert!(!punch.ready(1400.0, 500.0));
        assert!(punch.ready(1500.0, 500.0));
    }

    #[test]
    fn test_axes_cover_four_slots() {
        let input = LimbInput::default();
        let roles: Vec<_> = input.axes().iter().map(|(r, _)| *r).collect();
        assert_eq!(roles.len(), 4);
        assert!(roles.iter().all(|r| r.is_upper_limb()));
    }
}
