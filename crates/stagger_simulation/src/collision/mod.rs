//! Collision Resolver: сырые contact-пары → доменные события
//!
//! Раз в тик получает батч CollisionEvent'ов от физики и классифицирует
//! каждую пару по ролям сегментов. Порядок правил фиксированный:
//! торс–земля, часть–финиш, рука–враг, атака врага–конечность.
//! Вне Active батч читается и отбрасывается целиком.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::combat::{EnemyStruck, LimbHit};
use crate::components::SegmentRole;
use crate::config::TuningConfig;
use crate::logger;
use crate::session::{Session, SimClock};

/// Событие: сегмент персонажа вошел в финишный sensor
#[derive(Event, Debug, Clone, Copy)]
pub struct GoalReached;

/// Трекер «торс лежит на земле»
///
/// Начинается на collision-start пары торс–земля, снимается на
/// collision-end. Продвижение затяжного контакта в падение делает
/// check_game_state.
#[derive(Resource, Debug, Default)]
pub struct GroundContactTracker {
    touch_since_ms: Option<f64>,
}

impl GroundContactTracker {
    pub fn begin(&mut self, now_ms: f64) {
        if self.touch_since_ms.is_none() {
            self.touch_since_ms = Some(now_ms);
        }
    }

    pub fn end(&mut self) {
        self.touch_since_ms = None;
    }

    pub fn clear(&mut self) {
        self.touch_since_ms = None;
    }

    pub fn touch_since_ms(&self) -> Option<f64> {
        self.touch_since_ms
    }
}

/// Гейт между любыми засчитанными ударами врага по игроку
///
/// Независим от per-limb cooldown'а урона: не дает врагу «дробить»
/// один замах на серию попаданий по разным сегментам.
#[derive(Resource, Debug, Clone, Copy)]
pub struct EnemyHitGate {
    pub last_hit_ms: f64,
}

impl Default for EnemyHitGate {
    fn default() -> Self {
        Self {
            last_hit_ms: f64::MIN,
        }
    }
}

impl EnemyHitGate {
    pub fn ready(&self, now_ms: f64, cooldown_ms: f64) -> bool {
        now_ms - self.last_hit_ms >= cooldown_ms
    }

    pub fn trigger(&mut self, now_ms: f64) {
        self.last_hit_ms = now_ms;
    }
}

/// Классифицированная пара (в каноническом порядке)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    TorsoGround,
    PartGoal,
    ArmEnemy,
    EnemyAttackerLimb,
}

fn classify_ordered(a: SegmentRole, b: SegmentRole) -> Option<PairKind> {
    use SegmentRole::*;
    // Фиксированный приоритет правил
    if a == Torso && b == Ground {
        return Some(PairKind::TorsoGround);
    }
    if a.is_player_part() && b == Goal {
        return Some(PairKind::PartGoal);
    }
    if a.is_player_arm() && b == EnemyBody {
        return Some(PairKind::ArmEnemy);
    }
    if a.is_enemy_attacker() && (b.is_player_limb() || b == Torso) {
        return Some(PairKind::EnemyAttackerLimb);
    }
    None
}

/// Классификация пары ролей; bool = пара пришла в обратном порядке
pub fn classify(a: SegmentRole, b: SegmentRole) -> Option<(PairKind, bool)> {
    classify_ordered(a, b)
        .map(|kind| (kind, false))
        .or_else(|| classify_ordered(b, a).map(|kind| (kind, true)))
}

/// Система: обработка батча contact-пар за один physics step
#[allow(clippy::too_many_arguments)]
pub fn resolve_collisions(
    config: Res<TuningConfig>,
    clock: Res<SimClock>,
    mut session: ResMut<Session>,
    mut collision_events: EventReader<CollisionEvent>,
    roles: Query<&SegmentRole>,
    velocities: Query<&Velocity>,
    transforms: Query<&Transform>,
    mut impulses: Query<&mut ExternalImpulse>,
    mut tracker: ResMut<GroundContactTracker>,
    mut gate: ResMut<EnemyHitGate>,
    mut goal_events: EventWriter<GoalReached>,
    mut limb_hits: EventWriter<LimbHit>,
    mut strikes: EventWriter<EnemyStruck>,
) {
    if !session.state.is_active() {
        collision_events.clear();
        return;
    }
    let now = clock.elapsed_ms;

    for event in collision_events.read() {
        let (e1, e2, started) = match event {
            CollisionEvent::Started(e1, e2, _) => (*e1, *e2, true),
            CollisionEvent::Stopped(e1, e2, _) => (*e1, *e2, false),
        };
        // Пары без роли (нет такого сегмента) игнорируются молча
        let (Ok(role1), Ok(role2)) = (roles.get(e1), roles.get(e2)) else {
            continue;
        };
        let Some((kind, swapped)) = classify(*role1, *role2) else {
            continue;
        };
        let (first, second) = if swapped { (e2, e1) } else { (e1, e2) };
        let second_role = if swapped { *role1 } else { *role2 };

        match kind {
            PairKind::TorsoGround => {
                if started {
                    tracker.begin(now);
                } else {
                    tracker.end();
                }
            }

            PairKind::PartGoal => {
                if !started {
                    continue;
                }
                // Явная дистанционная проверка: sensor у финиша крупный,
                // касание краем bounding box'а не считаем
                let (Some(level), Some(character)) =
                    (session.level.as_ref(), session.character.as_ref())
                else {
                    continue;
                };
                let Ok(torso_tf) = transforms.get(character.torso) else {
                    continue;
                };
                if (torso_tf.translation.x - level.goal_x).abs()
                    <= config.session.goal_capture_range
                {
                    goal_events.write(GoalReached);
                }
            }

            PairKind::ArmEnemy => {
                if !started {
                    continue;
                }
                // Скорость контакта: скользящее касание не засчитываем
                let arm_vel = velocities.get(first).map(|v| v.linvel).unwrap_or(Vec2::ZERO);
                let enemy_vel = velocities
                    .get(second)
                    .map(|v| v.linvel)
                    .unwrap_or(Vec2::ZERO);
                let impact_speed = (arm_vel - enemy_vel).length();
                if impact_speed < config.damage.min_impact_speed {
                    continue;
                }
                let (Ok(arm_tf), Ok(enemy_tf)) = (transforms.get(first), transforms.get(second))
                else {
                    continue;
                };
                let dir = (enemy_tf.translation.truncate() - arm_tf.translation.truncate())
                    .normalize_or_zero();
                strikes.write(EnemyStruck { dir, impact_speed });
            }

            PairKind::EnemyAttackerLimb => {
                if !started {
                    continue;
                }
                if !gate.ready(now, config.damage.enemy_hit_cooldown_ms) {
                    continue;
                }
                gate.trigger(now);

                session.player_health = session.player_health.saturating_sub(1);
                logger::log(&format!(
                    "Player hit by enemy, {} HP left",
                    session.player_health
                ));

                if second_role.is_player_limb() {
                    limb_hits.write(LimbHit {
                        entity: second,
                        role: second_role,
                    });
                }

                // Knockback торсу от атакующей части
                let Some(character) = session.character.as_ref() else {
                    continue;
                };
                let torso = character.torso;
                let (Ok(torso_tf), Ok(attacker_tf)) =
                    (transforms.get(torso), transforms.get(first))
                else {
                    continue;
                };
                let dir = (torso_tf.translation.truncate()
                    - attacker_tf.translation.truncate())
                .normalize_or_zero();
                if let Ok(mut impulse) = impulses.get_mut(torso) {
                    impulse.impulse +=
                        dir * config.enemy.attack_impulse * config.damage.knockback_scale;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Side;
    use SegmentRole::*;

    #[test]
    fn test_classify_torso_ground_both_orders() {
        assert_eq!(classify(Torso, Ground), Some((PairKind::TorsoGround, false)));
        assert_eq!(classify(Ground, Torso), Some((PairKind::TorsoGround, true)));
    }

    #[test]
    fn test_classify_priority_ground_over_goal() {
        // Торс–земля имеет приоритет в фиксированном порядке правил:
        // правило проверяется раньше даже для "sensor-подобных" пар
        assert_eq!(
            classify_ordered(Torso, Ground),
            Some(PairKind::TorsoGround)
        );
        assert_eq!(classify_ordered(Torso, Goal), Some(PairKind::PartGoal));
    }

    #[test]
    fn test_classify_any_part_reaches_goal() {
        assert_eq!(
            classify(Head, Goal),
            Some((PairKind::PartGoal, false))
        );
        assert_eq!(
            classify(Goal, UpperLeg(Side::Left)),
            Some((PairKind::PartGoal, true))
        );
    }

    #[test]
    fn test_classify_combat_pairs() {
        assert_eq!(
            classify(LowerArm(Side::Right), EnemyBody),
            Some((PairKind::ArmEnemy, false))
        );
        assert_eq!(
            classify(UpperLeg(Side::Left), EnemyArm(Side::Right)),
            Some((PairKind::EnemyAttackerLimb, true))
        );
        assert_eq!(
            classify(EnemyMouth, Torso),
            Some((PairKind::EnemyAttackerLimb, false))
        );
        // Нога игрока по врагу — не удар
        assert_eq!(classify(UpperLeg(Side::Left), EnemyBody), None);
        // Голова не конечность и не рука
        assert_eq!(classify(Head, EnemyBody), None);
        // Земля–враг никого не интересует
        assert_eq!(classify(Ground, EnemyBody), None);
    }

    #[test]
    fn test_ground_tracker_begin_end() {
        let mut tracker = GroundContactTracker::default();
        assert!(tracker.touch_since_ms().is_none());

        tracker.begin(100.0);
        assert_eq!(tracker.touch_since_ms(), Some(100.0));

        // Повторный start того же контакта не сдвигает отметку
        tracker.begin(300.0);
        assert_eq!(tracker.touch_since_ms(), Some(100.0));

        tracker.end();
        assert!(tracker.touch_since_ms().is_none());
    }

    #[test]
    fn test_enemy_hit_gate() {
        let mut gate = EnemyHitGate::default();
        assert!(gate.ready(0.0, 420.0));

        gate.trigger(1000.0);
        assert!(!gate.ready(1419.0, 420.0));
        assert!(gate.ready(1420.0, 420.0));
    }
}
