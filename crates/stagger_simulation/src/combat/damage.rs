//! Damage model: cooldown-гейт, потеря конечностей, несдееспособность
//!
//! Уничтожение конечности — despawn сегмента + очистка слота в
//! CharacterRig. Повторный урон невозможен по построению: entity
//! больше нет, Query::get вернет Err.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::components::{Enemy, LimbHealth, SegmentRole};
use crate::config::TuningConfig;
use crate::logger;
use crate::session::{Session, SimClock};

/// Событие: атака врага дошла до конечности (от collision resolver)
#[derive(Event, Debug, Clone, Copy)]
pub struct LimbHit {
    pub entity: Entity,
    pub role: SegmentRole,
}

/// Событие: рука игрока ударила врага с достаточной скоростью
#[derive(Event, Debug, Clone, Copy)]
pub struct EnemyStruck {
    /// Направление от руки к врагу (normalized)
    pub dir: Vec2,
    pub impact_speed: f32,
}

/// Событие: персонаж потерял слишком много конечностей
#[derive(Event, Debug, Clone, Copy)]
pub struct CharacterIncapacitated;

/// Косметический сигнал host'у (tint, blink, shake)
#[derive(Event, Debug, Clone, Copy)]
pub struct VisualCue {
    pub kind: CueKind,
}

#[derive(Debug, Clone, Copy)]
pub enum CueKind {
    /// Эскалация подсветки поврежденной конечности (severity 1..=max)
    LimbTint { role: SegmentRole, severity: u8 },
    /// Alpha-blink врага при попадании
    EnemyBlink,
    CameraShake,
}

/// Результат одной попытки урона
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Cooldown не истек — удар не засчитан
    Cooldown,
    Damaged { remaining: u32 },
    Destroyed,
}

/// Попытка нанести 1 урона конечности
///
/// Гейт: с момента прошлого засчитанного урона должен пройти cooldown,
/// иначе один затяжной контакт считался бы каждый тик.
pub fn try_damage(health: &mut LimbHealth, now_ms: f64, cooldown_ms: f64) -> DamageOutcome {
    if health.on_cooldown(now_ms, cooldown_ms) {
        return DamageOutcome::Cooldown;
    }
    health.current = health.current.saturating_sub(1);
    health.last_damage_ms = now_ms;
    if health.is_destroyed() {
        DamageOutcome::Destroyed
    } else {
        DamageOutcome::Damaged {
            remaining: health.current,
        }
    }
}

/// Система: применение LimbHit событий
///
/// 1. Cooldown-гейт per-limb
/// 2. Эскалация tint'а на 2 и 1 HP
/// 3. На нуле — despawn сегмента, очистка слота, проверка несдееспособности
pub fn apply_limb_damage(
    mut commands: Commands,
    config: Res<TuningConfig>,
    clock: Res<SimClock>,
    mut session: ResMut<Session>,
    mut hits: EventReader<LimbHit>,
    mut limbs: Query<&mut LimbHealth>,
    mut incapacitated: EventWriter<CharacterIncapacitated>,
    mut cues: EventWriter<VisualCue>,
) {
    if !session.state.is_active() {
        hits.clear();
        return;
    }

    for hit in hits.read() {
        // Конечность могла быть уничтожена раньше в этом же батче
        let Ok(mut health) = limbs.get_mut(hit.entity) else {
            continue;
        };

        match try_damage(&mut health, clock.elapsed_ms, config.damage.limb_damage_cooldown_ms) {
            DamageOutcome::Cooldown => {}
            DamageOutcome::Damaged { remaining } => {
                let severity = (health.max - remaining) as u8;
                cues.write(VisualCue {
                    kind: CueKind::LimbTint {
                        role: hit.role,
                        severity,
                    },
                });
                logger::log(&format!(
                    "Limb {:?} damaged, {} HP left",
                    hit.role, remaining
                ));
            }
            DamageOutcome::Destroyed => {
                if let Ok(mut entity_commands) = commands.get_entity(hit.entity) {
                    entity_commands.despawn();
                }
                let Some(character) = session.character.as_mut() else {
                    continue;
                };
                character.clear_limb(hit.role);
                logger::log_info(&format!("Limb {:?} destroyed", hit.role));

                if character.active_upper_limbs() < config.damage.min_active_upper_limbs {
                    incapacitated.write(CharacterIncapacitated);
                    logger::log_warning("Character incapacitated: too few limbs left");
                }
            }
        }
    }
}

/// Система: применение EnemyStruck событий
///
/// Knockback пропорционален скорости удара; на нуле здоровья враг
/// уничтожается (AI заспаунит нового впереди персонажа).
pub fn apply_enemy_damage(
    mut commands: Commands,
    config: Res<TuningConfig>,
    mut session: ResMut<Session>,
    mut strikes: EventReader<EnemyStruck>,
    mut enemies: Query<&mut Enemy>,
    mut impulses: Query<&mut ExternalImpulse>,
    mut cues: EventWriter<VisualCue>,
) {
    if !session.state.is_active() {
        strikes.clear();
        return;
    }

    for strike in strikes.read() {
        let Some(rig) = session.enemy.as_ref() else {
            break;
        };
        let body = rig.body;
        let rig_entities = rig.entities();

        if let Ok(mut impulse) = impulses.get_mut(body) {
            impulse.impulse += strike.dir * strike.impact_speed * config.damage.knockback_scale;
        }

        let Ok(mut enemy) = enemies.get_mut(body) else {
            continue;
        };
        enemy.health = enemy.health.saturating_sub(1);
        cues.write(VisualCue {
            kind: CueKind::EnemyBlink,
        });

        if enemy.health == 0 {
            session.enemy = None;
            for entity in rig_entities {
                if let Ok(mut entity_commands) = commands.get_entity(entity) {
                    entity_commands.despawn();
                }
            }
            logger::log_info("Enemy destroyed");
        }
    }
}
