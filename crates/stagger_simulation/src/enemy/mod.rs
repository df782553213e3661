//! Enemy AI: преследование, респаун, периодическая атака
//!
//! Двухскоростное наведение: далеко — разгон к персонажу с ограничением
//! скорости, близко — торможение вместо разгона, чтобы враг не
//! «проскакивал» и контакт оставался управляемым для damage resolution.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::components::{Enemy, Side};
use crate::config::{EnemyAttackStyle, EnemyTuning, TuningConfig};
use crate::logger;
use crate::rig;
use crate::session::{Session, SimClock};

/// Точка респауна: впереди персонажа на фиксированной высоте
pub fn respawn_point(character_x: f32, tuning: &EnemyTuning) -> Vec2 {
    Vec2::new(character_x + tuning.respawn_offset, tuning.spawn_height)
}

/// Горизонтальная скорость преследования
///
/// dx — вектор до персонажа по X. Далеко: полная скорость к цели;
/// близко: гашение текущей скорости.
pub fn steer_velocity(dx: f32, current_vx: f32, tuning: &EnemyTuning) -> f32 {
    if dx.abs() > tuning.near_distance {
        dx.signum() * tuning.max_speed
    } else {
        current_vx * tuning.near_decel
    }
}

/// Враг покинул окно камеры (scrolling-вариант)
pub fn outside_camera_window(enemy_x: f32, camera_x: f32, tuning: &EnemyTuning) -> bool {
    enemy_x < camera_x - tuning.window_behind || enemy_x > camera_x + tuning.window_ahead
}

/// Система: преследование + политика респауна
///
/// Персонаж может быть в процессе пересборки (reset в этом же тике) —
/// все обращения через null-check.
pub fn update_enemy(
    mut commands: Commands,
    config: Res<TuningConfig>,
    mut session: ResMut<Session>,
    transforms: Query<&Transform>,
    mut velocities: Query<&mut Velocity>,
) {
    if !session.state.is_active() {
        return;
    }
    let Some(torso) = session.character.as_ref().map(|c| c.torso) else {
        return;
    };
    let Ok(torso_tf) = transforms.get(torso) else {
        return;
    };
    let character_x = torso_tf.translation.x;

    // 1. Врага нет — свежий спаун впереди персонажа
    let Some(enemy_rig) = session.enemy.as_ref() else {
        let position = respawn_point(character_x, &config.enemy);
        let fresh = rig::spawn_enemy(&mut commands, &config, position, character_x);
        session.enemy = Some(fresh);
        logger::log(&format!("Enemy respawned at x={}", position.x));
        return;
    };
    let body = enemy_rig.body;
    let rig_entities = enemy_rig.entities();

    let Ok(body_tf) = transforms.get(body) else {
        session.enemy = None;
        return;
    };
    let enemy_x = body_tf.translation.x;

    // 2. Выпал из окна камеры — снести вместе с руками/пастью,
    //    новый появится на следующем тике
    let camera_x = character_x; // камера следует за персонажем
    if config.enemy.scrolling_respawn && outside_camera_window(enemy_x, camera_x, &config.enemy) {
        session.enemy = None;
        for entity in rig_entities {
            if let Ok(mut entity_commands) = commands.get_entity(entity) {
                entity_commands.despawn();
            }
        }
        logger::log("Enemy left camera window, despawned");
        return;
    }

    // 3. Наведение
    if let Ok(mut velocity) = velocities.get_mut(body) {
        let dx = character_x - enemy_x;
        velocity.linvel.x = steer_velocity(dx, velocity.linvel.x, &config.enemy);
        velocity.linvel.y = velocity
            .linvel
            .y
            .clamp(-config.enemy.max_vertical_speed, config.enemy.max_vertical_speed);
    }
}

/// Система: периодическая атака в радиусе
///
/// Таймер независим от per-tick апдейта; рука выбирается по знаку
/// относительной позиции (бьет та, что ближе к персонажу).
pub fn enemy_attack(
    config: Res<TuningConfig>,
    clock: Res<SimClock>,
    session: Res<Session>,
    transforms: Query<&Transform>,
    mut enemies: Query<&mut Enemy>,
    mut impulses: Query<&mut ExternalImpulse>,
) {
    if !session.state.is_active() {
        return;
    }
    let (Some(character), Some(enemy_rig)) = (session.character.as_ref(), session.enemy.as_ref())
    else {
        return;
    };
    let Ok(torso_tf) = transforms.get(character.torso) else {
        return;
    };
    let Ok(body_tf) = transforms.get(enemy_rig.body) else {
        return;
    };

    let torso_pos = torso_tf.translation.truncate();
    let body_pos = body_tf.translation.truncate();
    if torso_pos.distance(body_pos) > config.enemy.attack_range {
        return;
    }

    let Ok(mut enemy) = enemies.get_mut(enemy_rig.body) else {
        return;
    };
    if !enemy.attack_ready(clock.elapsed_ms, config.enemy.attack_period_ms) {
        return;
    }

    let side = if torso_pos.x < body_pos.x {
        Side::Left
    } else {
        Side::Right
    };
    let attacker = match config.enemy.attack_style {
        EnemyAttackStyle::Mouth => enemy_rig.mouth,
        EnemyAttackStyle::Arms => match side {
            Side::Left => enemy_rig.left_arm,
            Side::Right => enemy_rig.right_arm,
        },
    };
    let Some(attacker) = attacker else {
        return;
    };
    let Ok(attacker_tf) = transforms.get(attacker) else {
        return;
    };

    let dir = (torso_pos - attacker_tf.translation.truncate()).normalize_or_zero();
    if let Ok(mut impulse) = impulses.get_mut(attacker) {
        impulse.impulse += dir * config.enemy.attack_impulse;
        enemy.last_attack_ms = clock.elapsed_ms;
        logger::log(&format!("Enemy attack: {:?} side", side));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respawn_ahead_of_character() {
        let tuning = EnemyTuning::default();
        // Персонаж на x=1000 → респаун на 1400, высота 50 над землей
        let point = respawn_point(1000.0, &tuning);
        assert_eq!(point.x, 1400.0);
        assert_eq!(point.y, 50.0);
    }

    #[test]
    fn test_two_speed_steering() {
        let tuning = EnemyTuning::default();

        // Далеко: полная скорость в сторону персонажа
        assert_eq!(steer_velocity(500.0, 0.0, &tuning), tuning.max_speed);
        assert_eq!(steer_velocity(-500.0, 0.0, &tuning), -tuning.max_speed);

        // Близко: торможение вместо разгона
        let braked = steer_velocity(50.0, 100.0, &tuning);
        assert_eq!(braked, 50.0); // 100 * 0.5
        assert!(braked.abs() < tuning.max_speed);
    }

    #[test]
    fn test_camera_window_bounds() {
        let tuning = EnemyTuning::default();
        let camera_x = 1000.0;

        assert!(outside_camera_window(899.0, camera_x, &tuning)); // < cam - 100
        assert!(!outside_camera_window(900.0, camera_x, &tuning));
        assert!(!outside_camera_window(1900.0, camera_x, &tuning));
        assert!(outside_camera_window(1901.0, camera_x, &tuning)); // > cam + 900
    }
}
