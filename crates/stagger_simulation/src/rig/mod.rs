//! Body Catalog: сборка ригов персонажа, врага и статики уровня
//!
//! Все rigid body, коллайдеры и пружинные joints создаются здесь.
//! Константы топологии (анкеры плеч/локтей/бедер/коленей) — design
//! parameters, не выводятся.
//!
//! Координаты y-вверх, верх земли на y = 0.

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::components::{ControlCooldown, Enemy, LimbHealth, SegmentRole, Side};
use crate::config::{EnemyAttackStyle, RigTuning, RigVariant, TuningConfig};
use crate::logger;
use crate::session::{CharacterRig, EnemyRig, LevelRig, Session, SessionState};

/// Collision категории (маска 255 у игрока = Group::ALL)
pub const GROUND_GROUP: Group = Group::GROUP_1;
pub const PLAYER_GROUP: Group = Group::GROUP_2;
pub const ENEMY_GROUP: Group = Group::GROUP_3;
pub const ENEMY_LIMB_GROUP: Group = Group::GROUP_4;
pub const GOAL_GROUP: Group = Group::GROUP_5;

/// Y-координата центра торса при спауне: ступни на земле
pub fn torso_spawn_y(rig: &RigTuning) -> f32 {
    rig.limb_length + rig.torso_height / 2.0
}

/// Набор слотов конечностей данного варианта рига
pub fn limb_roles(variant: RigVariant) -> Vec<SegmentRole> {
    use SegmentRole::*;
    match variant {
        RigVariant::FourLimb => vec![
            UpperArm(Side::Left),
            UpperArm(Side::Right),
            UpperLeg(Side::Left),
            UpperLeg(Side::Right),
        ],
        RigVariant::EightSegment => vec![
            UpperArm(Side::Left),
            LowerArm(Side::Left),
            UpperArm(Side::Right),
            LowerArm(Side::Right),
            UpperLeg(Side::Left),
            LowerLeg(Side::Left),
            UpperLeg(Side::Right),
            LowerLeg(Side::Right),
        ],
    }
}

/// Спаун одного сегмента с полным физическим набором
fn spawn_segment(
    commands: &mut Commands,
    role: SegmentRole,
    position: Vec2,
    collider: Collider,
    rig: &RigTuning,
    groups: CollisionGroups,
) -> Entity {
    commands
        .spawn((
            role,
            Transform::from_xyz(position.x, position.y, 0.0),
            RigidBody::Dynamic,
            collider,
            Velocity::default(),
            ExternalImpulse::default(),
            Damping {
                linear_damping: rig.linear_damping,
                angular_damping: rig.angular_damping,
            },
            Friction::coefficient(rig.ground_friction),
            ColliderMassProperties::Density(rig.density),
            groups,
            ActiveEvents::COLLISION_EVENTS,
        ))
        .id()
}

/// Пружинный constraint между parent и child на заданных анкерах
///
/// Аналог matter-констрейнта с length = 0: stiffness/damping из конфига.
fn attach(
    commands: &mut Commands,
    child: Entity,
    parent: Entity,
    parent_anchor: Vec2,
    child_anchor: Vec2,
    rig: &RigTuning,
) {
    let joint = SpringJointBuilder::new(0.0, rig.joint_stiffness, rig.joint_damping)
        .local_anchor1(parent_anchor)
        .local_anchor2(child_anchor);
    commands.entity(child).insert(ImpulseJoint::new(parent, joint));
}

/// Собрать персонажа: сегменты по топологии варианта + joints
///
/// Невалидные координаты спауна не проверяются — симуляция просто
/// начнется из нефизичного состояния.
pub fn spawn_character(commands: &mut Commands, config: &TuningConfig) -> CharacterRig {
    let rig = &config.rig;
    let x = rig.spawn_x;
    let torso_y = torso_spawn_y(rig);
    let half_w = rig.limb_width / 2.0;
    let player = CollisionGroups::new(PLAYER_GROUP, Group::ALL);

    let torso = spawn_segment(
        commands,
        SegmentRole::Torso,
        Vec2::new(x, torso_y),
        Collider::cuboid(rig.torso_width / 2.0, rig.torso_height / 2.0),
        rig,
        player,
    );
    let head = spawn_segment(
        commands,
        SegmentRole::Head,
        Vec2::new(x, torso_y + rig.torso_height / 2.0 + rig.head_radius),
        Collider::ball(rig.head_radius),
        rig,
        player,
    );
    attach(
        commands,
        head,
        torso,
        Vec2::new(0.0, rig.torso_height / 2.0),
        Vec2::new(0.0, -rig.head_radius),
        rig,
    );

    let mut limbs = Vec::new();
    let mut add_limb = |commands: &mut Commands, role: SegmentRole, pos: Vec2, half_len: f32| {
        let entity = spawn_segment(
            commands,
            role,
            pos,
            Collider::cuboid(half_w, half_len),
            rig,
            player,
        );
        commands
            .entity(entity)
            .insert((LimbHealth::new(config.damage.limb_health), ControlCooldown::default()));
        limbs.push((role, entity));
        entity
    };

    match rig.variant {
        RigVariant::FourLimb => {
            let half_len = rig.limb_length / 2.0;
            for side in [Side::Left, Side::Right] {
                let sx = side_sign(side);

                // Рука: висит сбоку торса, крепление к плечу
                let arm = add_limb(
                    commands,
                    SegmentRole::UpperArm(side),
                    Vec2::new(x + sx * 40.0, torso_y),
                    half_len,
                );
                attach(
                    commands,
                    arm,
                    torso,
                    Vec2::new(sx * 20.0, 10.0),
                    Vec2::new(0.0, half_len),
                    rig,
                );

                // Нога: под торсом, крепление к бедру
                let leg = add_limb(
                    commands,
                    SegmentRole::UpperLeg(side),
                    Vec2::new(x + sx * 15.0, torso_y - 50.0),
                    half_len,
                );
                attach(
                    commands,
                    leg,
                    torso,
                    Vec2::new(sx * 15.0, -30.0),
                    Vec2::new(0.0, half_len),
                    rig,
                );
            }
        }
        RigVariant::EightSegment => {
            // Конечность разбита пополам: upper к торсу, lower к upper
            let half_len = rig.limb_length / 4.0;
            let seg_len = rig.limb_length / 2.0;
            for side in [Side::Left, Side::Right] {
                let sx = side_sign(side);

                let upper_arm = add_limb(
                    commands,
                    SegmentRole::UpperArm(side),
                    Vec2::new(x + sx * 40.0, torso_y + 15.0),
                    half_len,
                );
                attach(
                    commands,
                    upper_arm,
                    torso,
                    Vec2::new(sx * 20.0, 10.0),
                    Vec2::new(0.0, half_len),
                    rig,
                );
                let lower_arm = add_limb(
                    commands,
                    SegmentRole::LowerArm(side),
                    Vec2::new(x + sx * 40.0, torso_y + 15.0 - seg_len),
                    half_len,
                );
                // Локоть
                attach(
                    commands,
                    lower_arm,
                    upper_arm,
                    Vec2::new(0.0, -half_len),
                    Vec2::new(0.0, half_len),
                    rig,
                );

                let upper_leg = add_limb(
                    commands,
                    SegmentRole::UpperLeg(side),
                    Vec2::new(x + sx * 15.0, torso_y - rig.torso_height / 2.0 - half_len),
                    half_len,
                );
                attach(
                    commands,
                    upper_leg,
                    torso,
                    Vec2::new(sx * 15.0, -rig.torso_height / 2.0),
                    Vec2::new(0.0, half_len),
                    rig,
                );
                let lower_leg = add_limb(
                    commands,
                    SegmentRole::LowerLeg(side),
                    Vec2::new(
                        x + sx * 15.0,
                        torso_y - rig.torso_height / 2.0 - half_len - seg_len,
                    ),
                    half_len,
                );
                // Колено
                attach(
                    commands,
                    lower_leg,
                    upper_leg,
                    Vec2::new(0.0, -half_len),
                    Vec2::new(0.0, half_len),
                    rig,
                );
            }
        }
    }

    CharacterRig::new(torso, head, limbs)
}

/// Собрать врага в точке спауна
///
/// Направление «лицом» выбирается сравнением X спауна с X персонажа.
pub fn spawn_enemy(
    commands: &mut Commands,
    config: &TuningConfig,
    position: Vec2,
    character_x: f32,
) -> EnemyRig {
    let rig = &config.rig;
    let facing = if character_x < position.x { -1.0 } else { 1.0 };

    let body = spawn_segment(
        commands,
        SegmentRole::EnemyBody,
        position,
        Collider::cuboid(15.0, 25.0),
        rig,
        CollisionGroups::new(ENEMY_GROUP, Group::ALL),
    );
    commands
        .entity(body)
        .insert(Enemy::new(config.damage.enemy_health));

    let mut enemy = EnemyRig {
        body,
        left_arm: None,
        right_arm: None,
        mouth: None,
    };

    match config.enemy.attack_style {
        EnemyAttackStyle::Arms => {
            for side in [Side::Left, Side::Right] {
                let sx = side_sign(side);
                let arm = spawn_segment(
                    commands,
                    SegmentRole::EnemyArm(side),
                    position + Vec2::new(sx * 22.0, 5.0),
                    Collider::cuboid(5.0, 14.0),
                    rig,
                    CollisionGroups::new(ENEMY_LIMB_GROUP, Group::ALL),
                );
                attach(
                    commands,
                    arm,
                    body,
                    Vec2::new(sx * 15.0, 15.0),
                    Vec2::new(0.0, 14.0),
                    rig,
                );
                match side {
                    Side::Left => enemy.left_arm = Some(arm),
                    Side::Right => enemy.right_arm = Some(arm),
                }
            }
        }
        EnemyAttackStyle::Mouth => {
            // Sensor-пасть перед корпусом, жестко прикручена
            let mouth = commands
                .spawn((
                    SegmentRole::EnemyMouth,
                    Transform::from_xyz(position.x + facing * 22.0, position.y + 10.0, 0.0),
                    RigidBody::Dynamic,
                    Collider::ball(9.0),
                    Sensor,
                    Velocity::default(),
                    ExternalImpulse::default(),
                    ColliderMassProperties::Density(rig.density),
                    CollisionGroups::new(ENEMY_LIMB_GROUP, Group::ALL),
                    ActiveEvents::COLLISION_EVENTS,
                ))
                .id();
            let joint = FixedJointBuilder::new()
                .local_anchor1(Vec2::new(facing * 22.0, 10.0))
                .local_anchor2(Vec2::ZERO);
            commands.entity(mouth).insert(ImpulseJoint::new(body, joint));
            enemy.mouth = Some(mouth);
        }
    }

    enemy
}

/// Статика уровня: земля + финишный sensor
pub fn spawn_level(commands: &mut Commands, config: &TuningConfig) -> LevelRig {
    let s = &config.session;

    let ground = commands
        .spawn((
            SegmentRole::Ground,
            Transform::from_xyz(s.ground_center_x, -s.ground_half_height, 0.0),
            RigidBody::Fixed,
            Collider::cuboid(s.ground_half_width, s.ground_half_height),
            Friction::coefficient(config.rig.ground_friction),
            CollisionGroups::new(GROUND_GROUP, Group::ALL),
        ))
        .id();

    let goal = commands
        .spawn((
            SegmentRole::Goal,
            Transform::from_xyz(s.goal_x, s.goal_half_height, 0.0),
            RigidBody::Fixed,
            Collider::cuboid(s.goal_half_width, s.goal_half_height),
            Sensor,
            CollisionGroups::new(GOAL_GROUP, Group::ALL),
            ActiveEvents::COLLISION_EVENTS,
        ))
        .id();

    LevelRig {
        ground,
        goal,
        goal_x: s.goal_x,
    }
}

/// Полная сборка сессии: уровень, персонаж, враг, стартовые счетчики
///
/// Используется и для первого спауна, и для reset — ровно один путь.
pub fn spawn_session(commands: &mut Commands, config: &TuningConfig, session: &mut Session) {
    session.level = Some(spawn_level(commands, config));

    let character = spawn_character(commands, config);
    let character_x = config.rig.spawn_x;
    session.enemy = Some(spawn_enemy(
        commands,
        config,
        Vec2::new(config.enemy.spawn_x, config.enemy.spawn_height),
        character_x,
    ));
    session.character = Some(character);
    session.player_health = config.damage.player_health;
    session.state = SessionState::Active;

    logger::log(&format!(
        "Session spawned: rig {:?}, enemy at x={}",
        config.rig.variant, config.enemy.spawn_x
    ));
}

fn side_sign(side: Side) -> f32 {
    match side {
        Side::Left => -1.0,
        Side::Right => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torso_spawn_height() {
        let rig = RigTuning::default();
        // Ступни на земле: ноги 60 + половина торса 40
        assert_eq!(torso_spawn_y(&rig), 100.0);
    }

    #[test]
    fn test_limb_roles_per_variant() {
        let four = limb_roles(RigVariant::FourLimb);
        assert_eq!(four.len(), 4);
        assert!(four.iter().all(|r| r.is_upper_limb()));

        let eight = limb_roles(RigVariant::EightSegment);
        assert_eq!(eight.len(), 8);
        assert_eq!(eight.iter().filter(|r| r.is_upper_limb()).count(), 4);
    }

    #[test]
    fn test_facing_sign() {
        assert_eq!(side_sign(Side::Left), -1.0);
        assert_eq!(side_sign(Side::Right), 1.0);
    }
}
