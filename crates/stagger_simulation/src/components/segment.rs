//! Сегменты рига: роли, здоровье конечностей, cooldown управления
//!
//! Роль — закрытый enum вместо строковых label'ов: collision resolver
//! матчит пары ролей исчерпывающе, опечатка в "метке" невозможна.

use bevy::prelude::*;

/// Сторона тела
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum Side {
    Left,
    Right,
}

/// Роль сегмента — прикрепляется к каждому rigid body при создании
///
/// В 4-сегментном риге рука/нога целиком — это UpperArm/UpperLeg
/// без lower-пары, поэтому правила несдееспособности для обоих
/// вариантов выражаются одним предикатом по upper-конечностям.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
#[reflect(Component)]
pub enum SegmentRole {
    Torso,
    Head,
    UpperArm(Side),
    LowerArm(Side),
    UpperLeg(Side),
    LowerLeg(Side),
    EnemyBody,
    EnemyArm(Side),
    EnemyMouth,
    Ground,
    Goal,
}

impl SegmentRole {
    /// Сегмент принадлежит персонажу игрока
    pub fn is_player_part(&self) -> bool {
        matches!(
            self,
            Self::Torso
                | Self::Head
                | Self::UpperArm(_)
                | Self::LowerArm(_)
                | Self::UpperLeg(_)
                | Self::LowerLeg(_)
        )
    }

    /// Управляемая конечность (имеет здоровье и может быть потеряна)
    pub fn is_player_limb(&self) -> bool {
        matches!(
            self,
            Self::UpperArm(_) | Self::LowerArm(_) | Self::UpperLeg(_) | Self::LowerLeg(_)
        )
    }

    /// Upper-конечность — участвует в правиле несдееспособности
    pub fn is_upper_limb(&self) -> bool {
        matches!(self, Self::UpperArm(_) | Self::UpperLeg(_))
    }

    /// Рука игрока — наносит урон врагу при ударе
    pub fn is_player_arm(&self) -> bool {
        matches!(self, Self::UpperArm(_) | Self::LowerArm(_))
    }

    /// Атакующая часть врага (рука или пасть)
    pub fn is_enemy_attacker(&self) -> bool {
        matches!(self, Self::EnemyArm(_) | Self::EnemyMouth)
    }
}

/// Здоровье конечности
///
/// Инвариант: current монотонно не растет; деактивация (despawn сегмента)
/// происходит ровно один раз — при переходе current в 0. Повторный урон
/// по уничтоженной конечности невозможен: entity больше нет в мире.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct LimbHealth {
    pub current: u32,
    pub max: u32,
    /// Момент последнего засчитанного урона (мс симуляции)
    pub last_damage_ms: f64,
}

impl Default for LimbHealth {
    fn default() -> Self {
        Self::new(3)
    }
}

impl LimbHealth {
    pub fn new(max: u32) -> Self {
        Self {
            current: max,
            max,
            // Отрицательное значение: первый удар проходит без cooldown-гейта
            last_damage_ms: f64::MIN,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.current == 0
    }

    /// Cooldown урона еще не истек
    pub fn on_cooldown(&self, now_ms: f64, cooldown_ms: f64) -> bool {
        now_ms - self.last_damage_ms < cooldown_ms
    }
}

/// Cooldown управляющего импульса конечности (тики)
///
/// Не дает накапливать силу быстрее, чем constraint solver остается
/// стабильным: без гейта конечность раскручивается в неуправляемый спин.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct ControlCooldown {
    pub ticks: u32,
}

impl ControlCooldown {
    pub fn ready(&self) -> bool {
        self.ticks == 0
    }

    pub fn arm(&mut self, ticks: u32) {
        self.ticks = ticks;
    }

    /// Уменьшается на 1 за тик независимо от input
    pub fn tick(&mut self) {
        self.ticks = self.ticks.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_predicates() {
        assert!(SegmentRole::Torso.is_player_part());
        assert!(!SegmentRole::Torso.is_player_limb());
        assert!(SegmentRole::UpperArm(Side::Left).is_player_limb());
        assert!(SegmentRole::UpperArm(Side::Left).is_upper_limb());
        assert!(!SegmentRole::LowerArm(Side::Left).is_upper_limb());
        assert!(SegmentRole::LowerArm(Side::Right).is_player_arm());
        assert!(!SegmentRole::UpperLeg(Side::Right).is_player_arm());
        assert!(SegmentRole::EnemyMouth.is_enemy_attacker());
        assert!(SegmentRole::EnemyArm(Side::Left).is_enemy_attacker());
        assert!(!SegmentRole::EnemyBody.is_enemy_attacker());
    }

    #[test]
    fn test_limb_health_cooldown_gate() {
        let mut health = LimbHealth::new(3);
        // Первый удар проходит сразу
        assert!(!health.on_cooldown(0.0, 1000.0));

        health.last_damage_ms = 0.0;
        assert!(health.on_cooldown(999.0, 1000.0));
        assert!(!health.on_cooldown(1000.0, 1000.0));
    }

    #[test]
    fn test_control_cooldown_tick() {
        let mut cd = ControlCooldown::default();
        assert!(cd.ready());

        cd.arm(2);
        assert!(!cd.ready());
        cd.tick();
        cd.tick();
        assert!(cd.ready());
        // saturating: лишние тики не уводят в минус
        cd.tick();
        assert!(cd.ready());
    }
}
