//! Компоненты врага

use bevy::prelude::*;

/// Враг-преследователь (на корпусном entity)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Enemy {
    pub health: u32,
    /// Момент последней атаки (мс симуляции)
    pub last_attack_ms: f64,
}

impl Enemy {
    pub fn new(health: u32) -> Self {
        Self {
            health,
            last_attack_ms: f64::MIN,
        }
    }

    /// Период атаки истек
    pub fn attack_ready(&self, now_ms: f64, period_ms: f64) -> bool {
        now_ms - self.last_attack_ms >= period_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_ready_period() {
        let mut enemy = Enemy::new(3);
        // Свежий враг атакует сразу
        assert!(enemy.attack_ready(0.0, 2000.0));

        enemy.last_attack_ms = 1000.0;
        assert!(!enemy.attack_ready(2999.0, 2000.0));
        assert!(enemy.attack_ready(3000.0, 2000.0));
    }
}
