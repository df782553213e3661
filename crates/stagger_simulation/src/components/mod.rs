//! ECS компоненты симуляции
//!
//! Организация по доменам:
//! - segment: роли сегментов рига, здоровье конечности, cooldown управления
//! - enemy: состояние врага (health, таймер атаки)

pub mod enemy;
pub mod segment;

// Re-exports для удобного импорта
pub use enemy::*;
pub use segment::*;
