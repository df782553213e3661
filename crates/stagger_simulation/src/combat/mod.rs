//! Combat module: урон конечностям и врагу
//!
//! ECS ответственность:
//! - Game state: LimbHealth, Enemy.health, слоты CharacterRig
//! - Rules: cooldown-гейт урона, несдееспособность, knockback
//! - События: LimbHit (вход от collision resolver), VisualCue (выход к host'у)
//!
//! Host ответственность: tint/blink/shake рендеринг по VisualCue.

pub mod damage;

// Re-export основных типов
pub use damage::{
    apply_enemy_damage, apply_limb_damage, try_damage, CharacterIncapacitated, CueKind,
    DamageOutcome, EnemyStruck, LimbHit, VisualCue,
};
