//! Tuning configuration — единая поверхность настройки геймплея
//!
//! Все силы, плотности, пороги и расстояния живут здесь, чтобы варианты
//! игры (4-сегментный / 8-сегментный риг, enemy с руками / с пастью)
//! выражались данными, а не дублированием кода.
//!
//! Координаты: y-вверх, верх земли на y = 0, единицы — пиксели.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Вариант рига персонажа
///
/// FourLimb: torso + head + 4 конечности (arm/leg = один сегмент).
/// EightSegment: каждая конечность разбита на upper/lower с локтем/коленом.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigVariant {
    FourLimb,
    EightSegment,
}

/// Способ атаки врага
///
/// Arms: две руки-сегмента, удар импульсом по ближней руке.
/// Mouth: sensor-пасть перед корпусом (укус регистрируется как overlap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyAttackStyle {
    Arms,
    Mouth,
}

/// Геометрия и физика рига
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigTuning {
    pub variant: RigVariant,

    /// Точка спауна торса по X
    pub spawn_x: f32,
    /// Высота торса (px)
    pub torso_height: f32,
    pub torso_width: f32,
    /// Длина конечности целиком (в 8-сегментном — upper + lower)
    pub limb_length: f32,
    pub limb_width: f32,
    pub head_radius: f32,

    /// Mass-density сегментов (Matter-подобный масштаб)
    pub density: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub ground_friction: f32,

    /// Пружинные constraints между сегментами
    pub joint_stiffness: f32,
    pub joint_damping: f32,
}

impl Default for RigTuning {
    fn default() -> Self {
        Self {
            variant: RigVariant::FourLimb,
            spawn_x: 200.0,
            torso_height: 80.0,
            torso_width: 40.0,
            limb_length: 60.0,
            limb_width: 14.0,
            head_radius: 15.0,
            density: 0.001,
            linear_damping: 0.15,
            angular_damping: 0.2,
            ground_friction: 0.8,
            joint_stiffness: 0.7,
            joint_damping: 0.1,
        }
    }
}

/// Управление конечностями
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlTuning {
    /// Вертикальный импульс на конечность при нажатии
    pub limb_impulse: f32,
    /// Cooldown между импульсами одной конечности (тики)
    pub cooldown_ticks: u32,

    /// Джеб: импульс по upper-руке (вперед, вверх).
    /// Разложен на компоненты — serde без glam-фич.
    pub punch_upper_x: f32,
    pub punch_upper_y: f32,
    /// Джеб: импульс по lower-руке (сильнее)
    pub punch_lower_x: f32,
    pub punch_lower_y: f32,
    /// Минимальный интервал между джебами (мс)
    pub punch_cooldown_ms: f64,
}

impl Default for ControlTuning {
    fn default() -> Self {
        Self {
            limb_impulse: 160.0,
            cooldown_ticks: 2,
            punch_upper_x: 90.0,
            punch_upper_y: 60.0,
            punch_lower_x: 180.0,
            punch_lower_y: 110.0,
            punch_cooldown_ms: 500.0,
        }
    }
}

/// Урон и несдееспособность
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageTuning {
    /// Стартовое здоровье каждой конечности
    pub limb_health: u32,
    /// Cooldown урона одной конечности (мс)
    pub limb_damage_cooldown_ms: f64,
    /// Cooldown между любыми ударами врага по игроку (мс)
    pub enemy_hit_cooldown_ms: f64,
    /// Минимальная скорость контакта чтобы удар засчитался (px/s)
    pub min_impact_speed: f32,
    /// Масштаб knockback-импульса от скорости удара
    pub knockback_scale: f32,
    /// Сессионное здоровье игрока (отдельно от конечностей)
    pub player_health: u32,
    /// Здоровье врага (удары руками игрока)
    pub enemy_health: u32,
    /// Порог несдееспособности: минимум активных upper-конечностей.
    /// FourLimb: 1 ("все четыре потеряны"), EightSegment: 2.
    pub min_active_upper_limbs: usize,
}

impl Default for DamageTuning {
    fn default() -> Self {
        Self {
            limb_health: 3,
            limb_damage_cooldown_ms: 1000.0,
            enemy_hit_cooldown_ms: 420.0,
            min_impact_speed: 60.0,
            knockback_scale: 0.6,
            player_health: 5,
            enemy_health: 3,
            min_active_upper_limbs: 1,
        }
    }
}

/// Поведение врага
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTuning {
    pub attack_style: EnemyAttackStyle,

    /// Начальная точка спауна
    pub spawn_x: f32,
    /// Высота спауна над землей
    pub spawn_height: f32,
    /// Респаун впереди персонажа: offset по X
    pub respawn_offset: f32,

    /// Горизонтальная скорость преследования (px/s)
    pub max_speed: f32,
    /// Дистанция "близко": вместо разгона — торможение
    pub near_distance: f32,
    /// Фактор торможения вблизи
    pub near_decel: f32,
    /// Ограничение вертикальной скорости (px/s)
    pub max_vertical_speed: f32,

    /// Радиус атаки
    pub attack_range: f32,
    /// Период атак (мс)
    pub attack_period_ms: f64,
    /// Импульс удара рукой/пастью
    pub attack_impulse: f32,

    /// Окно камеры: насколько враг может отстать / убежать вперед
    pub window_behind: f32,
    pub window_ahead: f32,
    /// Респаун при выходе из окна (scrolling-вариант)
    pub scrolling_respawn: bool,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            attack_style: EnemyAttackStyle::Arms,
            spawn_x: 600.0,
            spawn_height: 50.0,
            respawn_offset: 400.0,
            max_speed: 120.0,
            near_distance: 100.0,
            near_decel: 0.5,
            max_vertical_speed: 180.0,
            attack_range: 150.0,
            attack_period_ms: 2000.0,
            attack_impulse: 45.0,
            window_behind: 100.0,
            window_ahead: 900.0,
            scrolling_respawn: true,
        }
    }
}

/// Условия конца сессии и уровень
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTuning {
    /// Непрерывный контакт торса с землей дольше этого — падение (мс)
    pub fall_grounded_ms: f64,
    /// Порог "не движется" для падения (px/s)
    pub still_speed: f32,
    /// Предел наклона торса (радианы)
    pub max_torso_tilt: f32,
    /// Дистанция на которой враг "поймал" игрока
    pub catch_distance: f32,
    /// Задержка рестарта после победы (мс)
    pub win_restart_delay_ms: f64,

    /// Границы уровня
    pub bounds_min_x: f32,
    pub bounds_max_x: f32,
    pub bounds_min_y: f32,

    /// Финиш (safehouse)
    pub goal_x: f32,
    pub goal_half_width: f32,
    pub goal_half_height: f32,
    /// Явная дистанционная проверка против ложных срабатываний sensor'а
    pub goal_capture_range: f32,

    /// Земля
    pub ground_center_x: f32,
    pub ground_half_width: f32,
    pub ground_half_height: f32,

    /// Гравитация (px/s², отрицательная = вниз)
    pub gravity_y: f32,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            fall_grounded_ms: 500.0,
            still_speed: 25.0,
            max_torso_tilt: 1.5,
            catch_distance: 30.0,
            win_restart_delay_ms: 3000.0,
            bounds_min_x: -100.0,
            bounds_max_x: 1100.0,
            bounds_min_y: -50.0,
            goal_x: 900.0,
            goal_half_width: 40.0,
            goal_half_height: 50.0,
            goal_capture_range: 120.0,
            ground_center_x: 500.0,
            ground_half_width: 700.0,
            ground_half_height: 20.0,
            gravity_y: -980.0,
        }
    }
}

/// Полная конфигурация симуляции (Resource)
///
/// Вставляется до SimulationPlugin если нужен не-дефолтный вариант.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct TuningConfig {
    pub rig: RigTuning,
    pub control: ControlTuning,
    pub damage: DamageTuning,
    pub enemy: EnemyTuning,
    pub session: SessionTuning,
}

impl TuningConfig {
    /// Пресет 8-сегментного рига (QWOP-вариант с локтями/коленями)
    pub fn eight_segment() -> Self {
        let mut cfg = Self::default();
        cfg.rig.variant = RigVariant::EightSegment;
        cfg.damage.min_active_upper_limbs = 2;
        cfg
    }
}
