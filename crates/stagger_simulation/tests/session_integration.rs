//! Integration-тесты жизненного цикла сессии
//!
//! Headless App с ручным временем: один app.update() = ровно один
//! simulation tick. Гравитация выключена — риг стоит на месте, и
//! терминальные условия проверяются изолированно, без борьбы с физикой.

use bevy::prelude::*;
use bevy_rapier2d::prelude::Velocity;
use stagger_simulation::collision::GroundContactTracker;
use stagger_simulation::combat::LimbHit;
use stagger_simulation::session::{ScheduledEffect, ScheduledEvents};
use stagger_simulation::*;

/// Helper: App с засеянной сессией и нулевой гравитацией
fn create_session_app_with(mut config: TuningConfig) -> App {
    config.session.gravity_y = 0.0;

    let mut app = create_headless_app(42);
    app.insert_resource(config);
    // Первый update: Startup (гравитация + спаун сессии) и первый тик
    app.update();
    app
}

fn create_session_app() -> App {
    create_session_app_with(TuningConfig::default())
}

fn tick(app: &mut App, n: usize) {
    for _ in 0..n {
        app.update();
    }
}

fn session(app: &App) -> &Session {
    app.world().resource::<Session>()
}

#[test]
fn test_initial_session_spawned() {
    let mut app = create_session_app();
    tick(&mut app, 2);

    let session = session(&app);
    assert!(session.state.is_active());
    assert_eq!(session.player_health, 5);

    let character = session.character.as_ref().unwrap();
    assert_eq!(character.active_upper_limbs(), 4);
    assert!(session.enemy.is_some());
    assert!(session.level.is_some());
}

#[test]
fn test_pause_freezes_clock_and_resumes() {
    let mut app = create_session_app();
    tick(&mut app, 5);

    app.world_mut().resource_mut::<LimbInput>().pause_pressed = true;
    app.update();
    assert_eq!(session(&app).state, SessionState::Paused);

    // 10 тиков в паузе: часы стоят, торс не двигается
    let torso = session(&app).character.as_ref().unwrap().torso;
    let frozen_ms = app.world().resource::<SimClock>().elapsed_ms;
    let frozen_pos = app.world().get::<Transform>(torso).unwrap().translation;
    let frozen_vel = *app.world().get::<Velocity>(torso).unwrap();
    tick(&mut app, 10);
    assert_eq!(app.world().resource::<SimClock>().elapsed_ms, frozen_ms);
    assert_eq!(
        app.world().get::<Transform>(torso).unwrap().translation,
        frozen_pos
    );
    let vel = app.world().get::<Velocity>(torso).unwrap();
    assert_eq!(vel.linvel, frozen_vel.linvel);
    assert_eq!(vel.angvel, frozen_vel.angvel);

    // Resume тем же toggle
    app.world_mut().resource_mut::<LimbInput>().pause_pressed = true;
    app.update();
    assert!(session(&app).state.is_active());

    tick(&mut app, 3);
    assert!(app.world().resource::<SimClock>().elapsed_ms > frozen_ms);
}

#[test]
fn test_reset_from_terminal_state() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    // Помечаем сессию проигранной и просим reset
    let old_generation = {
        let mut s = app.world_mut().resource_mut::<Session>();
        s.state = SessionState::Over {
            reason: "Enemy beat you down!".to_string(),
        };
        s.player_health = 0;
        s.generation
    };
    app.world_mut().resource_mut::<LimbInput>().reset_pressed = true;
    app.update();

    let s = session(&app);
    assert!(s.state.is_active());
    assert_eq!(s.generation, old_generation.wrapping_add(1));
    assert_eq!(s.player_health, 5);
    assert_eq!(s.character.as_ref().unwrap().active_upper_limbs(), 4);

    // Свежий риг: все конечности на полном здоровье
    tick(&mut app, 1);
    let world = app.world_mut();
    let mut limbs = world.query::<&LimbHealth>();
    let healths: Vec<u32> = limbs.iter(world).map(|h| h.current).collect();
    assert_eq!(healths.len(), 4);
    assert!(healths.iter().all(|&h| h == 3));
}

#[test]
fn test_reset_ignored_while_active() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    let generation = session(&app).generation;
    app.world_mut().resource_mut::<LimbInput>().reset_pressed = true;
    app.update();

    // Сессия жива — reset не сработал
    assert!(session(&app).state.is_active());
    assert_eq!(session(&app).generation, generation);
}

#[test]
fn test_win_transition_is_single_and_restarts() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    // Несколько сегментов вошли в сенсор за один тик
    app.world_mut().send_event(GoalReached);
    app.world_mut().send_event(GoalReached);
    app.update();

    assert_eq!(session(&app).state, SessionState::Won);
    // Отложенный рестарт запланирован ровно один раз
    assert_eq!(app.world().resource::<ScheduledEvents>().len(), 1);
    let won_generation = session(&app).generation;

    // 3000 мс задержки = 180 тиков; с запасом
    tick(&mut app, 200);
    let s = session(&app);
    assert!(s.state.is_active());
    assert_eq!(s.generation, won_generation.wrapping_add(1));
}

#[test]
fn test_incapacitation_when_limbs_run_out() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    // Все конечности до 1 HP — следующий удар уничтожает
    let limb_entities: Vec<(SegmentRole, Entity)> = session(&app)
        .character
        .as_ref()
        .unwrap()
        .active_limbs()
        .collect();
    assert_eq!(limb_entities.len(), 4);
    for (_, entity) in &limb_entities {
        app.world_mut().get_mut::<LimbHealth>(*entity).unwrap().current = 1;
    }

    // Уничтожаем три из четырех: персонаж еще стоит
    for (role, entity) in limb_entities.iter().take(3) {
        app.world_mut().send_event(LimbHit {
            entity: *entity,
            role: *role,
        });
    }
    app.update();
    assert!(session(&app).state.is_active());
    assert_eq!(session(&app).character.as_ref().unwrap().active_upper_limbs(), 1);

    // Четвертая — несдееспособность
    let (role, entity) = limb_entities[3];
    app.world_mut().send_event(LimbHit { entity, role });
    app.update();

    match &session(&app).state {
        SessionState::Over { reason } => {
            assert_eq!(reason, "Character lost too many limbs!")
        }
        other => panic!("expected Over, got {:?}", other),
    }
}

#[test]
fn test_eight_segment_incapacitation_boundary() {
    let mut app = create_session_app_with(TuningConfig::eight_segment());
    tick(&mut app, 3);

    // Восемь сегментов, порог — меньше двух активных upper-конечностей
    let uppers: Vec<(SegmentRole, Entity)> = session(&app)
        .character
        .as_ref()
        .unwrap()
        .active_limbs()
        .filter(|(role, _)| role.is_upper_limb())
        .collect();
    assert_eq!(uppers.len(), 4);
    for (_, entity) in &uppers {
        app.world_mut().get_mut::<LimbHealth>(*entity).unwrap().current = 1;
    }

    // Две уничтожены, ровно две остались — персонаж еще стоит
    for (role, entity) in uppers.iter().take(2) {
        app.world_mut().send_event(LimbHit {
            entity: *entity,
            role: *role,
        });
    }
    app.update();
    assert!(session(&app).state.is_active());
    assert_eq!(session(&app).character.as_ref().unwrap().active_upper_limbs(), 2);

    // Третья — осталась ровно одна, порог пробит
    let (role, entity) = uppers[2];
    app.world_mut().send_event(LimbHit { entity, role });
    app.update();

    assert_eq!(session(&app).character.as_ref().unwrap().active_upper_limbs(), 1);
    match &session(&app).state {
        SessionState::Over { reason } => {
            assert_eq!(reason, "Character lost too many limbs!")
        }
        other => panic!("expected Over, got {:?}", other),
    }
}

#[test]
fn test_duplicate_reset_requests_collapse() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    app.world_mut().resource_mut::<Session>().state = SessionState::Won;
    let generation = session(&app).generation;

    // Отложенный рестарт и нажатие reset совпали в одном тике
    app.world_mut().send_event(ResetRequested);
    app.world_mut().send_event(ResetRequested);
    app.update();

    let s = session(&app);
    assert!(s.state.is_active());
    assert_eq!(s.generation, generation.wrapping_add(1));

    // Остаток не доживает до следующих тиков — второй пересборки нет
    tick(&mut app, 3);
    assert_eq!(session(&app).generation, generation.wrapping_add(1));
    assert!(session(&app).state.is_active());
}

#[test]
fn test_fall_after_sustained_ground_contact() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    let now = app.world().resource::<SimClock>().elapsed_ms;
    app.world_mut()
        .resource_mut::<GroundContactTracker>()
        .begin(now);

    // Порог 500 мс: 40 тиков ≈ 667 мс контакта при нулевой скорости
    tick(&mut app, 40);
    match &session(&app).state {
        SessionState::Over { reason } => assert_eq!(reason, "Character fell down!"),
        other => panic!("expected Over, got {:?}", other),
    }
}

#[test]
fn test_brief_ground_contact_is_not_a_fall() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    let now = app.world().resource::<SimClock>().elapsed_ms;
    app.world_mut()
        .resource_mut::<GroundContactTracker>()
        .begin(now);

    // ~250 мс контакта, потом подъем (collision end)
    tick(&mut app, 15);
    assert!(session(&app).state.is_active());
    app.world_mut().resource_mut::<GroundContactTracker>().end();

    tick(&mut app, 40);
    assert!(session(&app).state.is_active());
}

#[test]
fn test_enemy_catch_ends_session() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    // Телепортируем врага вплотную к торсу
    let (torso, body) = {
        let s = session(&app);
        (
            s.character.as_ref().unwrap().torso,
            s.enemy.as_ref().unwrap().body,
        )
    };
    let torso_pos = app.world().get::<Transform>(torso).unwrap().translation;
    let mut body_tf = app.world_mut().get_mut::<Transform>(body).unwrap();
    body_tf.translation = torso_pos + Vec3::new(10.0, 0.0, 0.0);
    app.update();

    match &session(&app).state {
        SessionState::Over { reason } => assert_eq!(reason, "Enemy caught you!"),
        other => panic!("expected Over, got {:?}", other),
    }
}

#[test]
fn test_player_health_zero_ends_session() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    app.world_mut().resource_mut::<Session>().player_health = 0;
    app.update();

    match &session(&app).state {
        SessionState::Over { reason } => assert_eq!(reason, "Enemy beat you down!"),
        other => panic!("expected Over, got {:?}", other),
    }
}

#[test]
fn test_stale_scheduled_event_is_dropped() {
    let mut app = create_session_app();
    tick(&mut app, 3);

    let (now, generation) = {
        let clock = app.world().resource::<SimClock>();
        (clock.elapsed_ms, session(&app).generation)
    };
    // Запись «чужого» поколения: наступит, но не сработает
    app.world_mut().resource_mut::<ScheduledEvents>().push(
        now + 50.0,
        generation.wrapping_add(1),
        ScheduledEffect::RestartSession,
    );

    tick(&mut app, 10);
    let s = session(&app);
    assert!(s.state.is_active());
    assert_eq!(s.generation, generation);
    assert!(app.world().resource::<ScheduledEvents>().is_empty());
}
