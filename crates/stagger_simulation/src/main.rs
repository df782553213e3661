//! Headless симуляция STAGGER
//!
//! Запускает Bevy App без рендера: персонаж стоит на ригдолле,
//! враг преследует. Полезно для профилирования и проверки детерминизма.

use stagger_simulation::{create_headless_app, Session, SimClock};

fn main() {
    let seed = 42;
    println!("Starting STAGGER headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);

    // 1000 тиков ≈ 16.7 секунд игрового времени
    for tick in 0..1000 {
        app.update();

        if tick % 100 == 0 {
            let entity_count = app.world().entities().len();
            let clock = app.world().resource::<SimClock>();
            println!(
                "Tick {}: {} entities, t={:.1}ms",
                tick, entity_count, clock.elapsed_ms
            );
        }
    }

    let session = app.world().resource::<Session>();
    println!("Simulation complete! Final state: {:?}", session.state);
}
