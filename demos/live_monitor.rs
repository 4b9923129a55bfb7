//! Live diagnostics monitor.
//!
//! Opens the default input device and prints the three verdicts once per
//! second. Run with `cargo run --example live_monitor`.

use fretscope::prelude::*;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Fretscope::builder().build()?;
    session.start()?;

    let config = *session.config();
    println!(
        "Listening at {} Hz, {}-sample frames. Ctrl-C to quit.",
        config.sample_rate, config.frame_size
    );

    let fret_buzz = session.fret_buzz();
    let intonation = session.intonation();
    let string_health = session.string_health();

    loop {
        thread::sleep(Duration::from_secs(1));

        let buzz = fret_buzz.latest();
        let tune = intonation.latest();
        let health = string_health.latest();

        let string_label = health.string.name.unwrap_or("-");

        println!(
            "in {:>6.4} | buzz {:.2} (hf {:.2}) | {:?} {:+.1}c | health {:.2} ({:+.1} dB/s) on {}",
            session.input_level(),
            buzz.buzz_score,
            buzz.high_freq_energy_score,
            tune.state,
            tune.cent_deviation,
            health.health_score,
            health.decay_rate,
            string_label,
        );
    }
}
