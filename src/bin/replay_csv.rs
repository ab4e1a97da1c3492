use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use cefaloscopio::csv_loader::load_trace_from_csv;
use cefaloscopio::engine::GestureEngine;
use cefaloscopio::types::{DetectorConfig, GestureEvent};

struct ReplayOptions {
    dump_samples: bool,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut dump_samples = false;
    let mut config_path: Option<PathBuf> = None;
    let mut csv_path: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump-samples" => dump_samples = true,
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requiere una ruta"))?;
                config_path = Some(PathBuf::from(path));
            }
            _ => {
                if csv_path.is_some() {
                    bail!("Uso: replay_csv [--dump-samples] [--config detector.json] <archivo.csv>");
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("Debes especificar un archivo CSV"))?;
    Ok((
        csv_path,
        ReplayOptions {
            dump_samples,
            config_path,
        },
    ))
}

fn main() -> Result<()> {
    let (csv_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo traza desde {:?}", csv_path);

    let config = match &opts.config_path {
        Some(path) => DetectorConfig::from_json_file(path)?,
        None => DetectorConfig::default(),
    };

    let trace = load_trace_from_csv(&csv_path)?;
    println!("📈 {} muestras cargadas\n", trace.len());

    if opts.dump_samples {
        println!("sample  t_ms     pitch      yaw       roll");
        for (idx, sample) in trace.iter().enumerate() {
            println!(
                "{:>6}  {:>6}  {:>8.3}  {:>8.3}  {:>8.3}",
                idx, sample.timestamp_ms, sample.pitch_rate, sample.yaw_rate, sample.roll_rate
            );
        }
        println!();
    }

    // Replay síncrono: sin hilos ni esperas, los vencimientos se drenan
    // avanzando el motor hasta cada deadline pendiente
    let mut engine = GestureEngine::new(&config);
    let mut detected: Vec<(u64, GestureEvent)> = Vec::new();

    for sample in &trace {
        for event in engine.on_sample(sample) {
            detected.push((engine.now(), event));
        }
    }
    while let Some(deadline) = engine.next_deadline() {
        for event in engine.on_timers(deadline) {
            detected.push((engine.now(), event));
        }
    }

    if detected.is_empty() {
        println!("🤷 Ningún gesto reconocido en la traza");
        return Ok(());
    }

    println!("Gestos reconocidos:");
    for (t_ms, event) in &detected {
        println!("  {:>6} ms  {}", t_ms, event.as_str());
    }

    let nods = detected
        .iter()
        .filter(|(_, e)| *e == GestureEvent::Nod)
        .count();
    let shakes = detected
        .iter()
        .filter(|(_, e)| *e == GestureEvent::Shake)
        .count();
    let doubles = detected
        .iter()
        .filter(|(_, e)| *e == GestureEvent::DoubleNod)
        .count();
    println!(
        "\n📊 Total: {} nod(s), {} shake(s), {} doble(s)",
        nods, shakes, doubles
    );

    Ok(())
}
