/*
Cefaloscopio - Gestos de cabeza a acciones HID

Daemon que reconoce gestos discretos de cabeza (asentir, negar, doble
asentimiento) a partir de un stream de velocidades angulares con ruido y
los entrega como señales de confirmar/cancelar/alternar vía /dev/uinput.

Para reproducir una traza grabada en tiempo real:
    ./target/release/cefaloscopio traza.csv

Para el modo debug con teclado (n = nod, s = shake, d = doble, q = salir):
    sg input -c './target/debug/cefaloscopio'

Con --config se pueden afinar los umbrales por dispositivo:
    ./target/release/cefaloscopio --config detector.json traza.csv
*/

use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::unbounded;

use cefaloscopio::csv_loader::{load_trace_from_csv, write_trace_to_csv};
use cefaloscopio::dispatcher::GestureDispatcher;
use cefaloscopio::hid::{GestureAction, HidOutput};
use cefaloscopio::synth;
use cefaloscopio::types::{AngularVelocitySample, DetectorConfig, GestureEvent};

fn parse_args() -> Result<(Option<PathBuf>, DetectorConfig)> {
    let mut config = DetectorConfig::default();
    let mut trace_path: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requiere una ruta"))?;
                config = DetectorConfig::from_json_file(&path)?;
                println!("⚙️  Configuración cargada desde {}", path);
            }
            _ => {
                if trace_path.is_some() {
                    bail!("Uso: cefaloscopio [--config detector.json] [traza.csv]");
                }
                trace_path = Some(PathBuf::from(arg));
            }
        }
    }

    Ok((trace_path, config))
}

fn describe(event: GestureEvent) -> &'static str {
    match event {
        GestureEvent::Nod => "asentimiento → confirmar",
        GestureEvent::Shake => "negación → cancelar",
        GestureEvent::DoubleNod => "doble asentimiento → alternar",
    }
}

/// Lanza el hilo HID y devuelve el dispatcher ya inicializado, con un
/// callback que reenvía cada gesto por el canal hacia ese hilo.
fn start_engine(config: DetectorConfig) -> Result<GestureDispatcher> {
    let (tx_gesture, rx_gesture) = unbounded::<GestureEvent>();

    thread::spawn(move || {
        let mut hid = match HidOutput::new() {
            Ok(h) => {
                println!("✅ HID inicializado (/dev/uinput)");
                h
            }
            Err(e) => {
                eprintln!("❌ No se pudo inicializar HID: {}", e);
                return;
            }
        };

        while let Ok(event) = rx_gesture.recv() {
            println!("🎮 [{}] {}", event.as_str(), describe(event));
            if let Err(e) = hid.send(GestureAction::from_event(event)) {
                eprintln!("❌ Error enviando acción HID {:?}: {}", event, e);
            }
        }
    });

    let mut dispatcher = GestureDispatcher::new(config)?;
    dispatcher.set_callback(move |event| {
        let _ = tx_gesture.send(event);
    });
    dispatcher.initialize()?;
    Ok(dispatcher)
}

/// Reproduce una traza respetando los huecos entre timestamps
fn feed_realtime(dispatcher: &GestureDispatcher, trace: &[AngularVelocitySample]) -> Result<()> {
    let mut last_ts: Option<u64> = None;
    for sample in trace {
        if let Some(prev) = last_ts {
            let gap = sample.timestamp_ms.saturating_sub(prev);
            if gap > 0 {
                thread::sleep(Duration::from_millis(gap));
            }
        }
        last_ts = Some(sample.timestamp_ms);
        dispatcher.on_sample(*sample)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    println!("🎯 Cefaloscopio - Gestos de cabeza a acciones HID\n");

    let (trace_path, config) = parse_args()?;
    match trace_path {
        Some(path) => replay_mode(path, config),
        None => {
            println!("🔧 Modo: DEBUG - Teclado Interactivo\n");
            debug_mode(config)
        }
    }
}

fn replay_mode(path: PathBuf, config: DetectorConfig) -> Result<()> {
    println!("🔧 Modo: Replay en tiempo real");
    let trace = load_trace_from_csv(&path)?;
    println!("🎞️  Traza {:?}: {} muestras\n", path, trace.len());

    let window_ms = config.double_nod_window_ms;
    let mut dispatcher = start_engine(config)?;
    dispatcher.enable()?;

    feed_realtime(&dispatcher, &trace)?;

    // Dejar vencer la ventana de doble nod antes de apagar
    thread::sleep(Duration::from_millis(window_ms + 100));
    dispatcher.disable()?;
    dispatcher.shutdown()?;

    println!("\n👋 Traza reproducida");
    Ok(())
}

/// Modo DEBUG: cada tecla sintetiza la traza del gesto correspondiente,
/// la guarda como CSV y la reproduce por el motor en tiempo real
fn debug_mode(config: DetectorConfig) -> Result<()> {
    use evdev::{Device, InputEventKind, Key};
    use std::fs;

    println!("🔍 Buscando teclado...");

    let mut keyboard: Option<Device> = None;
    for entry in fs::read_dir("/dev/input")? {
        let path = entry?.path();
        let is_event = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with("event"))
            .unwrap_or(false);
        if !is_event {
            continue;
        }
        if let Ok(device) = Device::open(&path) {
            if let Some(name) = device.name() {
                let name_lc = name.to_lowercase();
                if name_lc.contains("keyboard") || name_lc.contains("at translated") {
                    println!("✅ Teclado encontrado: {} ({})", name, path.display());
                    keyboard = Some(device);
                    break;
                }
            }
        }
    }

    let mut device =
        keyboard.ok_or_else(|| anyhow!("No se encontró ningún teclado en /dev/input"))?;
    println!("✅ Captura de teclado global activada\n");

    let out_dir = "trazas_auto";
    fs::create_dir_all(out_dir)?;

    let window_ms = config.double_nod_window_ms;
    let synth_config = config.clone();
    let mut dispatcher = start_engine(config)?;
    dispatcher.enable()?;

    println!("✅ Sistema listo\n");
    println!("Presiona teclas para simular gestos:");
    println!("  n → asentimiento (confirmar)");
    println!("  s → negación (cancelar)");
    println!("  d → doble asentimiento (alternar)");
    println!("  q → salir\n");

    // Los timestamps siguen avanzando entre gestos para sostener la línea
    // de tiempo monotónica del motor
    let mut next_start_ms: u64 = 0;
    let mut trace_idx = 0u32;

    'outer: loop {
        for ev in device.fetch_events()? {
            let key = match ev.kind() {
                InputEventKind::Key(k) if ev.value() == 1 => k,
                _ => continue,
            };

            let (label, trace) = match key {
                Key::KEY_Q => break 'outer,
                Key::KEY_N => ("nod", synth::nod_trace(&synth_config, next_start_ms)),
                Key::KEY_S => ("shake", synth::shake_trace(&synth_config, next_start_ms)),
                Key::KEY_D => ("doble", synth::double_nod_trace(&synth_config, next_start_ms)),
                _ => continue,
            };

            println!("\n🔑 Gesto sintético: {}", label);

            let filename = format!("{}/traza_{}_{:03}.csv", out_dir, label, trace_idx);
            trace_idx += 1;
            if let Err(e) = write_trace_to_csv(&filename, &trace) {
                eprintln!("❌ Error escribiendo CSV {}: {}", filename, e);
            }

            feed_realtime(&dispatcher, &trace)?;
            next_start_ms = trace
                .last()
                .map(|s| s.timestamp_ms)
                .unwrap_or(next_start_ms)
                + window_ms
                + 200;
        }

        thread::sleep(Duration::from_millis(10));
    }

    println!("\n👋 Saliendo...");
    dispatcher.disable()?;
    dispatcher.shutdown()?;
    Ok(())
}
