use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::engine::GestureEngine;
use crate::types::{AngularVelocitySample, ConfigError, DetectorConfig, GestureEvent};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuración inválida: {0}")]
    Config(#[from] ConfigError),

    #[error("El motor no fue inicializado")]
    NotInitialized,

    #[error("El motor ya fue inicializado")]
    AlreadyInitialized,

    #[error("El hilo del motor terminó inesperadamente")]
    WorkerGone,
}

/// Callback del host; se invoca una única vez por gesto reconocido, en el
/// hilo del motor. Re-despachar a un hilo de UI es responsabilidad del host.
pub type GestureCallback = Box<dyn FnMut(GestureEvent) + Send>;

enum Command {
    Sample(AngularVelocitySample),
    Enable,
    Disable(Sender<()>),
    Shutdown(Sender<()>),
}

/// Fachada pública del motor de gestos. Serializa muestras y vencimientos
/// de timers en un único hilo trabajador, de modo que las dos máquinas de
/// estados y el desambiguador observan una sola línea de tiempo.
///
/// Ciclo de vida: `new → set_callback → initialize → enable/disable
/// (repetible) → shutdown`. `disable()` es síncrono: al retornar, ningún
/// timer pendiente puede disparar un evento.
pub struct GestureDispatcher {
    config: DetectorConfig,
    callback: Option<GestureCallback>,
    tx: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl GestureDispatcher {
    /// Valida la configuración y construye la fachada, todavía sin hilo
    pub fn new(config: DetectorConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            callback: None,
            tx: None,
            worker: None,
        })
    }

    /// Registra el receptor de gestos. Debe llamarse antes de `initialize`;
    /// sin callback el motor procesa igual pero los eventos se pierden.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(GestureEvent) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Arranca el hilo trabajador. No empieza a procesar muestras hasta
    /// `enable()`.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        if self.tx.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        let (tx, rx) = unbounded();
        let engine = GestureEngine::new(&self.config);
        let callback = self.callback.take();
        self.worker = Some(thread::spawn(move || worker_loop(engine, rx, callback)));
        self.tx = Some(tx);
        Ok(())
    }

    pub fn enable(&self) -> Result<(), EngineError> {
        self.send(Command::Enable)
    }

    /// Apaga el procesamiento. Al retornar, ambos ejes quedaron en Idle y
    /// todos los timers (incluida una entrega de Nod en vuelo) cancelados.
    /// Llamarlo dos veces seguidas deja el mismo estado que una.
    pub fn disable(&self) -> Result<(), EngineError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.send(Command::Disable(ack_tx))?;
        ack_rx.recv().map_err(|_| EngineError::WorkerGone)
    }

    /// Entrega una muestra al motor. No bloquea: la muestra viaja por el
    /// canal y se procesa en el hilo trabajador. Si el motor está
    /// deshabilitado la muestra se descarta allí.
    pub fn on_sample(&self, sample: AngularVelocitySample) -> Result<(), EngineError> {
        self.send(Command::Sample(sample))
    }

    /// Detiene el hilo trabajador y espera a que termine
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        let tx = self.tx.take().ok_or(EngineError::NotInitialized)?;
        let (ack_tx, ack_rx) = bounded(1);
        tx.send(Command::Shutdown(ack_tx))
            .map_err(|_| EngineError::WorkerGone)?;
        let _ = ack_rx.recv();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx
            .as_ref()
            .ok_or(EngineError::NotInitialized)?
            .send(command)
            .map_err(|_| EngineError::WorkerGone)
    }
}

/// Bucle del hilo trabajador: multiplexa el canal de comandos con el
/// próximo vencimiento del motor. El ancla (instante de pared, timestamp
/// de la última muestra) traduce plazos del motor a plazos de pared.
fn worker_loop(
    mut engine: GestureEngine,
    rx: Receiver<Command>,
    mut callback: Option<GestureCallback>,
) {
    let mut enabled = false;
    let mut anchor: Option<(Instant, u64)> = None;

    loop {
        let next_deadline = if enabled { engine.next_deadline() } else { None };
        let wall_deadline = match (next_deadline, anchor) {
            (Some(deadline), Some((wall, engine_ms))) => {
                Some(wall + Duration::from_millis(deadline.saturating_sub(engine_ms)))
            }
            _ => None,
        };

        let command = match wall_deadline {
            Some(at) => match rx.recv_deadline(at) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };

        match command {
            None => {
                // Venció el próximo timer del motor
                if let Some(deadline) = next_deadline {
                    for event in engine.on_timers(deadline) {
                        deliver(&mut callback, event);
                    }
                }
            }
            Some(Command::Sample(sample)) => {
                if !enabled {
                    continue;
                }
                anchor = Some((Instant::now(), sample.timestamp_ms));
                for event in engine.on_sample(&sample) {
                    deliver(&mut callback, event);
                }
            }
            Some(Command::Enable) => {
                if !enabled {
                    engine.reset();
                    enabled = true;
                }
            }
            Some(Command::Disable(ack)) => {
                engine.reset();
                enabled = false;
                anchor = None;
                let _ = ack.send(());
            }
            Some(Command::Shutdown(ack)) => {
                let _ = ack.send(());
                break;
            }
        }
    }
}

fn deliver(callback: &mut Option<GestureCallback>, event: GestureEvent) {
    if let Some(cb) = callback.as_mut() {
        cb(event);
    }
}
