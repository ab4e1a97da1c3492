use crate::double_nod::{NodDisambiguator, NodDisposition};
use crate::nod_detector::NodDetector;
use crate::scheduler::{GestureScheduler, TimerId, TimerKind};
use crate::shake_detector::ShakeDetector;
use crate::types::{AngularVelocitySample, DetectorConfig, GestureEvent};

/// Núcleo síncrono del motor: ambas máquinas de estados, el desambiguador
/// y el planificador comparten una única línea de tiempo de `now`. No hace
/// I/O ni conoce hilos; el dispatcher lo serializa y el replay lo usa
/// directo. Costo O(1) por muestra.
pub struct GestureEngine {
    nod: NodDetector,
    shake: ShakeDetector,
    disambiguator: NodDisambiguator,
    scheduler: GestureScheduler,
    gesture_timeout_ms: u64,
    // Timer de timeout por eje, junto con el inicio del gesto que cubre
    nod_timeout: Option<(TimerId, u64)>,
    shake_timeout: Option<(TimerId, u64)>,
    nod_delivery: Option<TimerId>,
}

impl GestureEngine {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            nod: NodDetector::new(config),
            shake: ShakeDetector::new(config),
            disambiguator: NodDisambiguator::new(config),
            scheduler: GestureScheduler::new(),
            gesture_timeout_ms: config.gesture_timeout_ms,
            nod_timeout: None,
            shake_timeout: None,
            nod_delivery: None,
        }
    }

    /// Procesa una muestra. Primero dispara los timers vencidos hasta esa
    /// marca de tiempo, de modo que la entrega retenida de un Nod simple
    /// nunca se reordene con la muestra que la sigue.
    pub fn on_sample(&mut self, sample: &AngularVelocitySample) -> Vec<GestureEvent> {
        let mut events = self.advance_to(sample.timestamp_ms);
        let now = self.scheduler.now();

        if let Some(raw) = self.nod.on_sample(sample.pitch_rate, now) {
            match self.disambiguator.on_raw_nod(raw.at_ms) {
                NodDisposition::EmitDoubleNod => {
                    if let Some(id) = self.nod_delivery.take() {
                        self.scheduler.cancel(id);
                    }
                    events.push(GestureEvent::DoubleNod);
                }
                NodDisposition::AwaitWindow { deliver_at_ms } => {
                    if let Some(id) = self.nod_delivery.take() {
                        self.scheduler.cancel(id);
                    }
                    let delay = deliver_at_ms.saturating_sub(now);
                    self.nod_delivery =
                        Some(self.scheduler.schedule_after(delay, TimerKind::NodDelivery));
                }
            }
        }

        if let Some(raw) = self.shake.on_sample(sample.yaw_rate, now) {
            // Los shakes salen de inmediato, sin ventana ni fusión
            debug_assert_eq!(raw.at_ms, now);
            events.push(GestureEvent::Shake);
        }

        self.sync_timeout_timers();
        events
    }

    /// Dispara los timers vencidos a `now_ms` (camino del dispatcher cuando
    /// no llegan muestras). Devuelve los eventos liberados.
    pub fn on_timers(&mut self, now_ms: u64) -> Vec<GestureEvent> {
        let events = self.advance_to(now_ms);
        self.sync_timeout_timers();
        events
    }

    /// Próximo vencimiento en tiempo del motor, si hay timers armados
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    /// Deja ambos ejes en Idle y cancela todo timer pendiente. El reloj se
    /// conserva: los timestamps del host siguen siendo monotónicos.
    pub fn reset(&mut self) {
        self.nod.reset();
        self.shake.reset();
        self.disambiguator.reset();
        self.scheduler.clear();
        self.nod_timeout = None;
        self.shake_timeout = None;
        self.nod_delivery = None;
    }

    fn advance_to(&mut self, now_ms: u64) -> Vec<GestureEvent> {
        self.scheduler.advance(now_ms);
        let mut events = Vec::new();
        while let Some(due) = self.scheduler.pop_due() {
            match due.kind {
                TimerKind::NodTimeout => {
                    self.nod.expire(due.deadline_ms);
                    self.nod_timeout = None;
                }
                TimerKind::ShakeTimeout => {
                    self.shake.expire(due.deadline_ms);
                    self.shake_timeout = None;
                }
                TimerKind::NodDelivery => {
                    self.nod_delivery = None;
                    if let Some(event) = self.disambiguator.on_window_elapsed() {
                        events.push(event);
                    }
                }
            }
        }
        events
    }

    /// Mantiene un timer de timeout armado por cada gesto en vuelo, para
    /// que el estado vuelva a Idle aunque dejen de llegar muestras.
    fn sync_timeout_timers(&mut self) {
        sync_timeout_timer(
            &mut self.scheduler,
            &mut self.nod_timeout,
            self.nod.in_flight_since(),
            self.gesture_timeout_ms,
            TimerKind::NodTimeout,
        );
        sync_timeout_timer(
            &mut self.scheduler,
            &mut self.shake_timeout,
            self.shake.in_flight_since(),
            self.gesture_timeout_ms,
            TimerKind::ShakeTimeout,
        );
    }
}

fn sync_timeout_timer(
    scheduler: &mut GestureScheduler,
    slot: &mut Option<(TimerId, u64)>,
    in_flight_since: Option<u64>,
    timeout_ms: u64,
    kind: TimerKind,
) {
    match (in_flight_since, *slot) {
        (Some(started_at), Some((_, covered))) if covered == started_at => {}
        (Some(started_at), current) => {
            if let Some((id, _)) = current {
                scheduler.cancel(id);
            }
            // El descarte usa comparación estricta, de ahí el +1
            let deadline = started_at.saturating_add(timeout_ms).saturating_add(1);
            let delay = deadline.saturating_sub(scheduler.now());
            *slot = Some((scheduler.schedule_after(delay, kind), started_at));
        }
        (None, Some((id, _))) => {
            scheduler.cancel(id);
            *slot = None;
        }
        (None, None) => {}
    }
}
