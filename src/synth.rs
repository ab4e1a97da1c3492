use rand::Rng;

use crate::types::{AngularVelocitySample, DetectorConfig, NOMINAL_SAMPLE_PERIOD_MS};

/// Generadores de trazas sintéticas de velocidad angular. Los usa el modo
/// debug del daemon (una traza por tecla) y las pruebas; el ruido pequeño
/// de cada muestra queda muy por debajo de los umbrales.
const NOISE_AMPLITUDE: f32 = 0.1;

/// Cuántas muestras activas necesita una fase para superar la duración
/// mínima con margen de una muestra
fn phase_len(config: &DetectorConfig) -> u64 {
    let period = NOMINAL_SAMPLE_PERIOD_MS;
    (config.min_gesture_duration_ms + period - 1) / period + 1
}

struct TraceBuilder<R: Rng> {
    samples: Vec<AngularVelocitySample>,
    t_ms: u64,
    rng: R,
}

impl<R: Rng> TraceBuilder<R> {
    fn new(start_ms: u64, rng: R) -> Self {
        Self {
            samples: Vec::new(),
            t_ms: start_ms,
            rng,
        }
    }

    fn push(&mut self, pitch: f32, yaw: f32) {
        let sample = AngularVelocitySample::new(
            pitch + self.noise(),
            yaw + self.noise(),
            self.noise(),
            self.t_ms,
        );
        self.samples.push(sample);
        self.t_ms += NOMINAL_SAMPLE_PERIOD_MS;
    }

    fn idle(&mut self, count: u64) {
        for _ in 0..count {
            self.push(0.0, 0.0);
        }
    }

    /// Salta en el tiempo sin emitir muestras (huecos entre gestos)
    fn skip_to(&mut self, t_ms: u64) {
        if t_ms > self.t_ms {
            self.t_ms = t_ms;
        }
    }

    fn noise(&mut self) -> f32 {
        self.rng.gen_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE)
    }
}

/// Un asentimiento: rotación abajo sostenida y luego la inversión
pub fn nod_trace(config: &DetectorConfig, start_ms: u64) -> Vec<AngularVelocitySample> {
    let mut builder = TraceBuilder::new(start_ms, rand::thread_rng());
    push_nod(&mut builder, config);
    builder.idle(3);
    builder.samples
}

/// Una negación: vaivén completo en yaw, arrancando hacia un lado al azar
pub fn shake_trace(config: &DetectorConfig, start_ms: u64) -> Vec<AngularVelocitySample> {
    let mut builder = TraceBuilder::new(start_ms, rand::thread_rng());
    let amplitude = config.shake_rotation_threshold * 1.4;
    let sign = if builder.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let len = phase_len(config);

    builder.idle(3);
    for _ in 0..len {
        builder.push(0.0, sign * amplitude);
    }
    for _ in 0..len {
        builder.push(0.0, -sign * amplitude);
    }
    for _ in 0..len {
        builder.push(0.0, sign * amplitude);
    }
    builder.idle(3);
    builder.samples
}

/// Dos asentimientos separados apenas más que el cooldown, de modo que el
/// segundo caiga dentro de la ventana de doble nod. Requiere una
/// configuración donde cooldown + duración del gesto < ventana.
pub fn double_nod_trace(config: &DetectorConfig, start_ms: u64) -> Vec<AngularVelocitySample> {
    let mut builder = TraceBuilder::new(start_ms, rand::thread_rng());

    let first_completion = push_nod(&mut builder, config);
    builder.skip_to(first_completion + config.nod_cooldown_ms + NOMINAL_SAMPLE_PERIOD_MS);
    push_nod(&mut builder, config);
    builder.idle(3);
    builder.samples
}

/// Empuja el patrón de un nod y devuelve el timestamp de su completado
fn push_nod<R: Rng>(builder: &mut TraceBuilder<R>, config: &DetectorConfig) -> u64 {
    let amplitude = config.nod_rotation_threshold * 1.4;
    let len = phase_len(config);

    builder.idle(2);
    for _ in 0..len {
        builder.push(amplitude, 0.0);
    }
    let completion_ms = builder.t_ms;
    builder.push(-amplitude, 0.0);
    builder.push(-amplitude, 0.0);
    completion_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GestureEngine;
    use crate::nod_detector::NodDetector;
    use crate::shake_detector::ShakeDetector;
    use crate::types::GestureEvent;

    #[test]
    fn test_nod_trace_completes_exactly_once() {
        let config = DetectorConfig::default();
        let mut detector = NodDetector::new(&config);
        let completions: Vec<_> = nod_trace(&config, 0)
            .iter()
            .filter_map(|s| detector.on_sample(s.pitch_rate, s.timestamp_ms))
            .collect();
        assert_eq!(completions.len(), 1);
    }

    #[test]
    fn test_shake_trace_completes_exactly_once() {
        let config = DetectorConfig::default();
        // Repetir varias veces: el sentido inicial es aleatorio
        for _ in 0..10 {
            let mut detector = ShakeDetector::new(&config);
            let completions: Vec<_> = shake_trace(&config, 0)
                .iter()
                .filter_map(|s| detector.on_sample(s.yaw_rate, s.timestamp_ms))
                .collect();
            assert_eq!(completions.len(), 1);
        }
    }

    #[test]
    fn test_double_nod_trace_merges() {
        let config = DetectorConfig::default();
        let mut engine = GestureEngine::new(&config);
        let mut events = Vec::new();
        for sample in double_nod_trace(&config, 0) {
            events.extend(engine.on_sample(&sample));
        }
        while let Some(deadline) = engine.next_deadline() {
            events.extend(engine.on_timers(deadline));
        }
        assert_eq!(events, vec![GestureEvent::DoubleNod]);
    }

    #[test]
    fn test_traces_are_monotonic() {
        let config = DetectorConfig::default();
        for trace in [
            nod_trace(&config, 100),
            shake_trace(&config, 100),
            double_nod_trace(&config, 100),
        ] {
            assert!(trace[0].timestamp_ms >= 100);
            for pair in trace.windows(2) {
                assert!(pair[1].timestamp_ms > pair[0].timestamp_ms);
            }
        }
    }
}
