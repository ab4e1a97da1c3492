use crate::types::{DetectorConfig, RawCompletion};

/// Estados del gesto de asentimiento (eje pitch). La inversión de signo
/// (rotación abajo y luego arriba) es lo que distingue un nod intencional
/// de una deriva lenta de la cabeza.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodState {
    /// Esperando la rotación hacia abajo
    Idle,
    /// Se cruzó el umbral positivo; esperando la inversión
    FirstPhase { started_at: u64 },
    /// Se cruzó el umbral negativo; se resuelve en la misma muestra
    SecondPhase { started_at: u64 },
}

/// Máquina de estados del nod: dos fases (abajo, arriba) sobre la tasa de
/// pitch. Emite una señal cruda; la desambiguación simple/doble ocurre
/// aguas abajo.
pub struct NodDetector {
    rotation_threshold: f32,
    timeout_ms: u64,
    cooldown_ms: u64,
    min_duration_ms: u64,
    state: NodState,
    last_completion: Option<u64>,
}

impl NodDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            rotation_threshold: config.nod_rotation_threshold,
            timeout_ms: config.gesture_timeout_ms,
            cooldown_ms: config.nod_cooldown_ms,
            min_duration_ms: config.min_gesture_duration_ms,
            state: NodState::Idle,
            last_completion: None,
        }
    }

    /// Procesa una muestra de pitch. Durante el cooldown las muestras se
    /// ignoran por completo (sin evaluar transición alguna); así el rebote
    /// inmediato tras un nod detectado no re-dispara.
    pub fn on_sample(&mut self, pitch_rate: f32, now_ms: u64) -> Option<RawCompletion> {
        if self.in_cooldown(now_ms) {
            return None;
        }

        self.expire(now_ms);

        match self.state {
            NodState::Idle => {
                if pitch_rate > self.rotation_threshold {
                    self.state = NodState::FirstPhase { started_at: now_ms };
                }
                None
            }
            NodState::FirstPhase { started_at } => {
                if pitch_rate < -self.rotation_threshold {
                    self.state = NodState::SecondPhase { started_at };
                }
                self.resolve(now_ms)
            }
            NodState::SecondPhase { .. } => self.resolve(now_ms),
        }
    }

    /// Descarta el gesto parcial si excedió el timeout. La misma muestra
    /// que provoca el descarte se evalúa después desde Idle.
    pub fn expire(&mut self, now_ms: u64) {
        let started_at = match self.state {
            NodState::Idle => return,
            NodState::FirstPhase { started_at } | NodState::SecondPhase { started_at } => {
                started_at
            }
        };
        if now_ms.saturating_sub(started_at) > self.timeout_ms {
            self.state = NodState::Idle;
        }
    }

    /// Marca de inicio del gesto en vuelo, si lo hay (para armar el timeout)
    pub fn in_flight_since(&self) -> Option<u64> {
        match self.state {
            NodState::Idle => None,
            NodState::FirstPhase { started_at } | NodState::SecondPhase { started_at } => {
                Some(started_at)
            }
        }
    }

    /// Vuelve a Idle sin memoria de gestos parciales ni cooldown
    pub fn reset(&mut self) {
        self.state = NodState::Idle;
        self.last_completion = None;
    }

    fn in_cooldown(&self, now_ms: u64) -> bool {
        match self.last_completion {
            Some(last) => now_ms.saturating_sub(last) < self.cooldown_ms,
            None => false,
        }
    }

    /// La segunda fase se resuelve de inmediato: con duración suficiente
    /// emite; en cualquier caso vuelve a Idle.
    fn resolve(&mut self, now_ms: u64) -> Option<RawCompletion> {
        if let NodState::SecondPhase { started_at } = self.state {
            self.state = NodState::Idle;
            if now_ms.saturating_sub(started_at) >= self.min_duration_ms {
                self.last_completion = Some(now_ms);
                return Some(RawCompletion { at_ms: now_ms });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            nod_rotation_threshold: 1.8,
            gesture_timeout_ms: 800,
            nod_cooldown_ms: 250,
            min_gesture_duration_ms: 100,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn test_two_phase_nod_completes() {
        let mut detector = NodDetector::new(&test_config());
        assert!(detector.on_sample(2.2, 0).is_none());
        let completion = detector.on_sample(-2.2, 150).unwrap();
        assert_eq!(completion.at_ms, 150);
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_timeout_discards_partial_gesture() {
        let mut detector = NodDetector::new(&test_config());
        assert!(detector.on_sample(2.2, 0).is_none());
        // La inversión llega tarde: se descarta y no hay evento
        assert!(detector.on_sample(-2.2, 900).is_none());
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_too_brief_motion_is_rejected() {
        let mut detector = NodDetector::new(&test_config());
        assert!(detector.on_sample(2.2, 0).is_none());
        assert!(detector.on_sample(-2.2, 50).is_none());
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_cooldown_suppresses_everything() {
        let mut detector = NodDetector::new(&test_config());
        detector.on_sample(2.2, 0);
        assert!(detector.on_sample(-2.2, 150).is_some());

        // Oscilación inmediata tras el nod: ni siquiera entra a FirstPhase
        assert!(detector.on_sample(2.5, 200).is_none());
        assert!(detector.in_flight_since().is_none());
        assert!(detector.on_sample(-2.5, 350).is_none());

        // Pasado el cooldown (150 + 250) el detector vuelve a operar
        assert!(detector.on_sample(2.2, 450).is_none());
        assert!(detector.on_sample(-2.2, 600).is_some());
    }

    #[test]
    fn test_no_completions_closer_than_cooldown() {
        // Propiedad: nunca dos señales crudas separadas menos que el cooldown
        let mut detector = NodDetector::new(&test_config());
        let mut completions = Vec::new();
        let mut t = 0u64;
        for _ in 0..200 {
            let pitch = if (t / 100) % 2 == 0 { 2.5 } else { -2.5 };
            if let Some(c) = detector.on_sample(pitch, t) {
                completions.push(c.at_ms);
            }
            t += 20;
        }
        for pair in completions.windows(2) {
            assert!(pair[1] - pair[0] >= 250, "completions {:?}", completions);
        }
    }

    #[test]
    fn test_subthreshold_noise_is_absorbed() {
        let mut detector = NodDetector::new(&test_config());
        for (i, pitch) in [0.3f32, -1.0, 1.5, -1.7, 0.9].iter().enumerate() {
            assert!(detector.on_sample(*pitch, i as u64 * 20).is_none());
        }
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_upward_first_motion_does_not_start() {
        let mut detector = NodDetector::new(&test_config());
        assert!(detector.on_sample(-2.2, 0).is_none());
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_late_sample_reopens_from_idle() {
        let mut detector = NodDetector::new(&test_config());
        detector.on_sample(2.2, 0);
        // Tras expirar, la misma muestra fuerte abre un gesto nuevo
        assert!(detector.on_sample(2.4, 900).is_none());
        assert_eq!(detector.in_flight_since(), Some(900));
        assert!(detector.on_sample(-2.2, 1050).is_some());
    }

    #[test]
    fn test_reset_forgets_partial_state_and_cooldown() {
        let mut detector = NodDetector::new(&test_config());
        detector.on_sample(2.2, 0);
        detector.on_sample(-2.2, 150);
        detector.reset();
        // Sin cooldown heredado: un nod inmediato vuelve a contar
        assert!(detector.on_sample(2.2, 160).is_none());
        assert!(detector.on_sample(-2.2, 300).is_some());
    }
}
