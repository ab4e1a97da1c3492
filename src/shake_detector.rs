use crate::types::{DetectorConfig, RawCompletion};

/// Estados de la negación (eje yaw). Tres fases: un vaivén completo
/// izquierda-derecha-izquierda, o el espejo empezando hacia el otro lado.
/// `sign` guarda la dirección del primer giro para exigir las inversiones.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ShakeState {
    /// Esperando el primer giro en cualquier dirección
    Idle,
    /// Primer giro detectado; esperando la primera inversión
    FirstPhase { started_at: u64, sign: f32 },
    /// Primera inversión hecha; esperando volver a la dirección inicial
    SecondPhase { started_at: u64, sign: f32 },
    /// Vaivén completo; se resuelve en la misma muestra
    ThirdPhase { started_at: u64 },
}

/// Máquina de estados del shake sobre la tasa de yaw. Mismo patrón que el
/// nod pero con una fase más; los shakes nunca se retienen ni se funden.
pub struct ShakeDetector {
    rotation_threshold: f32,
    timeout_ms: u64,
    cooldown_ms: u64,
    min_duration_ms: u64,
    state: ShakeState,
    last_completion: Option<u64>,
}

impl ShakeDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            rotation_threshold: config.shake_rotation_threshold,
            timeout_ms: config.gesture_timeout_ms,
            cooldown_ms: config.shake_cooldown_ms,
            min_duration_ms: config.min_gesture_duration_ms,
            state: ShakeState::Idle,
            last_completion: None,
        }
    }

    /// Procesa una muestra de yaw; misma regla de cooldown que el nod
    pub fn on_sample(&mut self, yaw_rate: f32, now_ms: u64) -> Option<RawCompletion> {
        if self.in_cooldown(now_ms) {
            return None;
        }

        self.expire(now_ms);

        match self.state {
            ShakeState::Idle => {
                if yaw_rate.abs() > self.rotation_threshold {
                    self.state = ShakeState::FirstPhase {
                        started_at: now_ms,
                        sign: yaw_rate.signum(),
                    };
                }
                None
            }
            ShakeState::FirstPhase { started_at, sign } => {
                if yaw_rate * sign < -self.rotation_threshold {
                    self.state = ShakeState::SecondPhase { started_at, sign };
                }
                None
            }
            ShakeState::SecondPhase { started_at, sign } => {
                if yaw_rate * sign > self.rotation_threshold {
                    self.state = ShakeState::ThirdPhase { started_at };
                }
                self.resolve(now_ms)
            }
            ShakeState::ThirdPhase { .. } => self.resolve(now_ms),
        }
    }

    /// Descarta el gesto parcial vencido en cualquiera de las fases
    pub fn expire(&mut self, now_ms: u64) {
        let started_at = match self.state {
            ShakeState::Idle => return,
            ShakeState::FirstPhase { started_at, .. }
            | ShakeState::SecondPhase { started_at, .. }
            | ShakeState::ThirdPhase { started_at } => started_at,
        };
        if now_ms.saturating_sub(started_at) > self.timeout_ms {
            self.state = ShakeState::Idle;
        }
    }

    pub fn in_flight_since(&self) -> Option<u64> {
        match self.state {
            ShakeState::Idle => None,
            ShakeState::FirstPhase { started_at, .. }
            | ShakeState::SecondPhase { started_at, .. }
            | ShakeState::ThirdPhase { started_at } => Some(started_at),
        }
    }

    pub fn reset(&mut self) {
        self.state = ShakeState::Idle;
        self.last_completion = None;
    }

    fn in_cooldown(&self, now_ms: u64) -> bool {
        match self.last_completion {
            Some(last) => now_ms.saturating_sub(last) < self.cooldown_ms,
            None => false,
        }
    }

    fn resolve(&mut self, now_ms: u64) -> Option<RawCompletion> {
        if let ShakeState::ThirdPhase { started_at } = self.state {
            self.state = ShakeState::Idle;
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
            shake_rotation_threshold: 2.0,
            gesture_timeout_ms: 800,
            shake_cooldown_ms: 700,
            min_gesture_duration_ms: 100,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn test_three_phase_shake_completes() {
        let mut detector = ShakeDetector::new(&test_config());
        assert!(detector.on_sample(2.1, 0).is_none());
        assert!(detector.on_sample(-2.1, 150).is_none());
        let completion = detector.on_sample(2.1, 300).unwrap();
        assert_eq!(completion.at_ms, 300);
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_mirrored_shake_also_completes() {
        let mut detector = ShakeDetector::new(&test_config());
        assert!(detector.on_sample(-2.1, 0).is_none());
        assert!(detector.on_sample(2.1, 150).is_none());
        assert!(detector.on_sample(-2.1, 300).is_some());
    }

    #[test]
    fn test_timeout_discards_at_any_phase() {
        let config = test_config();

        // Vencimiento esperando la primera inversión: el parcial se
        // descarta y la misma muestra fuerte abre un gesto nuevo
        let mut detector = ShakeDetector::new(&config);
        detector.on_sample(2.1, 0);
        assert!(detector.on_sample(-2.1, 900).is_none());
        assert_eq!(detector.in_flight_since(), Some(900));

        // Vencimiento esperando el tercer giro
        let mut detector = ShakeDetector::new(&config);
        detector.on_sample(2.1, 0);
        detector.on_sample(-2.1, 150);
        assert!(detector.on_sample(2.1, 900).is_none());
        assert_eq!(detector.in_flight_since(), Some(900));

        // Una muestra débil tardía solo descarta, sin abrir nada
        let mut detector = ShakeDetector::new(&config);
        detector.on_sample(2.1, 0);
        assert!(detector.on_sample(0.5, 900).is_none());
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_two_swings_are_not_a_shake() {
        let mut detector = ShakeDetector::new(&test_config());
        detector.on_sample(2.1, 0);
        detector.on_sample(-2.1, 150);
        // Sin el tercer giro no hay evento; el parcial expira solo
        assert!(detector.in_flight_since().is_some());
        detector.expire(1000);
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_repeated_same_direction_does_not_advance() {
        let mut detector = ShakeDetector::new(&test_config());
        detector.on_sample(2.1, 0);
        assert!(detector.on_sample(2.4, 50).is_none());
        assert!(detector.on_sample(2.2, 100).is_none());
        // Sigue en la primera fase hasta que aparezca la inversión
        assert_eq!(detector.in_flight_since(), Some(0));
    }

    #[test]
    fn test_too_brief_shake_is_rejected() {
        let mut detector = ShakeDetector::new(&test_config());
        detector.on_sample(2.1, 0);
        detector.on_sample(-2.1, 30);
        assert!(detector.on_sample(2.1, 60).is_none());
        assert!(detector.in_flight_since().is_none());
    }

    #[test]
    fn test_cooldown_suppresses_following_motion() {
        let mut detector = ShakeDetector::new(&test_config());
        detector.on_sample(2.1, 0);
        detector.on_sample(-2.1, 150);
        assert!(detector.on_sample(2.1, 300).is_some());

        // Dentro del cooldown (300 + 700) nada se evalúa
        assert!(detector.on_sample(-2.5, 400).is_none());
        assert!(detector.on_sample(2.5, 600).is_none());
        assert!(detector.in_flight_since().is_none());

        // Después del cooldown un vaivén nuevo vuelve a detectarse
        detector.on_sample(2.1, 1000);
        detector.on_sample(-2.1, 1150);
        assert!(detector.on_sample(2.1, 1300).is_some());
    }
}
