use crate::types::{DetectorConfig, GestureEvent};

/// Decisión del desambiguador ante una señal cruda de nod
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodDisposition {
    /// Segundo nod del par: emitir DoubleNod ya y cancelar la entrega
    /// del Nod simple que estaba programada
    EmitDoubleNod,
    /// Primer nod de un posible par: retener y entregar un Nod simple
    /// en `deliver_at_ms` salvo que llegue el segundo antes
    AwaitWindow { deliver_at_ms: u64 },
}

/// Registro transitorio mientras se espera el posible segundo nod
#[derive(Debug, Clone, Copy)]
struct PendingNod {
    completed_at_ms: u64,
}

/// Colapsa dos nods rápidos en un DoubleNod. Es la única pieza del motor
/// que retrasa una emisión a propósito: el Nod simple no se reporta hasta
/// que la ventana vence sin segundo nod (latencia a cambio de corrección).
/// Los shakes nunca pasan por aquí.
pub struct NodDisambiguator {
    window_ms: u64,
    last_completion: Option<u64>,
    pending: Option<PendingNod>,
}

impl NodDisambiguator {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            window_ms: config.double_nod_window_ms,
            last_completion: None,
            pending: None,
        }
    }

    /// Clasifica una señal cruda. Funde solo si el nod anterior sigue
    /// retenido y la separación es estrictamente menor que la ventana.
    pub fn on_raw_nod(&mut self, now_ms: u64) -> NodDisposition {
        let second_of_pair = match (self.pending, self.last_completion) {
            (Some(_), Some(last)) => now_ms.saturating_sub(last) < self.window_ms,
            _ => false,
        };

        let disposition = if second_of_pair {
            self.pending = None;
            NodDisposition::EmitDoubleNod
        } else {
            // Tras un DoubleNod (o una entrega ya hecha) el par se olvida:
            // un tercer nod arranca un ciclo nuevo desde cero
            self.pending = Some(PendingNod {
                completed_at_ms: now_ms,
            });
            NodDisposition::AwaitWindow {
                deliver_at_ms: now_ms.saturating_add(self.window_ms),
            }
        };

        self.last_completion = Some(now_ms);
        disposition
    }

    /// La ventana venció sin segundo nod: libera el Nod simple retenido.
    /// Si no había nada pendiente (ya fundido o ya entregado) no hace nada.
    pub fn on_window_elapsed(&mut self) -> Option<GestureEvent> {
        self.pending.take().map(|_| GestureEvent::Nod)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Instante en que se completó el nod retenido, si lo hay
    pub fn pending_since(&self) -> Option<u64> {
        self.pending.map(|p| p.completed_at_ms)
    }

    pub fn reset(&mut self) {
        self.last_completion = None;
        self.pending = None;
    }
}
