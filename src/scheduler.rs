/// Identificador de un timer programado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Qué debe ocurrir cuando vence un timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Descartar el nod parcial en vuelo
    NodTimeout,
    /// Descartar el shake parcial en vuelo
    ShakeTimeout,
    /// Entregar el Nod simple retenido por la ventana de doble nod
    NodDelivery,
}

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    id: TimerId,
    deadline_ms: u64,
    kind: TimerKind,
}

/// Timer vencido, listo para despachar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTimer {
    pub id: TimerId,
    pub kind: TimerKind,
    pub deadline_ms: u64,
}

/// Planificador de timers del motor. Única fuente de verdad para "ahora":
/// el reloj avanza con cada muestra o vencimiento y nunca retrocede.
/// Cancelar un timer que ya venció es un no-op.
pub struct GestureScheduler {
    now_ms: u64,
    next_id: u64,
    pending: Vec<TimerEntry>,
}

impl GestureScheduler {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Avanza el reloj; una marca anterior a la actual se ignora
    pub fn advance(&mut self, now_ms: u64) {
        if now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
    }

    /// Programa un timer a `delay_ms` del presente
    pub fn schedule_after(&mut self, delay_ms: u64, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(TimerEntry {
            id,
            deadline_ms: self.now_ms.saturating_add(delay_ms),
            kind,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|entry| entry.id != id);
    }

    /// Extrae el timer vencido más antiguo (deadline <= ahora), si lo hay.
    /// Los empates se resuelven por orden de programación.
    pub fn pop_due(&mut self) -> Option<DueTimer> {
        let mut best: Option<usize> = None;
        for (idx, entry) in self.pending.iter().enumerate() {
            if entry.deadline_ms > self.now_ms {
                continue;
            }
            let better = match best {
                None => true,
                Some(prev) => {
                    let prev = &self.pending[prev];
                    entry.deadline_ms < prev.deadline_ms
                        || (entry.deadline_ms == prev.deadline_ms && entry.id.0 < prev.id.0)
                }
            };
            if better {
                best = Some(idx);
            }
        }
        best.map(|idx| {
            let entry = self.pending.swap_remove(idx);
            DueTimer {
                id: entry.id,
                kind: entry.kind,
                deadline_ms: entry.deadline_ms,
            }
        })
    }

    /// Próximo vencimiento pendiente, en tiempo del motor
    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.iter().map(|entry| entry.deadline_ms).min()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Descarta todos los timers pendientes; el reloj se conserva
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for GestureScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut scheduler = GestureScheduler::new();
        let late = scheduler.schedule_after(500, TimerKind::ShakeTimeout);
        let early = scheduler.schedule_after(100, TimerKind::NodDelivery);

        assert_eq!(scheduler.next_deadline(), Some(100));
        assert!(scheduler.pop_due().is_none());

        scheduler.advance(600);
        let first = scheduler.pop_due().unwrap();
        assert_eq!(first.id, early);
        assert_eq!(first.deadline_ms, 100);
        let second = scheduler.pop_due().unwrap();
        assert_eq!(second.id, late);
        assert!(scheduler.pop_due().is_none());
        assert!(scheduler.is_idle());
    }

    #[test]
    fn cancel_removes_pending_timer() {
        let mut scheduler = GestureScheduler::new();
        let id = scheduler.schedule_after(100, TimerKind::NodDelivery);
        scheduler.cancel(id);
        scheduler.advance(200);
        assert!(scheduler.pop_due().is_none());
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let mut scheduler = GestureScheduler::new();
        let id = scheduler.schedule_after(100, TimerKind::NodTimeout);
        scheduler.advance(150);
        assert!(scheduler.pop_due().is_some());
        scheduler.cancel(id);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn clock_never_goes_backwards() {
        let mut scheduler = GestureScheduler::new();
        scheduler.advance(300);
        scheduler.advance(100);
        assert_eq!(scheduler.now(), 300);
    }

    #[test]
    fn ties_resolve_in_scheduling_order() {
        let mut scheduler = GestureScheduler::new();
        let a = scheduler.schedule_after(100, TimerKind::NodTimeout);
        let b = scheduler.schedule_after(100, TimerKind::ShakeTimeout);
        scheduler.advance(100);
        assert_eq!(scheduler.pop_due().unwrap().id, a);
        assert_eq!(scheduler.pop_due().unwrap().id, b);
    }

    #[test]
    fn clear_drops_everything_but_keeps_now() {
        let mut scheduler = GestureScheduler::new();
        scheduler.advance(50);
        scheduler.schedule_after(100, TimerKind::NodDelivery);
        scheduler.clear();
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.now(), 50);
        assert_eq!(scheduler.next_deadline(), None);
    }
}
