use std::time::Duration;
use uinput::device::Device;
use uinput::event::keyboard;

use crate::types::GestureEvent;

/// Acción que el daemon inyecta al host por cada gesto reconocido
#[derive(Debug, Clone, Copy)]
pub enum GestureAction {
    /// Asentimiento → Enter
    Confirm,
    /// Negación → Escape
    Cancel,
    /// Doble asentimiento → Espacio
    Toggle,
}

impl GestureAction {
    pub fn from_event(event: GestureEvent) -> Self {
        match event {
            GestureEvent::Nod => GestureAction::Confirm,
            GestureEvent::Shake => GestureAction::Cancel,
            GestureEvent::DoubleNod => GestureAction::Toggle,
        }
    }
}

pub struct HidOutput {
    dev: Device,
}

impl HidOutput {
    pub fn new() -> Result<Self, uinput::Error> {
        let dev = uinput::default()?
            .name("cefaloscopio-hid")?
            .event(uinput::event::Keyboard::All)?
            .create()?;

        Ok(HidOutput { dev })
    }

    fn sync(&mut self) -> Result<(), uinput::Error> {
        self.dev.synchronize()
    }

    fn key_tap(&mut self, key: keyboard::Key) -> Result<(), uinput::Error> {
        self.dev.press(&keyboard::Keyboard::Key(key))?;
        self.sync()?;
        std::thread::sleep(Duration::from_millis(10));
        self.dev.release(&keyboard::Keyboard::Key(key))?;
        self.sync()
    }

    pub fn send(&mut self, action: GestureAction) -> Result<(), uinput::Error> {
        match action {
            GestureAction::Confirm => self.key_tap(keyboard::Key::Enter),
            GestureAction::Cancel => self.key_tap(keyboard::Key::Esc),
            GestureAction::Toggle => self.key_tap(keyboard::Key::Space),
        }
    }
}
