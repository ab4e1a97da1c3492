use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

/// Una lectura de velocidad angular del sensor montado en la cabeza.
/// Las tasas van en rad/s; el timestamp es monotónico no decreciente.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AngularVelocitySample {
    /// Rotación sobre el eje lateral (asentir: cabeza abajo = positivo)
    pub pitch_rate: f32,
    /// Rotación sobre el eje vertical (negar: giro a un lado = positivo)
    pub yaw_rate: f32,
    /// Rotación sobre el eje frontal; ningún detector la consume
    pub roll_rate: f32,
    /// Milisegundos monotónicos provistos por la plataforma
    pub timestamp_ms: u64,
}

impl AngularVelocitySample {
    pub fn new(pitch_rate: f32, yaw_rate: f32, roll_rate: f32, timestamp_ms: u64) -> Self {
        Self {
            pitch_rate,
            yaw_rate,
            roll_rate,
            timestamp_ms,
        }
    }
}

/// Gesto final entregado al host, ya desambiguado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    /// Asentimiento simple (confirmar)
    Nod,
    /// Negación con la cabeza (cancelar)
    Shake,
    /// Dos asentimientos rápidos colapsados en uno (alternar)
    DoubleNod,
}

impl GestureEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nod => "nod",
            Self::Shake => "shake",
            Self::DoubleNod => "double-nod",
        }
    }
}

/// Señal cruda de una máquina de estados, previa a la desambiguación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCompletion {
    /// Marca de tiempo en que se completó el gesto
    pub at_ms: u64,
}

/// Período nominal de muestreo del sensor (el motor no lo asume exacto)
pub const NOMINAL_SAMPLE_PERIOD_MS: u64 = 20;
pub const SAMPLING_RATE_HZ: f32 = 50.0;

/// Umbrales, cooldowns y ventanas del motor. Inmutable una vez construido:
/// los detectores reciben una copia y no existen valores globales.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Magnitud de pitch (rad/s) que cuenta como "rotando" para el nod
    pub nod_rotation_threshold: f32,
    /// Magnitud de yaw (rad/s) que cuenta como "rotando" para el shake
    pub shake_rotation_threshold: f32,
    /// Tiempo máximo para completar un gesto multifase
    pub gesture_timeout_ms: u64,
    /// Separación mínima entre nods completados
    pub nod_cooldown_ms: u64,
    /// Separación mínima entre shakes completados
    pub shake_cooldown_ms: u64,
    /// Separación máxima entre dos nods para fundirlos en un doble
    pub double_nod_window_ms: u64,
    /// Movimientos más breves que esto se descartan como ruido
    pub min_gesture_duration_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            nod_rotation_threshold: 1.8,
            shake_rotation_threshold: 2.0,
            gesture_timeout_ms: 800,
            nod_cooldown_ms: 250,
            shake_cooldown_ms: 700,
            double_nod_window_ms: 600,
            min_gesture_duration_ms: 100,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Umbral negativo: {field} = {value}")]
    NegativeThreshold { field: &'static str, value: f32 },
}

impl DetectorConfig {
    /// Las duraciones son no negativas por tipo; los umbrales hay que
    /// comprobarlos porque pueden venir de un JSON externo.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nod_rotation_threshold < 0.0 {
            return Err(ConfigError::NegativeThreshold {
                field: "nod_rotation_threshold",
                value: self.nod_rotation_threshold,
            });
        }
        if self.shake_rotation_threshold < 0.0 {
            return Err(ConfigError::NegativeThreshold {
                field: "shake_rotation_threshold",
                value: self.shake_rotation_threshold,
            });
        }
        Ok(())
    }

    /// Carga la configuración desde un JSON; los campos ausentes toman el
    /// valor por defecto (permite afinar por dispositivo sin repetir todo).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer la configuración {:?}", path))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Configuración inválida en {:?}", path))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DetectorConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let config = DetectorConfig {
            shake_rotation_threshold: -2.0,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{"nod_rotation_threshold": 2.5}"#).unwrap();
        assert_eq!(config.nod_rotation_threshold, 2.5);
        assert_eq!(config.gesture_timeout_ms, 800);
        assert_eq!(config.double_nod_window_ms, 600);
    }
}
