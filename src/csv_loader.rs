use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use csv::ReaderBuilder;

use crate::types::AngularVelocitySample;

/// Carga una traza de velocidades angulares desde un CSV en el formato
/// sample,t_ms,pitch,yaw,roll ordenado por índice de muestra.
pub fn load_trace_from_csv(path: impl AsRef<Path>) -> Result<Vec<AngularVelocitySample>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;

    let mut rows: BTreeMap<u64, AngularVelocitySample> = BTreeMap::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Fila {} inválida en {:?}", row_idx + 1, path))?;
        if record.len() < 5 {
            bail!("La fila {} no tiene 5 columnas", row_idx + 1);
        }

        let sample: u64 = record[0]
            .parse()
            .with_context(|| format!("sample inválido en fila {}", row_idx + 1))?;
        let t_ms: u64 = record[1]
            .parse()
            .with_context(|| format!("t_ms inválido en fila {}", row_idx + 1))?;
        let pitch: f32 = record[2].parse()?;
        let yaw: f32 = record[3].parse()?;
        let roll: f32 = record[4].parse()?;

        rows.insert(sample, AngularVelocitySample::new(pitch, yaw, roll, t_ms));
    }

    if rows.is_empty() {
        return Err(anyhow!("El CSV {:?} no contiene datos", path));
    }

    // Los huecos en el índice no importan: lo que manda es el timestamp,
    // pero este sí tiene que ser no decreciente
    let trace: Vec<AngularVelocitySample> = rows.into_values().collect();
    for (idx, pair) in trace.windows(2).enumerate() {
        ensure!(
            pair[1].timestamp_ms >= pair[0].timestamp_ms,
            "Timestamps no monotónicos en {:?}: {} ms seguido de {} ms (muestra {})",
            path,
            pair[0].timestamp_ms,
            pair[1].timestamp_ms,
            idx + 1
        );
    }

    Ok(trace)
}

/// Escribe una traza en el mismo formato que acepta el loader
pub fn write_trace_to_csv(path: impl AsRef<Path>, trace: &[AngularVelocitySample]) -> Result<()> {
    let path = path.as_ref();
    let mut file =
        File::create(path).with_context(|| format!("No se pudo crear el CSV {:?}", path))?;

    writeln!(file, "sample,t_ms,pitch,yaw,roll")?;
    for (idx, sample) in trace.iter().enumerate() {
        writeln!(
            file,
            "{},{},{},{},{}",
            idx, sample.timestamp_ms, sample.pitch_rate, sample.yaw_rate, sample.roll_rate
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_csv() {
        let trace = vec![
            AngularVelocitySample::new(0.1, -0.2, 0.0, 0),
            AngularVelocitySample::new(2.2, 0.0, 0.3, 20),
            AngularVelocitySample::new(-2.2, 0.1, 0.0, 140),
        ];

        let path = std::env::temp_dir().join("cefaloscopio_roundtrip.csv");
        write_trace_to_csv(&path, &trace).unwrap();
        let loaded = load_trace_from_csv(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, trace);
    }

    #[test]
    fn test_non_monotonic_timestamps_fail() {
        let path = std::env::temp_dir().join("cefaloscopio_bad_ts.csv");
        std::fs::write(&path, "sample,t_ms,pitch,yaw,roll\n0,100,0,0,0\n1,50,0,0,0\n").unwrap();
        let result = load_trace_from_csv(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_csv_fails() {
        let path = std::env::temp_dir().join("cefaloscopio_empty.csv");
        std::fs::write(&path, "sample,t_ms,pitch,yaw,roll\n").unwrap();
        let result = load_trace_from_csv(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }
}
