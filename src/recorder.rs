use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use log::info;
use crate::dsp::PpgError;
use crate::types::VitalSigns;

/// Appends one JSON object per analysis cycle (JSON lines).
pub struct VitalsRecorder<W: Write = BufWriter<File>> {
    writer: W,
    records: usize,
}

impl VitalsRecorder {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PpgError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        info!("recording vitals to {}", path.display());
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> VitalsRecorder<W> {
    pub fn from_writer(writer: W) -> Self {
        Self { writer, records: 0 }
    }

    pub fn record(&mut self, vitals: &VitalSigns) -> Result<(), PpgError> {
        serde_json::to_writer(&mut self.writer, vitals)?;
        writeln!(self.writer)?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(mut self) -> Result<W, PpgError> {
        self.writer.flush()?;
        info!("{} vitals records written", self.records);
        Ok(self.writer)
    }
}

/// Writes one value per line with `precision` decimals.
pub fn save_signal(
    path: impl AsRef<Path>,
    signal: &[f32],
    precision: usize,
) -> Result<(), PpgError> {
    let mut w = BufWriter::new(File::create(path.as_ref())?);
    write_signal(&mut w, signal, precision)?;
    w.flush()?;
    info!("saved {} samples to {}", signal.len(), path.as_ref().display());
    Ok(())
}

fn write_signal<W: Write>(w: &mut W, signal: &[f32], precision: usize) -> Result<(), PpgError> {
    for value in signal {
        writeln!(w, "{value:.precision$}")?;
    }
    Ok(())
}
