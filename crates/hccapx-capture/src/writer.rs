//! HCCAPX file output
//!
//! A .hccapx file is a plain concatenation of 393-byte records with no global
//! header.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{HccapxError, Result};
use crate::record::{HccapxRecord, HCCAPX_RECORD_SIZE};

pub struct HccapxWriter<W: Write> {
    w: W,
    records: usize,
}

impl<W: Write> HccapxWriter<W> {
    pub fn new(w: W) -> Self {
        Self { w, records: 0 }
    }

    /// Append one record; incomplete records are refused
    pub fn write_record(&mut self, record: &HccapxRecord) -> Result<()> {
        if !record.is_complete() {
            return Err(HccapxError::invalid_record(
                "refusing to write a record without a message pair",
            ));
        }
        self.w.write_all(&record.to_bytes())?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn flush(&mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

/// Decode every record in a .hccapx file image
pub fn read_records(data: &[u8]) -> Result<Vec<HccapxRecord>> {
    if data.len() % HCCAPX_RECORD_SIZE != 0 {
        return Err(HccapxError::invalid_record(format!(
            "file size {} is not a multiple of {}",
            data.len(),
            HCCAPX_RECORD_SIZE
        )));
    }
    data.chunks_exact(HCCAPX_RECORD_SIZE)
        .map(HccapxRecord::from_bytes)
        .collect()
}

/// Write `record` to `path` via a temp file and rename
pub fn save_record(path: &Path, record: &HccapxRecord) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("hccapx.tmp");
    let mut open = fs::OpenOptions::new();
    open.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(0o600);
    }

    let file = open.open(&tmp_path)?;
    let mut writer = HccapxWriter::new(file);
    writer.write_record(record)?;
    writer.flush()?;
    writer.into_inner().sync_all()?;

    fs::rename(&tmp_path, path)?;
    tracing::info!("Saved HCCAPX record to {}", path.display());
    Ok(())
}
