use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::mpsc::Receiver,
};

use log::error;

use crate::{PuttrackError, tracking::SessionLogEntry};

/// Writes every entry received to `file` as JSON lines until the sending side
/// hangs up.
pub fn write_session_log(
    file: &Path,
    log_receiver: Receiver<SessionLogEntry>,
) -> Result<(), PuttrackError> {
    let log_file = File::create(file).map_err(|e| PuttrackError::WriterError { source: e })?;
    let mut log_file_writer = BufWriter::new(log_file);
    for entry in &log_receiver {
        let _ = write_entry(&mut log_file_writer, &entry).map_err(|e| {
            error!("Error while writing entry to attempt log: {}", e);
        });
    }
    log_file_writer
        .flush()
        .map_err(|e| PuttrackError::WriterError { source: e })?;
    Ok(())
}

fn write_entry(writer: &mut impl Write, entry: &SessionLogEntry) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, entry)?;
    writeln!(writer)
}
