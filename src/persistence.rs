// src/persistence.rs

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};

pub(crate) fn save_to_file<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = bincode::serde::encode_into_std_write(value, &mut writer, bincode::config::standard())
        .map_err(|e| Error::Serialization(format!("failed to encode {:?}: {}", path, e)))?;
    writer.flush()?;
    debug!("Wrote {} bytes to {:?}", written, path);
    Ok(())
}

pub(crate) fn load_from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let value = bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
        .map_err(|e| Error::Serialization(format!("failed to decode {:?}: {}", path, e)))?;
    debug!("Read {:?}", path);
    Ok(value)
}
