use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::io::format::{json, yaml};
use crate::io::{Format, IoError};

pub fn read_value<R: Read>(reader: R, format: Format) -> Result<Value, IoError> {
    match format {
        Format::Json => json::read_json(reader),
        Format::Yaml => yaml::read_yaml(reader),
    }
}

pub fn read_document<T: DeserializeOwned>(path: &Path, format: Format) -> Result<T, IoError> {
    let file = File::open(path)?;
    let value = read_value(file, format)?;
    Ok(serde_json::from_value(value)?)
}
