//! CSV export datasetu. I/O chyby se vrací volajícímu, neretryují se.

use crate::error::ExportError;
use crate::model::{Dataset, NormalizedRecord};
use std::fs;
use std::path::Path;
use tracing::info;

/// Zapíše dataset do CSV (hlavička = názvy sloupců), vytvoří chybějící adresáře
pub fn export(dataset: &Dataset, destination: &Path) -> Result<(), ExportError> {
    info!("Exporting {} rows to {}", dataset.len(), destination.display());

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ExportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let file = fs::File::create(destination).map_err(|source| ExportError::Io {
        path: destination.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);
    if dataset.is_empty() {
        // serde hlavičku píše až s prvním řádkem
        writer.write_record(crate::model::EXPORT_COLUMNS)?;
    }
    for record in dataset {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: destination.to_path_buf(),
        source,
    })?;

    info!("Data exported successfully");
    Ok(())
}

/// Načte export zpět (pro prohlížení / další zpracování)
pub fn load(source: &Path) -> Result<Vec<NormalizedRecord>, ExportError> {
    let mut reader = csv::Reader::from_path(source)?;
    reader
        .deserialize()
        .collect::<Result<Vec<NormalizedRecord>, csv::Error>>()
        .map_err(ExportError::from)
}
