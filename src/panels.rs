use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// One row of the module inventory table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PanelRecord {
    #[serde(rename = "Manufacturer", default)]
    pub manufacturer: Option<String>,
    #[serde(rename = "Model Name", default)]
    pub model_name: Option<String>,
    #[serde(rename = "Watt peak", default)]
    pub watt_peak: Option<String>,
    #[serde(rename = "Efficiency", default)]
    pub efficiency: Option<String>,
}

impl PanelRecord {
    /// `Manufacturer Model (WattWp, Eff%)`, with `N/A` for blank columns
    pub fn summary(&self) -> String {
        fn or_na(value: &Option<String>) -> &str {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or("N/A")
        }

        format!(
            "{} {} ({}Wp, {}%)",
            or_na(&self.manufacturer),
            or_na(&self.model_name),
            or_na(&self.watt_peak),
            or_na(&self.efficiency)
        )
    }
}

fn read_panels(path: &Path) -> Result<Vec<PanelRecord>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut panels = Vec::new();
    for row in reader.deserialize() {
        panels.push(row?);
    }
    Ok(panels)
}

/// Load the panel inventory once at startup. Never fails: an unreadable
/// table is logged and replaced by an empty inventory.
pub fn load_panel_inventory(path: impl AsRef<Path>) -> Vec<PanelRecord> {
    let path = path.as_ref();
    match read_panels(path) {
        Ok(panels) => {
            tracing::info!("Loaded {} panel records from {}", panels.len(), path.display());
            panels
        }
        Err(e) => {
            tracing::warn!("Could not load panel data from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_rows_by_header_name() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "Manufacturer,Model Name,Watt peak,Efficiency,Technology").unwrap();
        writeln!(file, "JA Solar,JAM72S20,450,20.7,Mono").unwrap();
        writeln!(file, "Longi,LR5-72HPH,,21.3,Mono").unwrap();

        let panels = load_panel_inventory(file.path());
        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].summary(), "JA Solar JAM72S20 (450Wp, 20.7%)");
        assert_eq!(panels[1].summary(), "Longi LR5-72HPH (N/AWp, 21.3%)");
    }

    #[test]
    fn test_missing_file_yields_empty_inventory() {
        let panels = load_panel_inventory("/no/such/module_data.csv");
        assert!(panels.is_empty());
    }
}
