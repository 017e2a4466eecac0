use serde::Deserialize;
use serde_json::Value;

use crate::store::{NewRack, PowerPhase};

/// Rack record as the inventory upstream reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RackRecord {
    pub name: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub datacenter: String,
    #[serde(default, alias = "maintenance")]
    pub under_maintenance: bool,
    #[serde(default, alias = "max_power")]
    pub max_power_kw: f64,
    #[serde(default)]
    pub max_units: u32,
    #[serde(default)]
    pub free_units: u32,
    #[serde(default)]
    pub phase: PowerPhase,
}

impl RackRecord {
    pub fn into_new_rack(self) -> NewRack {
        NewRack {
            name: self.name,
            site: self.site,
            datacenter: self.datacenter,
            under_maintenance: self.under_maintenance,
            max_power_kw: self.max_power_kw,
            max_units: self.max_units,
            free_units: self.free_units,
            phase: self.phase,
        }
    }
}

/// Sensor record as the readings upstream reports it; racks are referenced
/// by name and resolved against the store during the cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorRecord {
    #[serde(alias = "rack")]
    pub rack_name: String,
    #[serde(alias = "temperature")]
    pub temperature_c: f64,
    #[serde(default, alias = "humidity")]
    pub humidity_pct: f64,
    #[serde(default, alias = "power_kw")]
    pub total_power_kw: f64,
    #[serde(default, alias = "current_a")]
    pub total_current_a: f64,
    #[serde(default, alias = "voltage_v")]
    pub total_voltage_v: f64,
}

/// Decode loosely-shaped upstream records, counting the ones that do not
/// parse instead of failing the batch.
pub fn parse_records<T: serde::de::DeserializeOwned>(
    records: Vec<Value>,
    source_name: &str,
) -> Vec<T> {
    let total = records.len();
    let parsed: Vec<T> = records
        .into_iter()
        .filter_map(|record| serde_json::from_value(record).ok())
        .collect();

    let dropped = total - parsed.len();
    if dropped > 0 {
        log::warn!(
            "records_dropped source={} dropped={} kept={}",
            source_name,
            dropped,
            parsed.len()
        );
    }
    parsed
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RackRecord, SensorRecord, parse_records};

    #[test]
    fn parses_rack_records_with_defaults_and_aliases() {
        let records = vec![
            json!({"name": "R1", "site": "fra", "datacenter": "fra-01", "maintenance": true}),
            json!({"no_name_field": true}),
        ];

        let racks: Vec<RackRecord> = parse_records(records, "racks");
        assert_eq!(racks.len(), 1);
        assert_eq!(racks[0].name, "R1");
        assert!(racks[0].under_maintenance);
        assert_eq!(racks[0].max_units, 0);
    }

    #[test]
    fn parses_sensor_records_with_aliases() {
        let records = vec![json!({
            "rack": "R1",
            "temperature": 24.5,
            "humidity": 40.0,
            "current_a": 12.0,
        })];

        let readings: Vec<SensorRecord> = parse_records(records, "sensor-readings");
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].rack_name, "R1");
        assert_eq!(readings[0].temperature_c, 24.5);
        assert_eq!(readings[0].total_current_a, 12.0);
        assert_eq!(readings[0].total_voltage_v, 0.0);
    }
}
