use chrono::{Timelike, Utc};
use serde_json::{Value, json};

/// Placeholder records for when every other tier has failed.
///
/// The shapes match what the normalizers and the cycle expect; the values are
/// wave-shaped so dashboards show something alive rather than flat zeros. The
/// exact content is cosmetic and carries no alerting semantics.
pub fn synthetic_records(source_name: &str) -> Vec<Value> {
    let lower = source_name.to_ascii_lowercase();
    if lower.contains("rack") {
        synthetic_racks()
    } else if lower.contains("sensor") {
        synthetic_readings()
    } else if lower.contains("threshold") {
        vec![synthetic_thresholds()]
    } else {
        vec![json!({ "source": source_name, "synthetic": true })]
    }
}

fn wave(phase: f64, center: f64, amplitude: f64) -> f64 {
    ((center + phase.sin() * amplitude) * 100.0).round() / 100.0
}

fn tick_phase() -> f64 {
    let now = Utc::now();
    (now.minute() * 60 + now.second()) as f64 / 480.0
}

fn synthetic_racks() -> Vec<Value> {
    (1..=4u32)
        .map(|index| {
            json!({
                "name": format!("SYN-R{:02}", index),
                "site": "synthetic",
                "datacenter": "synthetic-01",
                "under_maintenance": false,
                "max_power_kw": 12.0,
                "max_units": 42,
                "free_units": (index * 7) % 42,
                "phase": if index % 2 == 0 { "three_phase" } else { "single_phase" },
            })
        })
        .collect()
}

fn synthetic_readings() -> Vec<Value> {
    let phase = tick_phase();
    (1..=4u32)
        .map(|index| {
            let offset = index as f64 * 0.7;
            json!({
                "rack_name": format!("SYN-R{:02}", index),
                "temperature_c": wave(phase + offset, 24.0, 3.0).clamp(15.0, 35.0),
                "humidity_pct": wave(phase * 0.7 + offset, 48.0, 8.0).clamp(20.0, 80.0),
                "total_power_kw": wave(phase * 0.4 + offset, 4.5, 1.5).clamp(0.0, 12.0),
                "total_current_a": wave(phase * 0.4 + offset, 11.0, 3.0).clamp(0.0, 30.0),
                "total_voltage_v": wave(phase * 0.1 + offset, 229.0, 2.0),
            })
        })
        .collect()
}

fn synthetic_thresholds() -> Value {
    json!({
        "min_temp": 18.0,
        "max_temp": 32.0,
        "min_humidity": 30.0,
        "max_humidity": 70.0,
        "max_current_single_phase_a": 16.0,
        "max_current_three_phase_a": 32.0,
        "created_at": Utc::now().to_rfc3339(),
    })
}
