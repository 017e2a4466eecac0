use crate::store::{AlertDirection, PowerPhase, ProblemType, ThresholdSet};

/// One sensor record resolved to its stored rack.
#[derive(Debug, Clone)]
pub(super) struct ResolvedReading {
    pub rack_id: u64,
    pub phase: PowerPhase,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub total_current_a: f64,
}

#[derive(Debug, Clone)]
pub(super) struct Violation {
    pub rack_id: u64,
    pub problem_type: ProblemType,
    pub alert_direction: AlertDirection,
    pub measured_value: f64,
    pub threshold_value: f64,
}

impl Violation {
    pub(super) fn dedup_key(&self) -> (u64, ProblemType, AlertDirection) {
        (self.rack_id, self.problem_type, self.alert_direction)
    }
}

/// Compare readings against the threshold set. Comparisons are strict: a
/// reading exactly at a limit is not a violation. Current limits depend on
/// the rack's power phase.
pub(super) fn evaluate_readings(
    thresholds: &ThresholdSet,
    readings: &[ResolvedReading],
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for reading in readings {
        if reading.temperature_c > thresholds.max_temp {
            violations.push(Violation {
                rack_id: reading.rack_id,
                problem_type: ProblemType::Temperature,
                alert_direction: AlertDirection::High,
                measured_value: reading.temperature_c,
                threshold_value: thresholds.max_temp,
            });
        } else if reading.temperature_c < thresholds.min_temp {
            violations.push(Violation {
                rack_id: reading.rack_id,
                problem_type: ProblemType::Temperature,
                alert_direction: AlertDirection::Low,
                measured_value: reading.temperature_c,
                threshold_value: thresholds.min_temp,
            });
        }

        if reading.humidity_pct > thresholds.max_humidity {
            violations.push(Violation {
                rack_id: reading.rack_id,
                problem_type: ProblemType::Humidity,
                alert_direction: AlertDirection::High,
                measured_value: reading.humidity_pct,
                threshold_value: thresholds.max_humidity,
            });
        } else if reading.humidity_pct < thresholds.min_humidity {
            violations.push(Violation {
                rack_id: reading.rack_id,
                problem_type: ProblemType::Humidity,
                alert_direction: AlertDirection::Low,
                measured_value: reading.humidity_pct,
                threshold_value: thresholds.min_humidity,
            });
        }

        let max_current = thresholds.max_current_for(reading.phase);
        if reading.total_current_a > max_current {
            violations.push(Violation {
                rack_id: reading.rack_id,
                problem_type: ProblemType::Power,
                alert_direction: AlertDirection::High,
                measured_value: reading.total_current_a,
                threshold_value: max_current,
            });
        }
    }

    violations
}
