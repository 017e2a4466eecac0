use serde_json::Value;

/// The JSON shapes the upstreams are known to produce.
///
/// Modeled as an explicit tagged union instead of ad hoc property probing so
/// every accepted shape is visible in one place.
#[derive(Debug)]
pub enum UpstreamResponse {
    /// New format: a bare array of records.
    Bare(Vec<Value>),
    /// Legacy envelope: `{"status": "Success", "data": [...]}`.
    Legacy { status: String, records: Vec<Value> },
    /// Paged envelope: `{"value": [...], "count"/"total"/"@odata.count": n}`.
    Paged {
        records: Vec<Value>,
        declared_total: Option<u64>,
    },
    /// Unnamed envelope: the first top-level key holding an array.
    KeyScan { key: String, records: Vec<Value> },
}

impl UpstreamResponse {
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::Bare(records)
            | Self::Legacy { records, .. }
            | Self::Paged { records, .. }
            | Self::KeyScan { records, .. } => records,
        }
    }

    pub fn declared_total(&self) -> Option<u64> {
        match self {
            Self::Paged { declared_total, .. } => *declared_total,
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Bare(_) => "bare_array",
            Self::Legacy { .. } => "legacy_envelope",
            Self::Paged { .. } => "paged_envelope",
            Self::KeyScan { .. } => "key_scan",
        }
    }
}

/// Classify one page-style response body. Returns `None` when no record array
/// can be located anywhere in the payload.
pub fn classify(value: Value) -> Option<UpstreamResponse> {
    match value {
        Value::Array(records) => Some(UpstreamResponse::Bare(records)),
        Value::Object(mut map) => {
            if let Some(Value::Array(records)) = map.remove("value") {
                let declared_total = ["@odata.count", "count", "total"]
                    .iter()
                    .find_map(|key| map.get(*key))
                    .and_then(Value::as_u64);
                return Some(UpstreamResponse::Paged {
                    records,
                    declared_total,
                });
            }

            let status = map
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_string);
            if let Some(Value::Array(records)) = map.remove("data") {
                return Some(match status {
                    Some(status) => UpstreamResponse::Legacy { status, records },
                    None => UpstreamResponse::KeyScan {
                        key: "data".to_string(),
                        records,
                    },
                });
            }

            map.into_iter()
                .find_map(|(key, candidate)| match candidate {
                    Value::Array(records) => Some(UpstreamResponse::KeyScan { key, records }),
                    _ => None,
                })
        }
        _ => None,
    }
}

/// Normalize a single (non-paged) fetch response: only the bare-array format
/// and the legacy `Success` envelope are accepted.
pub fn normalize_flat(value: Value) -> Result<Vec<Value>, String> {
    match classify(value) {
        Some(UpstreamResponse::Bare(records)) => Ok(records),
        Some(UpstreamResponse::Legacy { status, records }) => {
            if status == "Success" {
                Ok(records)
            } else {
                Err(format!("legacy envelope reported status={}", status))
            }
        }
        Some(other) => Err(format!("unexpected response shape: {}", other.describe())),
        None => Err("no record array in response".to_string()),
    }
}
