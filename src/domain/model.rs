use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Placeholder written when a field or a whole child list is absent.
pub const NOT_AVAILABLE: &str = "N/A";

// ============================================================================
// Registry payload
// ============================================================================

/// One facility as returned by the registry lookup.
///
/// Scalars are read leniently (string, number, bool or null) because the
/// registry is not consistent about types across records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub number: Option<String>,
    #[serde(default, rename = "oldNumber", deserialize_with = "lenient_text")]
    pub old_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, rename = "statuslabel", deserialize_with = "lenient_text")]
    pub status_label: Option<String>,
    #[serde(default, rename = "registrationDate", deserialize_with = "lenient_text")]
    pub registration_date: Option<String>,
    #[serde(default, deserialize_with = "label_or_text")]
    pub vid: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub owners: Vec<RawPerson>,
    #[serde(default, rename = "address", deserialize_with = "lenient_list")]
    pub addresses: Vec<RawAddress>,
    #[serde(default, rename = "medicalStaff", deserialize_with = "lenient_list")]
    pub medical_staff: Vec<RawStaff>,
}

impl RawRecord {
    /// Primary identifier, `None` when absent or blank.
    pub fn primary_id(&self) -> Option<&str> {
        self.number
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPerson {
    #[serde(default, deserialize_with = "lenient_text")]
    pub firstname: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub middlename: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lastname: Option<String>,
}

impl RawPerson {
    /// `"first middle last"` trimmed at the edges only.
    pub fn full_name(&self) -> String {
        format!(
            "{} {} {}",
            self.firstname.as_deref().unwrap_or_default(),
            self.middlename.as_deref().unwrap_or_default(),
            self.lastname.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAddress {
    #[serde(default, rename = "typeaddresslabel", deserialize_with = "lenient_text")]
    pub type_label: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ekatte: Option<String>,
    #[serde(default, rename = "fulladdress", deserialize_with = "lenient_text")]
    pub full_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub specialities: Vec<Labeled>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub activities: Vec<Labeled>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub district: Option<String>,
    // 欄位名稱照登錄處 API 原樣拼寫
    #[serde(default, rename = "munincipaliti", deserialize_with = "lenient_text")]
    pub municipality: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStaff {
    #[serde(flatten)]
    pub person: RawPerson,
    #[serde(default, rename = "typelabel", deserialize_with = "lenient_text")]
    pub type_label: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub specialities: Vec<Labeled>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Labeled {
    #[serde(default, deserialize_with = "lenient_text")]
    pub label: Option<String>,
}

/// Joins labels with `", "`; a missing label contributes an empty string.
pub fn join_labels(items: &[Labeled]) -> String {
    items
        .iter()
        .map(|item| item.label.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_text))
}

fn label_or_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => map.get("label").and_then(value_to_text),
        Some(other) => value_to_text(&other),
        None => None,
    })
}

fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

// ============================================================================
// Normalization result
// ============================================================================

/// Result of address normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedAddress {
    Valid(String),
    /// Status-only text (deregistered, closed, ground floor, ...).
    NotAnAddress,
    /// Cleanup left no spatial content and no settlement was recoverable.
    TooShort,
}

impl NormalizedAddress {
    pub fn as_text(&self) -> &str {
        match self {
            NormalizedAddress::Valid(text) => text,
            NormalizedAddress::NotAnAddress => "not-an-address",
            NormalizedAddress::TooShort => "too-short",
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            NormalizedAddress::Valid(_) => "valid",
            NormalizedAddress::NotAnAddress => "not_an_address",
            NormalizedAddress::TooShort => "too_short",
        }
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

// ============================================================================
// Output rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HospitalRow {
    #[serde(rename = "Hospital_ID")]
    pub hospital_id: String,
    #[serde(rename = "Old_Number")]
    pub old_number: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Manager")]
    pub manager: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Reg_Date")]
    pub registration_date: String,
    #[serde(rename = "Vid_LZ")]
    pub facility_kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressRow {
    #[serde(rename = "Hospital_ID")]
    pub hospital_id: String,
    #[serde(rename = "Type")]
    pub address_type: String,
    #[serde(rename = "City")]
    pub location_code: String,
    #[serde(rename = "Full_Address")]
    pub full_address: String,
    #[serde(rename = "Full_Address_Clean")]
    pub full_address_clean: String,
    #[serde(rename = "Clean_Status")]
    pub clean_status: String,
    #[serde(rename = "Address_Specialties")]
    pub specialties: String,
    #[serde(rename = "Address_Activities")]
    pub activities: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Municipality")]
    pub municipality: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorRow {
    #[serde(rename = "Hospital_ID")]
    pub hospital_id: String,
    #[serde(rename = "Doctor_Name")]
    pub doctor_name: String,
    #[serde(rename = "Type")]
    pub role: String,
    #[serde(rename = "Specialty")]
    pub specialties: String,
}

/// The three tables accumulated during one run.
#[derive(Debug, Clone, Default)]
pub struct HarvestTables {
    pub hospitals: Vec<HospitalRow>,
    pub addresses: Vec<AddressRow>,
    pub doctors: Vec<DoctorRow>,
}

impl HarvestTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hospitals.is_empty() && self.addresses.is_empty() && self.doctors.is_empty()
    }

    pub fn append(&mut self, mut other: HarvestTables) {
        self.hospitals.append(&mut other.hospitals);
        self.addresses.append(&mut other.addresses);
        self.doctors.append(&mut other.doctors);
    }
}

// ============================================================================
// Fetch / run bookkeeping
// ============================================================================

/// Outcome of one registry lookup.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Payload is a single record object or a list of them.
    Found(Value),
    NotFound,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    TimeBudgetExceeded,
    Drained,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Drained,
    TimeBudgetExceeded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
    pub records_dropped: usize,
    pub hospital_rows: usize,
    pub address_rows: usize,
    pub doctor_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stop_reason: StopReason,
    /// Identifiers checkpointed during this run, in processing order.
    pub processed: Vec<String>,
    /// Failed identifiers left pending by the `leave_pending` policy.
    pub deferred: Vec<String>,
    /// Identifiers never reached because the budget ran out.
    pub remaining: usize,
    pub stats: RunStats,
    pub output_path: Option<String>,
}

/// Advisory marker telling an orchestrator that another run is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuationSignal {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub processed_this_run: usize,
    pub remaining: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_record_lenient_fields() {
        let record: RawRecord = serde_json::from_value(json!({
            "number": 2201123456u64,
            "name": "АИПСМП Здраве",
            "vid": {"label": "Амбулатория за ПМП"},
            "owners": null,
            "address": "unexpected",
            "medicalStaff": [{"firstname": "Иван", "lastname": "Петров", "typelabel": "Лекар"}, 42]
        }))
        .unwrap();

        assert_eq!(record.primary_id(), Some("2201123456"));
        assert_eq!(record.vid.as_deref(), Some("Амбулатория за ПМП"));
        assert!(record.owners.is_empty());
        assert!(record.addresses.is_empty());
        assert_eq!(record.medical_staff.len(), 1);
        assert_eq!(record.medical_staff[0].person.full_name(), "Иван  Петров");
    }

    #[test]
    fn test_scalar_vid_and_blank_number() {
        let record: RawRecord =
            serde_json::from_value(json!({"number": "  ", "vid": "ГПСМП"})).unwrap();
        assert_eq!(record.primary_id(), None);
        assert_eq!(record.vid.as_deref(), Some("ГПСМП"));
    }

    #[test]
    fn test_join_labels_keeps_missing_labels() {
        let labels = vec![
            Labeled { label: Some("Кардиология".to_string()) },
            Labeled { label: None },
            Labeled { label: Some("Хирургия".to_string()) },
        ];
        assert_eq!(join_labels(&labels), "Кардиология, , Хирургия");
        assert_eq!(join_labels(&[]), "");
    }

    #[test]
    fn test_normalized_address_rendering() {
        assert_eq!(NormalizedAddress::Valid("гр. София".to_string()).as_text(), "гр. София");
        assert_eq!(NormalizedAddress::NotAnAddress.to_string(), "not-an-address");
        assert_eq!(NormalizedAddress::TooShort.status(), "too_short");
    }
}
