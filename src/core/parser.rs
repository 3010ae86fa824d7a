use crate::core::normalizer;
use crate::domain::model::{
    join_labels, AddressRow, DoctorRow, HarvestTables, HospitalRow, RawAddress, RawRecord,
    RawStaff, NOT_AVAILABLE,
};
use serde_json::Value;

/// Splits a lookup payload into records: a list stays a list, an object
/// becomes a list of one. Elements that are not records are skipped.
pub fn records_from_payload(payload: Value) -> Vec<RawRecord> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };

    items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| match serde_json::from_value::<RawRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Skipping undecodable record: {}", e);
                None
            }
        })
        .collect()
}

/// Expands a payload into the three tables.
///
/// Returns the tables together with the number of records dropped for
/// lacking a primary identifier.
pub fn parse_payload(payload: Value) -> (HarvestTables, usize) {
    let mut tables = HarvestTables::new();
    let mut dropped = 0;

    for record in records_from_payload(payload) {
        if !expand_record(&record, &mut tables) {
            dropped += 1;
        }
    }

    (tables, dropped)
}

/// Appends the rows of one record. `false` when the record has no primary
/// identifier and was dropped.
pub fn expand_record(record: &RawRecord, tables: &mut HarvestTables) -> bool {
    let Some(hospital_id) = record.primary_id() else {
        return false;
    };

    tables.hospitals.extend(hospital_rows(hospital_id, record));
    tables.addresses.extend(address_rows(hospital_id, &record.addresses));
    tables.doctors.extend(doctor_rows(hospital_id, &record.medical_staff));
    true
}

/// One row per owner; one `"N/A"` manager row when there are none.
pub fn hospital_rows(hospital_id: &str, record: &RawRecord) -> Vec<HospitalRow> {
    let row = |manager: String| HospitalRow {
        hospital_id: hospital_id.to_string(),
        old_number: text(&record.old_number),
        name: text(&record.name),
        manager,
        status: text(&record.status_label),
        registration_date: text(&record.registration_date),
        facility_kind: text(&record.vid),
    };

    if record.owners.is_empty() {
        return vec![row(NOT_AVAILABLE.to_string())];
    }
    record
        .owners
        .iter()
        .map(|owner| row(owner.full_name()))
        .collect()
}

pub fn address_rows(hospital_id: &str, addresses: &[RawAddress]) -> Vec<AddressRow> {
    if addresses.is_empty() {
        return vec![AddressRow {
            hospital_id: hospital_id.to_string(),
            address_type: String::new(),
            location_code: String::new(),
            full_address: NOT_AVAILABLE.to_string(),
            full_address_clean: NOT_AVAILABLE.to_string(),
            clean_status: String::new(),
            specialties: String::new(),
            activities: String::new(),
            region: String::new(),
            municipality: String::new(),
        }];
    }

    addresses
        .iter()
        .map(|address| {
            let raw = text(&address.full_address);
            let normalized = normalizer::normalize(&raw);
            AddressRow {
                hospital_id: hospital_id.to_string(),
                address_type: text(&address.type_label),
                location_code: text(&address.ekatte),
                full_address_clean: normalized.as_text().to_string(),
                clean_status: normalized.status().to_string(),
                full_address: raw,
                specialties: join_labels(&address.specialities),
                activities: join_labels(&address.activities),
                region: text(&address.district),
                municipality: text(&address.municipality),
            }
        })
        .collect()
}

pub fn doctor_rows(hospital_id: &str, staff: &[RawStaff]) -> Vec<DoctorRow> {
    if staff.is_empty() {
        return vec![DoctorRow {
            hospital_id: hospital_id.to_string(),
            doctor_name: NOT_AVAILABLE.to_string(),
            role: String::new(),
            specialties: String::new(),
        }];
    }

    staff
        .iter()
        .map(|member| DoctorRow {
            hospital_id: hospital_id.to_string(),
            doctor_name: member.person.full_name(),
            role: text(&member.type_label),
            specialties: join_labels(&member.specialities),
        })
        .collect()
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> Value {
        json!({
            "number": "2201123456",
            "oldNumber": 1234,
            "name": "ГППМП Здраве ООД",
            "statuslabel": "Активен",
            "registrationDate": "2015-03-02",
            "vid": {"label": "Групова практика"},
            "owners": [
                {"firstname": "Мария", "middlename": "Иванова", "lastname": "Петрова"},
                {"firstname": "Георги", "lastname": "Димитров"}
            ],
            "address": [{
                "typeaddresslabel": "Адрес на дейност",
                "ekatte": "68134",
                "fulladdress": "ул. Иван Вазов 15, ет. 2, офис 3, гр. София, Обл. София-град",
                "specialities": [{"label": "Педиатрия"}, {"label": "Кардиология"}],
                "activities": [{"label": "Профилактика"}],
                "district": "София-град",
                "munincipaliti": "Столична"
            }],
            "medicalStaff": [
                {"firstname": "Анна", "middlename": "Петрова", "lastname": "Колева",
                 "typelabel": "Лекар", "specialities": [{"label": "Педиатрия"}]}
            ]
        })
    }

    #[test]
    fn test_hospital_fan_out_per_owner() {
        let (tables, dropped) = parse_payload(sample_record());

        assert_eq!(dropped, 0);
        assert_eq!(tables.hospitals.len(), 2);
        assert_eq!(tables.hospitals[0].manager, "Мария Иванова Петрова");
        // no internal collapse when the middle name is missing
        assert_eq!(tables.hospitals[1].manager, "Георги  Димитров");

        let first = &tables.hospitals[0];
        for row in &tables.hospitals {
            assert_eq!(row.hospital_id, first.hospital_id);
            assert_eq!(row.old_number, "1234");
            assert_eq!(row.name, first.name);
            assert_eq!(row.status, "Активен");
            assert_eq!(row.registration_date, "2015-03-02");
            assert_eq!(row.facility_kind, "Групова практика");
        }
    }

    #[test]
    fn test_address_row_carries_raw_and_normalized() {
        let (tables, _) = parse_payload(sample_record());

        assert_eq!(tables.addresses.len(), 1);
        let row = &tables.addresses[0];
        assert_eq!(row.address_type, "Адрес на дейност");
        assert_eq!(row.location_code, "68134");
        assert!(row.full_address.starts_with("ул. Иван Вазов 15, ет. 2"));
        assert_eq!(row.full_address_clean, "ул. Иван Вазов 15, гр. София");
        assert_eq!(row.clean_status, "valid");
        assert_eq!(row.specialties, "Педиатрия, Кардиология");
        assert_eq!(row.activities, "Профилактика");
        assert_eq!(row.region, "София-град");
        assert_eq!(row.municipality, "Столична");
    }

    #[test]
    fn test_doctor_rows() {
        let (tables, _) = parse_payload(sample_record());

        assert_eq!(tables.doctors.len(), 1);
        assert_eq!(tables.doctors[0].doctor_name, "Анна Петрова Колева");
        assert_eq!(tables.doctors[0].role, "Лекар");
        assert_eq!(tables.doctors[0].specialties, "Педиатрия");
    }

    #[test]
    fn test_sentinel_rows_for_empty_lists() {
        let (tables, _) = parse_payload(json!({"number": "77", "name": "Празна"}));

        assert_eq!(tables.hospitals.len(), 1);
        assert_eq!(tables.hospitals[0].manager, NOT_AVAILABLE);

        assert_eq!(tables.addresses.len(), 1);
        let address = &tables.addresses[0];
        assert_eq!(address.full_address, NOT_AVAILABLE);
        assert_eq!(address.full_address_clean, NOT_AVAILABLE);
        assert_eq!(address.address_type, "");
        assert_eq!(address.clean_status, "");

        assert_eq!(tables.doctors.len(), 1);
        assert_eq!(tables.doctors[0].doctor_name, NOT_AVAILABLE);
        assert_eq!(tables.doctors[0].role, "");
    }

    #[test]
    fn test_list_payload_drops_records_without_id() {
        let payload = json!([
            {"number": "1", "name": "A"},
            {"name": "no id"},
            {"number": "", "name": "blank id"},
            "not a record",
            {"number": "2", "name": "B", "owners": [{"firstname": "X"}, {"firstname": "Y"}, {"firstname": "Z"}]}
        ]);

        let (tables, dropped) = parse_payload(payload);

        assert_eq!(dropped, 2);
        assert_eq!(tables.hospitals.len(), 1 + 3);
        assert_eq!(tables.addresses.len(), 2);
        assert_eq!(tables.doctors.len(), 2);
        assert!(tables.hospitals.iter().all(|row| row.hospital_id == "1" || row.hospital_id == "2"));
    }

    #[test]
    fn test_status_only_address_is_tagged() {
        let (tables, _) = parse_payload(json!({
            "number": "5",
            "address": [{"fulladdress": "Здравна служба"}, {"fulladdress": null}]
        }));

        assert_eq!(tables.addresses.len(), 2);
        assert_eq!(tables.addresses[0].full_address_clean, "not-an-address");
        assert_eq!(tables.addresses[0].clean_status, "not_an_address");
        assert_eq!(tables.addresses[1].full_address, "");
        assert_eq!(tables.addresses[1].clean_status, "too_short");
    }

    #[test]
    fn test_null_payload_is_empty() {
        let (tables, dropped) = parse_payload(Value::Null);
        assert!(tables.is_empty());
        assert_eq!(dropped, 0);
    }
}
