//! Turns arbitrary JSON into the typed insertable and changeset shapes.
//!
//! Every validator reads all of its fields before deciding, so one call
//! reports every offending field at once. Structural problems (missing,
//! wrong type, malformed) win over closed-set mismatches: a body with both
//! fails as `ValidationError`, a body whose only problem is an unknown enum
//! value fails as `InvalidEnumValue`.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::auth::{Credentials, Registration};
use crate::error::{EnumMismatch, PortalError, PortalResult};
use crate::models::{
    AppointmentChanges, AppointmentStatus, AppointmentType, ClosedSet, DoctorChanges,
    NewAppointment, NewDoctor, NewHealthMetric, NewMedicalRecord, NewMessage, NewPatient,
    NewUser, PatientChanges, ProfileSeed, RecordType, Role, DEFAULT_SPECIALTY,
};

/// Reads fields out of a JSON object while collecting every problem.
pub struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    invalid: Vec<String>,
    mismatches: Vec<EnumMismatch>,
}

impl<'a> FieldReader<'a> {
    pub fn new(body: &'a Value) -> PortalResult<Self> {
        let fields = body
            .as_object()
            .ok_or_else(|| PortalError::invalid_field("body"))?;
        Ok(Self {
            fields,
            invalid: Vec::new(),
            mismatches: Vec::new(),
        })
    }

    fn flag(&mut self, key: &str) {
        if !self.invalid.iter().any(|f| f == key) {
            self.invalid.push(key.to_string());
        }
    }

    // null and absent are the same thing for inserts
    fn present(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    fn has_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn required_text(&mut self, key: &str) -> Option<String> {
        match self.present(key).map(Value::as_str) {
            Some(Some(s)) if !s.trim().is_empty() => Some(s.to_string()),
            _ => {
                self.flag(key);
                None
            }
        }
    }

    /// Blank strings read as absent.
    pub fn optional_text(&mut self, key: &str) -> Option<String> {
        match self.present(key) {
            None => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.flag(key);
                None
            }
        }
    }

    /// Required, trimmed, lower-cased, syntactically valid address.
    pub fn email(&mut self, key: &str) -> Option<String> {
        let email = self.required_text(key)?.trim().to_lowercase();
        if validator::validate_email(email.as_str()) {
            Some(email)
        } else {
            self.flag(key);
            None
        }
    }

    /// Required string taken verbatim; only emptiness is rejected.
    pub fn secret(&mut self, key: &str) -> Option<String> {
        match self.present(key).map(Value::as_str) {
            Some(Some(s)) if !s.is_empty() => Some(s.to_string()),
            _ => {
                self.flag(key);
                None
            }
        }
    }

    pub fn text_list(&mut self, key: &str) -> Vec<String> {
        match self.present(key) {
            None => Vec::new(),
            Some(value) => match string_list(value) {
                Some(list) => list,
                None => {
                    self.flag(key);
                    Vec::new()
                }
            },
        }
    }

    fn parsed<T: FromStr>(&mut self, key: &str) -> Option<T> {
        let parsed = self
            .present(key)
            .and_then(Value::as_str)
            .and_then(|s| s.trim().parse::<T>().ok());
        if parsed.is_none() {
            self.flag(key);
        }
        parsed
    }

    pub fn required_id<T: FromStr>(&mut self, key: &str) -> Option<T> {
        self.parsed(key)
    }

    pub fn optional_id<T: FromStr>(&mut self, key: &str) -> Option<T> {
        if self.present(key).is_none() {
            return None;
        }
        self.parsed(key)
    }

    pub fn required_timestamp(&mut self, key: &str) -> Option<DateTime<Utc>> {
        let parsed = self
            .present(key)
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        if parsed.is_none() {
            self.flag(key);
        }
        parsed
    }

    pub fn optional_date(&mut self, key: &str) -> Option<NaiveDate> {
        if self.present(key).is_none() {
            return None;
        }
        self.parsed(key)
    }

    pub fn optional_bool(&mut self, key: &str) -> Option<bool> {
        match self.present(key) {
            None => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                self.flag(key);
                None
            }
        }
    }

    pub fn required_enum<E: ClosedSet>(&mut self, key: &str) -> Option<E> {
        if self.present(key).is_none() {
            self.flag(key);
            return None;
        }
        self.optional_enum(key)
    }

    pub fn optional_enum<E: ClosedSet>(&mut self, key: &str) -> Option<E> {
        match self.present(key) {
            None => None,
            Some(Value::String(s)) => match s.parse::<E>() {
                Ok(value) => Some(value),
                Err(_) => {
                    self.mismatches.push(EnumMismatch {
                        field: key.to_string(),
                        value: s.clone(),
                        expected: E::VARIANTS,
                    });
                    None
                }
            },
            Some(_) => {
                self.flag(key);
                None
            }
        }
    }

    // Changeset readers: absent -> None, null -> Some(None), value -> Some(Some(v)).

    pub fn patch_text(&mut self, key: &str) -> Option<Option<String>> {
        if !self.has_key(key) {
            return None;
        }
        match self.fields.get(key) {
            Some(Value::Null) => Some(None),
            Some(Value::String(s)) if s.trim().is_empty() => Some(None),
            _ => self.optional_text(key).map(Some),
        }
    }

    pub fn patch_date(&mut self, key: &str) -> Option<Option<NaiveDate>> {
        if !self.has_key(key) {
            return None;
        }
        match self.fields.get(key) {
            Some(Value::Null) => Some(None),
            _ => self.optional_date(key).map(Some),
        }
    }

    pub fn patch_required_text(&mut self, key: &str) -> Option<String> {
        if !self.has_key(key) {
            return None;
        }
        self.required_text(key)
    }

    pub fn patch_timestamp(&mut self, key: &str) -> Option<DateTime<Utc>> {
        if !self.has_key(key) {
            return None;
        }
        self.required_timestamp(key)
    }

    pub fn patch_enum<E: ClosedSet>(&mut self, key: &str) -> Option<E> {
        if !self.has_key(key) {
            return None;
        }
        self.required_enum(key)
    }

    pub fn patch_list(&mut self, key: &str) -> Option<Vec<String>> {
        if !self.has_key(key) {
            return None;
        }
        match self.fields.get(key) {
            Some(Value::Null) => Some(Vec::new()),
            _ => Some(self.text_list(key)),
        }
    }

    pub fn into_error(self) -> PortalError {
        if !self.invalid.is_empty() {
            PortalError::Validation {
                fields: self.invalid,
            }
        } else if !self.mismatches.is_empty() {
            PortalError::InvalidEnumValue(self.mismatches)
        } else {
            PortalError::Validation { fields: Vec::new() }
        }
    }

    pub fn finish(self) -> PortalResult<()> {
        if self.invalid.is_empty() && self.mismatches.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

// RFC 3339 first; a bare "YYYY-MM-DDTHH:MM[:SS]" is read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Copies a path identifier into the body under `key`. A body that already
/// carries anything other than the same id is rejected.
pub fn with_path_id(body: Value, key: &str, id: impl Display) -> PortalResult<Value> {
    let Value::Object(mut fields) = body else {
        return Err(PortalError::invalid_field("body"));
    };
    let id = id.to_string();
    match fields.get(key) {
        None | Some(Value::Null) => {}
        Some(Value::String(existing)) if existing.trim() == id => {}
        Some(_) => return Err(PortalError::invalid_field(key)),
    }
    fields.insert(key.to_string(), Value::String(id));
    Ok(Value::Object(fields))
}

pub fn new_user(body: &Value) -> PortalResult<NewUser> {
    let mut r = FieldReader::new(body)?;
    let email = r.email("email");
    let password = r.secret("password");
    let role = r.required_enum::<Role>("role");
    let full_name = r.required_text("fullName");

    let (Some(email), Some(password), Some(role), Some(full_name)) =
        (email, password, role, full_name)
    else {
        return Err(r.into_error());
    };
    r.finish()?;
    Ok(NewUser {
        email,
        password,
        role,
        full_name,
    })
}

/// Registration carries the user fields plus the profile seed for its role.
pub fn registration(body: &Value) -> PortalResult<Registration> {
    let mut r = FieldReader::new(body)?;
    let email = r.email("email");
    let password = r.secret("password");
    let role = r.required_enum::<Role>("role");
    let full_name = r.required_text("fullName");
    let specialty = r.optional_text("specialty");
    let phone = r.optional_text("phone");

    let (Some(email), Some(password), Some(role), Some(full_name)) =
        (email, password, role, full_name)
    else {
        return Err(r.into_error());
    };
    r.finish()?;

    let profile = match role {
        Role::Patient => ProfileSeed::Patient { phone },
        Role::Doctor => ProfileSeed::Doctor {
            specialty: specialty.unwrap_or_else(|| DEFAULT_SPECIALTY.to_string()),
            phone,
        },
    };
    Ok(Registration {
        user: NewUser {
            email,
            password,
            role,
            full_name,
        },
        profile,
    })
}

pub fn credentials(body: &Value) -> PortalResult<Credentials> {
    let mut r = FieldReader::new(body)?;
    let email = r.required_text("email");
    let password = r.secret("password");

    let (Some(email), Some(password)) = (email, password) else {
        return Err(r.into_error());
    };
    r.finish()?;
    Ok(Credentials {
        email: email.trim().to_lowercase(),
        password,
    })
}

pub fn new_patient(body: &Value) -> PortalResult<NewPatient> {
    let mut r = FieldReader::new(body)?;
    let user_id = r.required_id("userId");
    let date_of_birth = r.optional_date("dateOfBirth");
    let phone = r.optional_text("phone");
    let address = r.optional_text("address");
    let blood_type = r.optional_text("bloodType");
    let allergies = r.text_list("allergies");

    let Some(user_id) = user_id else {
        return Err(r.into_error());
    };
    r.finish()?;
    Ok(NewPatient {
        user_id,
        date_of_birth,
        phone,
        address,
        blood_type,
        allergies,
    })
}

pub fn patient_changes(body: &Value) -> PortalResult<PatientChanges> {
    let mut r = FieldReader::new(body)?;
    let changes = PatientChanges {
        date_of_birth: r.patch_date("dateOfBirth"),
        phone: r.patch_text("phone"),
        address: r.patch_text("address"),
        blood_type: r.patch_text("bloodType"),
        allergies: r.patch_list("allergies"),
    };
    r.finish()?;
    Ok(changes)
}

pub fn new_doctor(body: &Value) -> PortalResult<NewDoctor> {
    let mut r = FieldReader::new(body)?;
    let user_id = r.required_id("userId");
    let specialty = r.required_text("specialty");
    let license_number = r.optional_text("licenseNumber");
    let phone = r.optional_text("phone");

    let (Some(user_id), Some(specialty)) = (user_id, specialty) else {
        return Err(r.into_error());
    };
    r.finish()?;
    Ok(NewDoctor {
        user_id,
        specialty,
        license_number,
        phone,
    })
}

pub fn doctor_changes(body: &Value) -> PortalResult<DoctorChanges> {
    let mut r = FieldReader::new(body)?;
    let changes = DoctorChanges {
        specialty: r.patch_required_text("specialty"),
        license_number: r.patch_text("licenseNumber"),
        phone: r.patch_text("phone"),
    };
    r.finish()?;
    Ok(changes)
}

pub fn new_appointment(body: &Value) -> PortalResult<NewAppointment> {
    let mut r = FieldReader::new(body)?;
    let patient_id = r.required_id("patientId");
    let doctor_id = r.required_id("doctorId");
    let appointment_date = r.required_timestamp("appointmentDate");
    let kind = r.required_enum::<AppointmentType>("type");
    let status = r.optional_enum::<AppointmentStatus>("status");
    let notes = r.optional_text("notes");

    let (Some(patient_id), Some(doctor_id), Some(appointment_date), Some(kind)) =
        (patient_id, doctor_id, appointment_date, kind)
    else {
        return Err(r.into_error());
    };
    r.finish()?;
    Ok(NewAppointment {
        patient_id,
        doctor_id,
        appointment_date,
        kind,
        status,
        notes,
    })
}

pub fn appointment_changes(body: &Value) -> PortalResult<AppointmentChanges> {
    let mut r = FieldReader::new(body)?;
    let changes = AppointmentChanges {
        appointment_date: r.patch_timestamp("appointmentDate"),
        kind: r.patch_enum("type"),
        status: r.patch_enum("status"),
        notes: r.patch_text("notes"),
    };
    r.finish()?;
    Ok(changes)
}

pub fn new_health_metric(body: &Value) -> PortalResult<NewHealthMetric> {
    let mut r = FieldReader::new(body)?;
    let patient_id = r.required_id("patientId");
    let metric_type = r.required_text("metricType");
    let value = r.required_text("value");
    let unit = r.required_text("unit");
    let notes = r.optional_text("notes");

    let (Some(patient_id), Some(metric_type), Some(value), Some(unit)) =
        (patient_id, metric_type, value, unit)
    else {
        return Err(r.into_error());
    };
    r.finish()?;
    Ok(NewHealthMetric {
        patient_id,
        metric_type,
        value,
        unit,
        notes,
    })
}

pub fn new_medical_record(body: &Value) -> PortalResult<NewMedicalRecord> {
    let mut r = FieldReader::new(body)?;
    let patient_id = r.required_id("patientId");
    let doctor_id = r.optional_id("doctorId");
    let title = r.required_text("title");
    let kind = r.required_enum::<RecordType>("type");
    let description = r.optional_text("description");
    let file_url = r.optional_text("fileUrl");
    let tags = r.text_list("tags");

    let (Some(patient_id), Some(title), Some(kind)) = (patient_id, title, kind) else {
        return Err(r.into_error());
    };
    r.finish()?;
    Ok(NewMedicalRecord {
        patient_id,
        doctor_id,
        title,
        kind,
        description,
        file_url,
        tags,
    })
}

pub fn new_message(body: &Value) -> PortalResult<NewMessage> {
    let mut r = FieldReader::new(body)?;
    let sender_id = r.required_id("senderId");
    let receiver_id = r.required_id("receiverId");
    let content = r.required_text("content");
    let read = r.optional_bool("read").unwrap_or(false);

    let (Some(sender_id), Some(receiver_id), Some(content)) = (sender_id, receiver_id, content)
    else {
        return Err(r.into_error());
    };
    r.finish()?;
    Ok(NewMessage {
        sender_id,
        receiver_id,
        content,
        read,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;
    use serde_json::json;
    use test_case::test_case;

    const PATIENT: &str = "0b6f5a3e-8c1d-4f2a-9e7b-1c2d3e4f5a6b";
    const DOCTOR: &str = "5d4c3b2a-1f0e-4d9c-8b7a-6f5e4d3c2b1a";

    fn fields_of(err: PortalError) -> Vec<String> {
        match err {
            PortalError::Validation { fields } => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn new_user_normalizes_email() {
        let user = new_user(&json!({
            "email": "  Alex@Example.COM ",
            "password": "secret123",
            "role": "patient",
            "fullName": "Alex Doe",
        }))
        .unwrap();
        assert_eq!(user.email, "alex@example.com");
        assert_eq!(user.role, Role::Patient);
    }

    #[test]
    fn new_user_reports_every_missing_field() {
        let err = new_user(&json!({ "role": "doctor" })).unwrap_err();
        assert_eq!(fields_of(err), vec!["email", "password", "fullName"]);
    }

    #[test_case("not-an-email"; "no at sign")]
    #[test_case("alex@"; "no domain")]
    #[test_case(""; "empty")]
    fn malformed_email_is_rejected(email: &str) {
        let err = new_user(&json!({
            "email": email,
            "password": "secret123",
            "role": "patient",
            "fullName": "Alex Doe",
        }))
        .unwrap_err();
        assert_eq!(fields_of(err), vec!["email"]);
    }

    #[test]
    fn unknown_role_is_an_enum_mismatch() {
        let err = new_user(&json!({
            "email": "alex@example.com",
            "password": "secret123",
            "role": "nurse",
            "fullName": "Alex Doe",
        }))
        .unwrap_err();
        match err {
            PortalError::InvalidEnumValue(m) => {
                assert_eq!(m[0].field, "role");
                assert_eq!(m[0].value, "nurse");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn appointment_with_unknown_type_fails_with_invalid_enum_value() {
        let err = new_appointment(&json!({
            "patientId": PATIENT,
            "doctorId": DOCTOR,
            "appointmentDate": "2025-03-01T09:30:00Z",
            "type": "Surgery",
        }))
        .unwrap_err();
        assert!(matches!(err, PortalError::InvalidEnumValue(_)));
    }

    #[test]
    fn structural_problems_win_over_enum_mismatches() {
        let err = new_appointment(&json!({
            "patientId": PATIENT,
            "type": "Surgery",
        }))
        .unwrap_err();
        assert_eq!(fields_of(err), vec!["doctorId", "appointmentDate"]);
    }

    #[test]
    fn appointment_defaults_and_local_timestamps() {
        let appt = new_appointment(&json!({
            "patientId": PATIENT,
            "doctorId": DOCTOR,
            "appointmentDate": "2025-03-01T09:30",
            "type": "Follow-up",
        }))
        .unwrap();
        assert_eq!(appt.kind, AppointmentType::FollowUp);
        assert_eq!(appt.status, None);
        assert_eq!(appt.appointment_date.to_rfc3339(), "2025-03-01T09:30:00+00:00");
    }

    #[test]
    fn doctor_registration_falls_back_to_general_practice() {
        let reg = registration(&json!({
            "email": "dr@example.com",
            "password": "pw",
            "role": "doctor",
            "fullName": "Dr Who",
            "phone": "555-0100",
        }))
        .unwrap();
        assert_eq!(
            reg.profile,
            ProfileSeed::Doctor {
                specialty: DEFAULT_SPECIALTY.to_string(),
                phone: Some("555-0100".into()),
            }
        );
    }

    #[test]
    fn patient_changes_distinguish_absent_from_null() {
        let changes = patient_changes(&json!({ "phone": "555-0199", "address": null })).unwrap();
        assert_eq!(changes.phone, Some(Some("555-0199".into())));
        assert_eq!(changes.address, Some(None));
        assert_eq!(changes.blood_type, None);
        assert_eq!(changes.allergies, None);
    }

    #[test]
    fn doctor_specialty_cannot_be_cleared() {
        let err = doctor_changes(&json!({ "specialty": null })).unwrap_err();
        assert_eq!(fields_of(err), vec!["specialty"]);
    }

    #[test]
    fn medical_record_tags_must_be_strings() {
        let err = new_medical_record(&json!({
            "patientId": PATIENT,
            "title": "Bloods",
            "type": "Lab Result",
            "tags": ["cbc", 4],
        }))
        .unwrap_err();
        assert_eq!(fields_of(err), vec!["tags"]);
    }

    #[test]
    fn message_read_defaults_to_false() {
        let msg = new_message(&json!({
            "senderId": PATIENT,
            "receiverId": DOCTOR,
            "content": "hi",
        }))
        .unwrap();
        assert!(!msg.read);
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        let err = new_message(&json!(["hi"])).unwrap_err();
        assert_eq!(fields_of(err), vec!["body"]);
    }

    #[test]
    fn path_id_must_agree_with_body() {
        let body = json!({ "patientId": DOCTOR });
        let err = with_path_id(body, "patientId", PATIENT).unwrap_err();
        assert_eq!(fields_of(err), vec!["patientId"]);

        let filled = with_path_id(json!({}), "patientId", PATIENT).unwrap();
        assert_eq!(filled["patientId"], PATIENT);
    }

    #[test_case(json!(42); "number")]
    #[test_case(json!(true); "boolean")]
    #[test_case(json!([PATIENT]); "array")]
    #[test_case(json!({ "id": PATIENT }); "object")]
    fn path_id_rejects_non_string_body_ids(existing: Value) {
        let err = with_path_id(json!({ "patientId": existing }), "patientId", PATIENT).unwrap_err();
        assert_eq!(fields_of(err), vec!["patientId"]);
    }

    #[test]
    fn path_id_fills_null_and_accepts_the_same_id() {
        let filled = with_path_id(json!({ "patientId": null }), "patientId", PATIENT).unwrap();
        assert_eq!(filled["patientId"], PATIENT);

        let same = with_path_id(json!({ "patientId": PATIENT }), "patientId", PATIENT).unwrap();
        assert_eq!(same["patientId"], PATIENT);
    }

    #[test]
    fn free_text_is_stored_verbatim() {
        let msg = new_message(&json!({
            "senderId": PATIENT,
            "receiverId": DOCTOR,
            "content": "  indented\n",
        }))
        .unwrap();
        assert_eq!(msg.content, "  indented\n");

        let record = new_medical_record(&json!({
            "patientId": PATIENT,
            "title": " Bloods ",
            "type": "Lab Result",
        }))
        .unwrap();
        assert_eq!(record.title, " Bloods ");
    }

    #[test_case("   "; "spaces")]
    #[test_case("\n\t"; "whitespace")]
    fn blank_required_text_is_missing(content: &str) {
        let err = new_message(&json!({
            "senderId": PATIENT,
            "receiverId": DOCTOR,
            "content": content,
        }))
        .unwrap_err();
        assert_eq!(fields_of(err), vec!["content"]);
    }

    #[test]
    fn login_email_is_trimmed_and_lower_cased() {
        let creds = credentials(&json!({ "email": " Alex@Example.com\n", "password": " pw " })).unwrap();
        assert_eq!(creds.email, "alex@example.com");
        assert_eq!(creds.password, " pw ");
    }

    #[test]
    fn blank_optional_text_reads_as_absent() {
        let reg = registration(&json!({
            "email": "alex@example.com",
            "password": "pw",
            "role": "patient",
            "fullName": "Alex Doe",
            "phone": "",
        }))
        .unwrap();
        assert_eq!(reg.profile, ProfileSeed::Patient { phone: None });

        let reg = registration(&json!({
            "email": "dr@example.com",
            "password": "pw",
            "role": "doctor",
            "fullName": "Dr Who",
            "specialty": "  ",
            "phone": " ",
        }))
        .unwrap();
        assert_eq!(
            reg.profile,
            ProfileSeed::Doctor {
                specialty: DEFAULT_SPECIALTY.to_string(),
                phone: None,
            }
        );
    }

    #[test]
    fn blank_text_in_a_patch_clears_the_field() {
        let changes = patient_changes(&json!({ "phone": "", "address": "  " })).unwrap();
        assert_eq!(changes.phone, Some(None));
        assert_eq!(changes.address, Some(None));
    }

    #[test]
    fn new_patient_reads_every_column() {
        let patient = new_patient(&json!({
            "userId": PATIENT,
            "dateOfBirth": "1990-05-17",
            "phone": "555-0100",
            "bloodType": "O+",
            "allergies": ["penicillin", "latex"],
        }))
        .unwrap();
        assert_eq!(patient.user_id, PATIENT.parse::<UserId>().unwrap());
        assert_eq!(patient.date_of_birth, NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(patient.phone.as_deref(), Some("555-0100"));
        assert_eq!(patient.address, None);
        assert_eq!(patient.blood_type.as_deref(), Some("O+"));
        assert_eq!(patient.allergies, ["penicillin", "latex"]);
    }

    #[test_case(json!({}), &["userId"]; "missing user id")]
    #[test_case(json!({ "userId": "nope" }), &["userId"]; "malformed user id")]
    #[test_case(json!({ "userId": PATIENT, "allergies": ["latex", 1] }), &["allergies"]; "non-string allergy")]
    #[test_case(json!({ "userId": PATIENT, "allergies": "latex" }), &["allergies"]; "allergies not a list")]
    #[test_case(json!({ "allergies": [null], "dateOfBirth": "17/05/1990" }), &["userId", "dateOfBirth", "allergies"]; "several at once")]
    fn new_patient_rejects(body: Value, expected: &[&str]) {
        let err = new_patient(&body).unwrap_err();
        assert_eq!(fields_of(err), expected);
    }

    #[test]
    fn new_doctor_reads_every_column() {
        let doctor = new_doctor(&json!({
            "userId": DOCTOR,
            "specialty": "Cardiology",
            "licenseNumber": "MD-1234",
            "phone": "",
        }))
        .unwrap();
        assert_eq!(doctor.user_id, DOCTOR.parse::<UserId>().unwrap());
        assert_eq!(doctor.specialty, "Cardiology");
        assert_eq!(doctor.license_number.as_deref(), Some("MD-1234"));
        assert_eq!(doctor.phone, None);
    }

    #[test_case(json!({ "specialty": "Cardiology" }), &["userId"]; "missing user id")]
    #[test_case(json!({ "userId": DOCTOR }), &["specialty"]; "missing specialty")]
    #[test_case(json!({ "userId": DOCTOR, "specialty": " " }), &["specialty"]; "blank specialty")]
    #[test_case(json!({ "userId": DOCTOR, "specialty": "Cardiology", "phone": 5550100 }), &["phone"]; "numeric phone")]
    #[test_case(json!({}), &["userId", "specialty"]; "empty body")]
    fn new_doctor_rejects(body: Value, expected: &[&str]) {
        let err = new_doctor(&body).unwrap_err();
        assert_eq!(fields_of(err), expected);
    }
}
