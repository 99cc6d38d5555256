// models/src/medical/prescription.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub instructions: String,
}

/// Diagnosis and medicine list written by the appointment's doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub diagnosis: String,
    pub medicines: Vec<Medicine>,
    pub prescribed_by: Uuid,
    pub prescribed_at: DateTime<Utc>,
}

impl Prescription {
    /// Builds a prescription, rejecting a blank diagnosis or unnamed medicines.
    /// Medicine order is preserved.
    pub fn new(
        diagnosis: &str,
        medicines: Vec<Medicine>,
        prescribed_by: Uuid,
        prescribed_at: DateTime<Utc>,
    ) -> ValidationResult<Self> {
        let diagnosis = diagnosis.trim();
        if diagnosis.is_empty() {
            return Err(ValidationError::MissingField("a diagnosis"));
        }
        if medicines.iter().any(|m| m.name.trim().is_empty()) {
            return Err(ValidationError::MissingField("a name for every medicine"));
        }
        Ok(Prescription {
            diagnosis: diagnosis.to_string(),
            medicines,
            prescribed_by,
            prescribed_at,
        })
    }

    pub fn has_diagnosis(&self) -> bool {
        !self.diagnosis.is_empty()
    }
}

/// What a client sees of a prescription. `diagnosis` and `medicines` are
/// withheld from the patient until the bill is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicines: Option<Vec<Medicine>>,
    pub prescribed_by: Uuid,
    pub prescribed_at: DateTime<Utc>,
    pub locked: bool,
}

impl PrescriptionView {
    pub fn from_prescription(prescription: &Prescription, locked: bool) -> Self {
        if locked {
            PrescriptionView {
                diagnosis: None,
                medicines: None,
                prescribed_by: prescription.prescribed_by,
                prescribed_at: prescription.prescribed_at,
                locked,
            }
        } else {
            PrescriptionView {
                diagnosis: Some(prescription.diagnosis.clone()),
                medicines: Some(prescription.medicines.clone()),
                prescribed_by: prescription.prescribed_by,
                prescribed_at: prescription.prescribed_at,
                locked,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paracetamol() -> Medicine {
        Medicine {
            name: "Paracetamol".into(),
            dosage: "500mg".into(),
            frequency: "twice a day".into(),
            duration: "5 days".into(),
            instructions: "after food".into(),
        }
    }

    #[test]
    fn should_reject_blank_diagnosis() {
        let err = Prescription::new("  ", vec![], Uuid::new_v4(), Utc::now()).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("a diagnosis"));
    }

    #[test]
    fn should_accept_empty_medicine_list() {
        let p = Prescription::new("Common cold", vec![], Uuid::new_v4(), Utc::now()).unwrap();
        assert!(p.medicines.is_empty());
        assert!(p.has_diagnosis());
    }

    #[test]
    fn should_reject_unnamed_medicine() {
        let mut m = paracetamol();
        m.name = String::new();
        assert!(Prescription::new("Fever", vec![m], Uuid::new_v4(), Utc::now()).is_err());
    }

    #[test]
    fn locked_view_hides_clinical_content() {
        let p = Prescription::new("Fever", vec![paracetamol()], Uuid::new_v4(), Utc::now()).unwrap();
        let locked = PrescriptionView::from_prescription(&p, true);
        assert!(locked.diagnosis.is_none() && locked.medicines.is_none());
        let json = serde_json::to_value(&locked).unwrap();
        assert!(json.get("diagnosis").is_none());

        let open = PrescriptionView::from_prescription(&p, false);
        assert_eq!(open.diagnosis.as_deref(), Some("Fever"));
        assert_eq!(open.medicines.unwrap()[0].name, "Paracetamol");
    }

    #[test]
    fn medicine_fields_default_when_missing() {
        let m: Medicine = serde_json::from_str(r#"{"name":"ORS"}"#).unwrap();
        assert_eq!(m.name, "ORS");
        assert!(m.dosage.is_empty());
    }
}
