//! Typed bodies accepted by the inject endpoints
//!
//! These types exist only to validate externally produced payloads before
//! they are broadcast. The hub itself treats every payload as opaque bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Group that receives patient records
pub const PATIENTS_GROUP: &str = "patients";

/// Group that receives medical case readings
pub const CASES_GROUP: &str = "cases";

/// A patient record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id_usuario: i64,
    pub nombre: String,
    pub apellido: String,
    pub edad: i32,
    pub genero: String,
    pub numero_contacto: String,
}

/// A set of vital-sign readings attached to a patient's record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalCase {
    pub id_expediente: i64,
    pub id_usuario: i64,
    pub temperatura: f64,
    pub peso: f64,
    pub estatura: f64,
    pub ritmo_cardiaco: i32,
    /// Time of the reading; set to the decode time when the producer omits it
    #[serde(default = "Utc::now")]
    pub fecha_registro: DateTime<Utc>,
}
