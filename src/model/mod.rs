// File: ./src/model/mod.rs
pub mod appointment;
pub mod auth;
pub mod clinic;
pub mod doctor;

pub use appointment::{Appointment, AppointmentStatus, PatientSummary};
pub use auth::{AuthSession, LoginInput, RegisterInput, TokenPair, UserProfile};
pub use clinic::{Clinic, ClinicRegistration, ClinicService, ServiceInput};
pub use doctor::{DoctorProfile, DoctorProfileUpdate, Review};

use serde::Deserialize;

/// Response envelope used by every backend endpoint: `{ "data": ..., "message": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}
