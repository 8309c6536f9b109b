use crate::client::core::path_segment;
use crate::client::{ApiClient, HttpService};
use crate::error::ClientResult;
use crate::model::{Appointment, AppointmentStatus};
use serde::Serialize;

#[derive(Serialize)]
struct StatusUpdate {
    status: AppointmentStatus,
}

/// Appointments booked with the signed-in doctor, soonest first.
pub async fn doctor_appointments<S: HttpService>(
    client: &ApiClient<S>,
) -> ClientResult<Vec<Appointment>> {
    let mut appointments: Vec<Appointment> =
        client.get("/appointments/doctor/appointments").await?;
    appointments.sort_by_key(|a| a.scheduled_at);
    Ok(appointments)
}

pub async fn get<S: HttpService>(client: &ApiClient<S>, id: &str) -> ClientResult<Appointment> {
    client
        .get(&format!("/appointments/{}", path_segment(id)?))
        .await
}

pub async fn update_status<S: HttpService>(
    client: &ApiClient<S>,
    id: &str,
    status: AppointmentStatus,
) -> ClientResult<Appointment> {
    log::debug!("Setting appointment {} to {}", id, status);
    client
        .patch(
            &format!("/appointments/{}/status", path_segment(id)?),
            &StatusUpdate { status },
        )
        .await
}
