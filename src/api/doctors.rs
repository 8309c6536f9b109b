use crate::client::{ApiClient, HttpService};
use crate::error::ClientResult;
use crate::model::{DoctorProfile, DoctorProfileUpdate};

pub async fn profile<S: HttpService>(client: &ApiClient<S>) -> ClientResult<DoctorProfile> {
    client.get("/doctors/profile").await
}

pub async fn update_profile<S: HttpService>(
    client: &ApiClient<S>,
    update: &DoctorProfileUpdate,
) -> ClientResult<DoctorProfile> {
    client.put("/doctors/profile", update).await
}
