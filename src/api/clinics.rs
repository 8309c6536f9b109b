use crate::client::core::path_segment;
use crate::client::{ApiClient, HttpService};
use crate::error::ClientResult;
use crate::model::{Clinic, ClinicRegistration};

pub async fn my_clinics<S: HttpService>(client: &ApiClient<S>) -> ClientResult<Vec<Clinic>> {
    client.get("/clinics/my/clinics").await
}

pub async fn get<S: HttpService>(client: &ApiClient<S>, id: &str) -> ClientResult<Clinic> {
    client.get(&format!("/clinics/{}", path_segment(id)?)).await
}

pub async fn register<S: HttpService>(
    client: &ApiClient<S>,
    registration: &ClinicRegistration,
) -> ClientResult<Clinic> {
    client.post("/clinics", registration).await
}
