use crate::client::core::path_segment;
use crate::client::{ApiClient, HttpService};
use crate::error::ClientResult;
use crate::model::{ClinicService, ServiceInput};

pub async fn my_services<S: HttpService>(
    client: &ApiClient<S>,
) -> ClientResult<Vec<ClinicService>> {
    client.get("/services/my-services").await
}

pub async fn create<S: HttpService>(
    client: &ApiClient<S>,
    input: &ServiceInput,
) -> ClientResult<ClinicService> {
    client.post("/services", input).await
}

pub async fn update<S: HttpService>(
    client: &ApiClient<S>,
    id: &str,
    input: &ServiceInput,
) -> ClientResult<ClinicService> {
    client
        .put(&format!("/services/{}", path_segment(id)?), input)
        .await
}

pub async fn delete<S: HttpService>(client: &ApiClient<S>, id: &str) -> ClientResult<()> {
    client
        .delete(&format!("/services/{}", path_segment(id)?))
        .await
}
