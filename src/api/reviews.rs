use crate::client::core::path_segment;
use crate::client::{ApiClient, HttpService};
use crate::error::ClientResult;
use crate::model::Review;

/// Reviews left for a doctor, newest first.
pub async fn for_doctor<S: HttpService>(
    client: &ApiClient<S>,
    doctor_id: &str,
) -> ClientResult<Vec<Review>> {
    let mut reviews: Vec<Review> = client
        .get(&format!("/reviews/doctor/{}", path_segment(doctor_id)?))
        .await?;
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(reviews)
}
