// Sign-in, registration and the signed-in user.
use crate::client::{ApiClient, HttpService};
use crate::error::ClientResult;
use crate::model::{AuthSession, LoginInput, RegisterInput, UserProfile};
use http::Method;

pub async fn login<S: HttpService>(
    client: &ApiClient<S>,
    input: &LoginInput,
) -> ClientResult<UserProfile> {
    let session: AuthSession = client.post_anonymous("/auth/login", input).await?;
    client.session().store_session(&session).await?;
    log::info!("Signed in as {}", session.user.email);
    Ok(session.user)
}

pub async fn register<S: HttpService>(
    client: &ApiClient<S>,
    input: &RegisterInput,
) -> ClientResult<UserProfile> {
    let session: AuthSession = client.post_anonymous("/auth/register", input).await?;
    client.session().store_session(&session).await?;
    log::info!("Registered {} as {}", session.user.email, input.role);
    Ok(session.user)
}

/// Tells the backend, then forgets the local session whatever it answered.
pub async fn logout<S: HttpService>(client: &ApiClient<S>) -> ClientResult<()> {
    if let Err(e) = client.execute::<()>(Method::POST, "/auth/logout", None).await {
        log::warn!("Remote logout failed, clearing local session anyway: {}", e);
    }
    client.session().purge().await?;
    log::info!("Signed out");
    Ok(())
}

/// Fetches the profile and refreshes the cached copy.
pub async fn current_user<S: HttpService>(client: &ApiClient<S>) -> ClientResult<UserProfile> {
    let user: UserProfile = client.get("/users/me").await?;
    client.session().store_user(&user).await?;
    Ok(user)
}
