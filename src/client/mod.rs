// File: ./src/client/mod.rs
pub mod auth;
pub mod cert;
pub mod core;
pub mod middleware;
pub mod queue;
pub mod refresh;
pub mod transport;

pub use crate::client::auth::{
    Anonymous, Attempt, BearerAuthLayer, BearerAuthService, LogOnlyRedirect, SignInRedirect,
};
pub use crate::client::core::{ApiClient, HttpService, HttpStack, HttpsApiClient};
pub use crate::client::middleware::{ClientHeadersLayer, ClientHeadersService};
pub use crate::client::refresh::{REFRESH_TOKEN_PATH, RefreshCoordinator, RefreshState};
pub use crate::client::transport::HyperTransport;
