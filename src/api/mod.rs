//! Typed wrappers over the backend's REST endpoints.
//!
//! Every call goes through the client's authenticated stack, so an expired
//! access token is refreshed and the call replayed without the caller noticing.
pub mod appointments;
pub mod auth;
pub mod clinics;
pub mod doctors;
pub mod reviews;
pub mod services;
