/* clinicdesk/src/mobile.rs
 *
 * UniFFI interface exposing the authenticated client to mobile platforms.
 */

use crate::api;
use crate::client::{HttpsApiClient, SignInRedirect};
use crate::config::Config;
use crate::context::StandardContext;
use crate::error::ClientError;
use crate::model::{Appointment, Clinic, ClinicService, LoginInput, UserProfile};
use crate::session::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, uniffi::Error)]
#[uniffi(flat_error)]
pub enum MobileError {
    /// The session is gone; the app should show its sign-in screen.
    SignedOut(String),
    Generic(String),
}
impl From<ClientError> for MobileError {
    fn from(e: ClientError) -> Self {
        if e.is_session_terminal() {
            Self::SignedOut(e.to_string())
        } else {
            Self::Generic(e.to_string())
        }
    }
}
impl From<anyhow::Error> for MobileError {
    fn from(e: anyhow::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
impl std::fmt::Display for MobileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MobileError::SignedOut(s) | MobileError::Generic(s) => write!(f, "{}", s),
        }
    }
}
impl std::error::Error for MobileError {}

/// Implemented by the app; called once the stored session has been dropped.
#[uniffi::export(with_foreign)]
pub trait MobileSessionListener: Send + Sync {
    fn on_signed_out(&self, reason: String);
}

struct ListenerRedirect(Arc<dyn MobileSessionListener>);

impl SignInRedirect for ListenerRedirect {
    fn redirect_to_sign_in(&self, reason: &ClientError) {
        self.0.on_signed_out(reason.to_string());
    }
}

#[derive(uniffi::Record)]
pub struct MobileUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Option<String>,
    pub is_doctor: bool,
}

impl From<UserProfile> for MobileUser {
    fn from(u: UserProfile) -> Self {
        Self {
            display_name: u.display_name(),
            is_doctor: u.is_doctor(),
            id: u.id,
            email: u.email,
            role: u.role,
        }
    }
}

#[derive(uniffi::Record)]
pub struct MobileAppointment {
    pub id: String,
    pub status: String,
    pub is_final: bool,
    // RFC 3339, UTC
    pub scheduled_at_iso: String,
    pub duration_minutes: Option<u32>,
    pub patient_name: String,
    pub notes: Option<String>,
}

impl From<Appointment> for MobileAppointment {
    fn from(a: Appointment) -> Self {
        Self {
            status: a.status.to_string(),
            is_final: a.status.is_final(),
            scheduled_at_iso: a.scheduled_at.to_rfc3339(),
            patient_name: a.patient_name(),
            id: a.id,
            duration_minutes: a.duration_minutes,
            notes: a.notes,
        }
    }
}

#[derive(uniffi::Record)]
pub struct MobileClinic {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub is_verified: bool,
}

impl From<Clinic> for MobileClinic {
    fn from(c: Clinic) -> Self {
        Self {
            id: c.id,
            name: c.name,
            address: c.address,
            city: c.city,
            is_verified: c.is_verified,
        }
    }
}

#[derive(uniffi::Record)]
pub struct MobileService {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: Option<u32>,
}

impl From<ClinicService> for MobileService {
    fn from(s: ClinicService) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            price: s.price,
            duration_minutes: s.duration_minutes,
        }
    }
}

#[derive(uniffi::Object)]
pub struct ClinicMobile {
    client: HttpsApiClient,
}

#[uniffi::export(async_runtime = "tokio")]
impl ClinicMobile {
    #[uniffi::constructor]
    pub fn new(
        android_files_dir: String,
        api_url: String,
        listener: Arc<dyn MobileSessionListener>,
    ) -> Result<Self, MobileError> {
        #[cfg(target_os = "android")]
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("ClinicDeskRust"),
        );

        let ctx = StandardContext::new(Some(PathBuf::from(android_files_dir)));
        let session = SessionStore::for_context(&ctx)?;
        let config = Config::new(api_url);
        let client = HttpsApiClient::new(&config, session, Arc::new(ListenerRedirect(listener)))?;
        Ok(Self { client })
    }

    pub async fn login(&self, email: String, password: String) -> Result<MobileUser, MobileError> {
        let user = api::auth::login(&self.client, &LoginInput { email, password }).await?;
        Ok(user.into())
    }

    pub async fn logout(&self) -> Result<(), MobileError> {
        Ok(api::auth::logout(&self.client).await?)
    }

    pub async fn is_logged_in(&self) -> Result<bool, MobileError> {
        Ok(self.client.session().is_logged_in().await?)
    }

    /// Cached profile when present, otherwise fetched from the backend.
    pub async fn current_user(&self) -> Result<MobileUser, MobileError> {
        if let Some(user) = self.client.session().user().await? {
            return Ok(user.into());
        }
        Ok(api::auth::current_user(&self.client).await?.into())
    }

    pub async fn doctor_appointments(&self) -> Result<Vec<MobileAppointment>, MobileError> {
        let appointments = api::appointments::doctor_appointments(&self.client).await?;
        Ok(appointments.into_iter().map(Into::into).collect())
    }

    pub async fn my_clinics(&self) -> Result<Vec<MobileClinic>, MobileError> {
        let clinics = api::clinics::my_clinics(&self.client).await?;
        Ok(clinics.into_iter().map(Into::into).collect())
    }

    pub async fn my_services(&self) -> Result<Vec<MobileService>, MobileError> {
        let services = api::services::my_services(&self.client).await?;
        Ok(services.into_iter().map(Into::into).collect())
    }
}
