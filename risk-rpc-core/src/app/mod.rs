mod app;
mod registration;

pub use app::{App, AppBuilder, AppConfig};
pub use registration::{register_with_retry, RegistrationController, RegistrationRequest, RegistrationState};
