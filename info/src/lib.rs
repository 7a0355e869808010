//! Build metadata baked in at compile time.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const REVISION: Option<&str> = option_env!("BACKEND_REVISION");

pub const BUILD_TIMESTAMP: Option<&str> = option_env!("BUILD_TIMESTAMP");

/// The user agent presented on outbound HTTP requests.
pub fn user_agent() -> String {
    format!("siaga-capsule-backend/{}", VERSION)
}
