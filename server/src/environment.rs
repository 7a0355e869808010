use std::sync::Arc;

use log::Logger;

use crate::ai::TextModel;
use crate::db::Db;
use crate::notify::Mailer;

pub type SafeDb = dyn Db + Send + Sync;
pub type SafeTextModel = dyn TextModel + Send + Sync;
pub type SafeMailer = dyn Mailer + Send + Sync;

/// The shared collaborators handed to every route handler.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<SafeDb>,
    pub ai: Arc<SafeTextModel>,
    /// Absent when the SMTP configuration is incomplete; submissions are
    /// still accepted, only the confirmation email is skipped.
    pub mailer: Option<Arc<SafeMailer>>,
    pub config: Config,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<SafeDb>,
        ai: Arc<SafeTextModel>,
        mailer: Option<Arc<SafeMailer>>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            db,
            ai,
            mailer,
            config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) dashboard_token: String,
}

impl Config {
    pub fn new(dashboard_token: String) -> Self {
        Self { dashboard_token }
    }
}
