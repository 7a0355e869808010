use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

// variants are empty structs rather than units so the flattened
// serialization is always a map
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Count {},
    Create {},
    Daily { days: u16 },
    Featured { id: String },
    Highlight { id: String },
    List {},
    Stats { dimension: String },
    Summary {},
    Testimonials {},
}

impl Context {
    pub fn count() -> Context {
        Context::Count {}
    }

    pub fn create() -> Context {
        Context::Create {}
    }

    pub fn daily(days: u16) -> Context {
        Context::Daily { days }
    }

    pub fn featured(id: String) -> Context {
        Context::Featured { id }
    }

    pub fn highlight(id: String) -> Context {
        Context::Highlight { id }
    }

    pub fn list() -> Context {
        Context::List {}
    }

    pub fn stats(dimension: String) -> Context {
        Context::Stats { dimension }
    }

    pub fn summary() -> Context {
        Context::Summary {}
    }

    pub fn testimonials() -> Context {
        Context::Testimonials {}
    }
}
