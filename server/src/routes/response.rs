use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Count(i64),
    Created {
        id: Uuid,
        #[serde(with = "time::serde::timestamp::option")]
        submitted_at: Option<OffsetDateTime>,
    },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Summary {
        executive_summary: String,
    },
}
