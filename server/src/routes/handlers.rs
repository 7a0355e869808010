use std::time::{Duration, Instant};

use log::debug;
use time::OffsetDateTime;
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::aggregate;
use crate::ai::SummaryEntry;
use crate::db::Visibility;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::notify::spawn_confirmation;
use crate::routes::{
    query::{DailyQuery, FeaturedRequest, ListQuery},
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::submission::{NewSubmission, Submission};

const SERVER_TIMING_HEADER: &str = "server-timing";
const SUPPORTED_WINDOWS: &[u16] = &[7, 14, 30];
const DEFAULT_WINDOW: u16 = 30;

type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn create(environment: Environment, submission: NewSubmission) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create(), e);

        submission.validate().map_err(error_handler)?;

        debug!(environment.logger, "Creating submission...");
        let email = Some(submission.email.clone());
        let created = environment
            .db
            .insert(submission)
            .await
            .map_err(error_handler)?;

        // the record is durable at this point; email delivery must not
        // affect the response
        spawn_confirmation(
            environment.logger.clone(),
            environment.mailer.clone(),
            email,
        );

        with_status(
            json(&SuccessResponse::Created {
                id: created.id,
                submitted_at: created.submitted_at,
            }),
            StatusCode::CREATED,
        )
    }
}

pub async fn count(environment: Environment) -> RouteResult {
    timed! {
        let count = environment
            .db
            .count(Visibility::All)
            .await
            .map_err(|e: BackendError| Rejection::new(Context::count(), e))?;

        json(&SuccessResponse::Count(count))
    }
}

pub async fn list(
    environment: Environment,
    authorization: Option<String>,
    query: ListQuery,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::list(), e);

        authorize(&environment, authorization).map_err(error_handler)?;

        let visibility = query.visibility.unwrap_or(Visibility::All);
        let submissions = environment
            .db
            .retrieve_all(visibility)
            .await
            .map_err(error_handler)?;

        json(&submissions)
    }
}

pub async fn daily(
    environment: Environment,
    authorization: Option<String>,
    query: DailyQuery,
) -> RouteResult {
    timed! {
        let days = query.days.unwrap_or(DEFAULT_WINDOW);
        let error_handler = |e: BackendError| Rejection::new(Context::daily(days), e);

        authorize(&environment, authorization).map_err(error_handler)?;

        validate_window(days).map_err(error_handler)?;

        let submissions = environment
            .db
            .retrieve_all(Visibility::All)
            .await
            .map_err(error_handler)?;

        let today = OffsetDateTime::now_utc().date();

        json(&aggregate::daily_counts(&submissions, days, today))
    }
}

pub async fn stats(
    environment: Environment,
    dimension: String,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::stats(dimension.clone()), e);

        authorize(&environment, authorization).map_err(error_handler)?;

        let submissions = environment
            .db
            .retrieve_all(Visibility::All)
            .await
            .map_err(error_handler)?;

        aggregate_dimension(&dimension, &submissions).map_err(error_handler)?
    }
}

pub async fn testimonials(environment: Environment, authorization: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::testimonials(), e);

        authorize(&environment, authorization).map_err(error_handler)?;

        let submissions = environment
            .db
            .retrieve_all(Visibility::Public)
            .await
            .map_err(error_handler)?;

        json(&aggregate::testimonials(&submissions))
    }
}

pub async fn featured(
    environment: Environment,
    id: String,
    authorization: Option<String>,
    request: FeaturedRequest,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::featured(id.clone()), e);

        authorize(&environment, authorization).map_err(error_handler)?;

        let id = Uuid::parse_str(&id)
            .map_err(|_| BackendError::InvalidId(id.clone()))
            .map_err(error_handler)?;
        debug!(environment.logger, "Updating featured flag..."; "id" => format!("{}", &id), "is_featured" => request.is_featured);

        let updated = environment
            .db
            .set_featured(&id, request.is_featured)
            .await
            .map_err(error_handler)?;

        json(&updated)
    }
}

pub async fn highlight(
    environment: Environment,
    id: String,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::highlight(id.clone()), e);

        authorize(&environment, authorization).map_err(error_handler)?;

        let id = Uuid::parse_str(&id)
            .map_err(|_| BackendError::InvalidId(id.clone()))
            .map_err(error_handler)?;
        debug!(environment.logger, "Highlighting reflection..."; "id" => format!("{}", &id));

        let submission = environment
            .db
            .retrieve(&id)
            .await
            .map_err(error_handler)?
            .ok_or(BackendError::NonExistentId(id))
            .map_err(error_handler)?;

        // nothing is written unless the model call succeeded
        let highlighted = environment
            .ai
            .highlight(&submission.question1)
            .await
            .map_err(error_handler)?;

        let updated = environment
            .db
            .set_highlighted(&id, highlighted)
            .await
            .map_err(error_handler)?;

        json(&updated)
    }
}

pub async fn summary(environment: Environment, authorization: Option<String>) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::summary(), e);

        authorize(&environment, authorization).map_err(error_handler)?;

        debug!(environment.logger, "Summarizing public submissions...");
        let submissions = environment
            .db
            .retrieve_all(Visibility::Public)
            .await
            .map_err(error_handler)?;

        let entries = submissions.iter().map(SummaryEntry::from_submission).collect();

        let executive_summary = environment
            .ai
            .executive_summary(entries)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Summary { executive_summary })
    }
}

fn authorize(environment: &Environment, header: Option<String>) -> Result<(), BackendError> {
    let expected = format!("Bearer {}", environment.config.dashboard_token);

    match header {
        Some(presented) if presented == expected => Ok(()),
        _ => Err(BackendError::Unauthorized),
    }
}

fn validate_window(days: u16) -> Result<(), BackendError> {
    if SUPPORTED_WINDOWS.contains(&days) {
        Ok(())
    } else {
        Err(BackendError::UnsupportedWindow(days))
    }
}

fn aggregate_dimension(
    dimension: &str,
    submissions: &[Submission],
) -> Result<warp::reply::Json, BackendError> {
    match dimension {
        "ages" => Ok(json(&aggregate::age_group_counts(submissions))),
        "districts" => Ok(json(&aggregate::district_counts(submissions))),
        "obstacles" => Ok(json(&aggregate::obstacle_counts(submissions))),
        "occupations" => Ok(json(&aggregate::occupation_counts(submissions))),
        "sectors" => Ok(json(&aggregate::sector_counts(submissions))),
        "summary" => Ok(json(&aggregate::overview(submissions))),
        "values" => Ok(json(&aggregate::value_counts(submissions))),
        _ => Err(BackendError::UnknownDimension(dimension.to_owned())),
    }
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
