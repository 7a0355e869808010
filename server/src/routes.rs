use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

/// The maximum request body size to accept. Submissions are small; this
/// is only a backstop against runaway bodies.
const MAX_CONTENT_LENGTH: u64 = 2 * 1024 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        BadRequest
        | InvalidId { .. }
        | MalformedSubmission { .. }
        | UnknownDimension { .. }
        | UnsupportedWindow { .. } => StatusCode::BAD_REQUEST,
        Unauthorized => StatusCode::UNAUTHORIZED,
        NonExistentId { .. } => StatusCode::NOT_FOUND,
        AiRequest { .. } | AiResponse { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::body;
    use warp::filters::header;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{get as g, path as p, path::param as par, post, query};

    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p("api"));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_create_route => create, rt; p("submissions"), end(), post(), body::content_length_limit(MAX_CONTENT_LENGTH), body::json());
    route!(make_count_route => count, rt; p("submissions"), p("count"), end(), g());
    route!(make_list_route => list, rt; p("submissions"), end(), g(), header::optional::<String>("authorization"), query::<q::ListQuery>());
    route!(make_daily_route => daily, rt; p("stats"), p("daily"), end(), g(), header::optional::<String>("authorization"), query::<q::DailyQuery>());
    route!(make_stats_route => stats, rt; p("stats"), par::<String>(), end(), g(), header::optional::<String>("authorization"));
    route!(make_testimonials_route => testimonials, rt; p("testimonials"), end(), g(), header::optional::<String>("authorization"));
    route!(make_featured_route => featured, rt; p("submissions"), par::<String>(), p("featured"), end(), post(), header::optional::<String>("authorization"), body::content_length_limit(MAX_CONTENT_LENGTH), body::json());
    route!(make_highlight_route => highlight, rt; p("submissions"), par::<String>(), p("highlight"), end(), post(), header::optional::<String>("authorization"));
    route!(make_summary_route => summary, rt; p("summary"), end(), post(), header::optional::<String>("authorization"));
}
