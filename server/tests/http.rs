use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use backend::ai::{SummaryEntry, TextModel};
use backend::db::{memory::MemoryDb, Db, Visibility};
use backend::environment::{Config, Environment};
use backend::errors::BackendError;
use backend::notify::Mailer;
use backend::routes;
use backend::submission::NewSubmission;

const DASHBOARD_TOKEN: &str = "letmein";

static BASE_SUBMISSION: Lazy<Value> = Lazy::new(|| {
    json!({
        "email": "someone@example.com",
        "age": 24,
        "district": "Tutong",
        "occupation_status": "Student",
        "sector_interest": "STEM",
        "values": ["Growth", "Peace"],
        "obstacles": ["I'm afraid of failing"],
        "question1": "Start a community garden.",
        "is_private": false
    })
});

/// A text model that wraps its input instead of calling out.
struct FakeModel;

impl TextModel for FakeModel {
    fn highlight(&self, question1: &str) -> BoxFuture<Result<String, BackendError>> {
        let highlighted = format!("**{}**", question1);

        async move { Ok(highlighted) }.boxed()
    }

    fn executive_summary(
        &self,
        entries: Vec<SummaryEntry>,
    ) -> BoxFuture<Result<String, BackendError>> {
        async move { Ok(format!("A summary of {} entries.", entries.len())) }.boxed()
    }
}

/// A mailer that records recipients instead of delivering.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<String>>,
}

impl Mailer for RecordingMailer {
    fn send_confirmation(&self, to: String) -> BoxFuture<Result<(), BackendError>> {
        self.sent.lock().unwrap().push(to);

        async { Ok(()) }.boxed()
    }
}

struct Fixture {
    environment: Environment,
    db: Arc<MemoryDb>,
    mailer: Arc<RecordingMailer>,
}

fn fixture() -> Fixture {
    let logger = Arc::new(log::initialize_logger());
    let db = Arc::new(MemoryDb::new());
    let mailer = Arc::new(RecordingMailer::default());

    let environment = Environment::new(
        logger,
        db.clone(),
        Arc::new(FakeModel),
        Some(mailer.clone()),
        Config::new(DASHBOARD_TOKEN.to_owned()),
    );

    Fixture {
        environment,
        db,
        mailer,
    }
}

fn all_routes(
    environment: &Environment,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let logger = environment.logger.clone();

    routes::make_create_route(environment.clone())
        .or(routes::make_count_route(environment.clone()))
        .or(routes::make_daily_route(environment.clone()))
        .or(routes::make_stats_route(environment.clone()))
        .or(routes::make_list_route(environment.clone()))
        .or(routes::make_testimonials_route(environment.clone()))
        .or(routes::make_featured_route(environment.clone()))
        .or(routes::make_highlight_route(environment.clone()))
        .or(routes::make_summary_route(environment.clone()))
        .recover(move |r| routes::format_rejection(logger.clone(), r))
}

fn new_submission(is_private: bool) -> NewSubmission {
    NewSubmission {
        email: "someone@example.com".into(),
        age: 24,
        district: "Tutong".into(),
        occupation_status: "Student".into(),
        other_occupation: None,
        sector_interest: "STEM".into(),
        other_sector: None,
        values: vec!["Growth".into()],
        other_value: None,
        obstacles: vec!["I'm afraid of failing".into()],
        other_obstacle: None,
        question1: "Start a community garden.".into(),
        is_private,
    }
}

fn bearer() -> String {
    format!("Bearer {}", DASHBOARD_TOKEN)
}

fn parse(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("parse response body as JSON")
}

#[tokio::test]
async fn creating_a_submission_stores_it_and_sends_a_confirmation() {
    let f = fixture();
    let filter = all_routes(&f.environment);

    let response = warp::test::request()
        .method("POST")
        .path("/api/submissions")
        .json(&*BASE_SUBMISSION)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = parse(response.body());
    assert!(body["id"].is_string());
    assert!(body["submitted_at"].is_number());

    assert_eq!(f.db.count(Visibility::All).await.unwrap(), 1);

    // the confirmation is spawned off the request path
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        *f.mailer.sent.lock().unwrap(),
        vec!["someone@example.com".to_owned()]
    );
}

#[tokio::test]
async fn malformed_submissions_are_rejected_before_any_write() {
    let f = fixture();
    let filter = all_routes(&f.environment);

    let mut body = BASE_SUBMISSION.clone();
    body["values"] = json!([]);

    let response = warp::test::request()
        .method("POST")
        .path("/api/submissions")
        .json(&body)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(f.db.count(Visibility::All).await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(f.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn the_count_is_public() {
    let f = fixture();
    f.db.insert(new_submission(false)).await.unwrap();
    f.db.insert(new_submission(true)).await.unwrap();

    let filter = all_routes(&f.environment);

    let response = warp::test::request()
        .method("GET")
        .path("/api/submissions/count")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse(response.body()), json!(2));
}

#[tokio::test]
async fn dashboard_routes_require_the_token() {
    let f = fixture();
    let filter = all_routes(&f.environment);

    let missing = warp::test::request()
        .method("GET")
        .path("/api/stats/values")
        .reply(&filter)
        .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = warp::test::request()
        .method("GET")
        .path("/api/stats/values")
        .header("authorization", "Bearer nope")
        .reply(&filter)
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let right = warp::test::request()
        .method("GET")
        .path("/api/stats/values")
        .header("authorization", bearer())
        .reply(&filter)
        .await;
    assert_eq!(right.status(), StatusCode::OK);
}

#[tokio::test]
async fn listing_filters_by_visibility_and_never_exposes_emails() {
    let f = fixture();
    f.db.insert(new_submission(false)).await.unwrap();
    f.db.insert(new_submission(true)).await.unwrap();

    let filter = all_routes(&f.environment);

    let private_only = warp::test::request()
        .method("GET")
        .path("/api/submissions?visibility=private")
        .header("authorization", bearer())
        .reply(&filter)
        .await;

    assert_eq!(private_only.status(), StatusCode::OK);
    let listed = parse(private_only.body());
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["is_private"], json!(true));
    assert!(listed[0].get("email").is_none());

    let everything = warp::test::request()
        .method("GET")
        .path("/api/submissions")
        .header("authorization", bearer())
        .reply(&filter)
        .await;

    assert_eq!(parse(everything.body()).as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn daily_counts_cover_the_requested_window() {
    let f = fixture();
    f.db.insert(new_submission(false)).await.unwrap();

    let filter = all_routes(&f.environment);

    let response = warp::test::request()
        .method("GET")
        .path("/api/stats/daily?days=7")
        .header("authorization", bearer())
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let counts = parse(response.body());
    assert_eq!(counts.as_array().unwrap().len(), 7);

    // today is the last entry and holds the fresh submission
    assert_eq!(counts[6]["public"], json!(1));

    let unsupported = warp::test::request()
        .method("GET")
        .path("/api/stats/daily?days=9")
        .header("authorization", bearer())
        .reply(&filter)
        .await;
    assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_dimensions_are_rejected() {
    let f = fixture();
    let filter = all_routes(&f.environment);

    let response = warp::test::request()
        .method("GET")
        .path("/api/stats/handedness")
        .header("authorization", bearer())
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn toggling_featured_stamps_the_change_time() {
    let f = fixture();
    let created = f.db.insert(new_submission(false)).await.unwrap();

    let filter = all_routes(&f.environment);

    let marked = warp::test::request()
        .method("POST")
        .path(&format!("/api/submissions/{}/featured", created.id))
        .header("authorization", bearer())
        .json(&json!({ "is_featured": true }))
        .reply(&filter)
        .await;

    assert_eq!(marked.status(), StatusCode::OK);
    let first = parse(marked.body());
    assert_eq!(first["is_featured"], json!(true));
    let first_stamp = first["featured_updated_at"].as_i64().expect("first stamp");

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let unmarked = warp::test::request()
        .method("POST")
        .path(&format!("/api/submissions/{}/featured", created.id))
        .header("authorization", bearer())
        .json(&json!({ "is_featured": false }))
        .reply(&filter)
        .await;

    let second = parse(unmarked.body());
    assert_eq!(second["is_featured"], json!(false));
    assert!(second["featured_updated_at"].as_i64().expect("second stamp") > first_stamp);
}

#[tokio::test]
async fn featuring_an_unknown_submission_is_not_found() {
    let f = fixture();
    let filter = all_routes(&f.environment);

    let response = warp::test::request()
        .method("POST")
        .path("/api/submissions/00000000-0000-0000-0000-000000000000/featured")
        .header("authorization", bearer())
        .json(&json!({ "is_featured": true }))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn highlighting_persists_the_model_output() {
    let f = fixture();
    let created = f.db.insert(new_submission(false)).await.unwrap();

    let filter = all_routes(&f.environment);

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/submissions/{}/highlight", created.id))
        .header("authorization", bearer())
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        parse(response.body())["question1_highlighted"],
        json!("**Start a community garden.**")
    );

    let stored = f.db.retrieve(&created.id).await.unwrap().unwrap();
    assert_eq!(
        stored.question1_highlighted.as_deref(),
        Some("**Start a community garden.**")
    );
    assert!(stored.question1_highlighted_updated_at.is_some());
}

#[tokio::test]
async fn the_executive_summary_covers_only_public_submissions() {
    let f = fixture();
    f.db.insert(new_submission(false)).await.unwrap();
    f.db.insert(new_submission(false)).await.unwrap();
    f.db.insert(new_submission(true)).await.unwrap();

    let filter = all_routes(&f.environment);

    let response = warp::test::request()
        .method("POST")
        .path("/api/summary")
        .header("authorization", bearer())
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        parse(response.body())["executive_summary"],
        json!("A summary of 2 entries.")
    );
}

#[tokio::test]
async fn testimonials_show_featured_public_reflections() {
    let f = fixture();
    let featured = f.db.insert(new_submission(false)).await.unwrap();
    f.db.insert(new_submission(false)).await.unwrap();
    f.db.set_featured(&featured.id, true).await.unwrap();

    let filter = all_routes(&f.environment);

    let response = warp::test::request()
        .method("GET")
        .path("/api/testimonials")
        .header("authorization", bearer())
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let testimonials = parse(response.body());
    assert_eq!(testimonials.as_array().unwrap().len(), 1);
    assert_eq!(
        testimonials[0]["quote"],
        json!("Start a community garden.")
    );
    assert_eq!(testimonials[0]["occupation"], json!("Student"));
}
