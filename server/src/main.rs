use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;
use log::{info, initialize_logger, warn};
use tokio::sync::mpsc;

use backend::ai::AiClient;
use backend::config::{get_optional_variable, get_variable};
use backend::db::PgDb;
use backend::environment::{Config, Environment, SafeDb, SafeMailer, SafeTextModel};
use backend::notify::SmtpMailer;
use backend::routes;
use backend::watch::run_watch;

const DEFAULT_WATCH_INTERVAL_SECONDS: u64 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("BACKEND_PORT")
        .parse()
        .expect("parse BACKEND_PORT as u16");
    let admin_port: u16 = get_variable("BACKEND_ADMIN_PORT")
        .parse()
        .expect("parse BACKEND_ADMIN_PORT as u16");

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("BACKEND_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from BACKEND_DB_CONNECTION_STRING");
    let db: Arc<SafeDb> = Arc::new(PgDb::new(pool));

    let ai: Arc<SafeTextModel> = Arc::new(AiClient::from_env());

    let mailer: Option<Arc<SafeMailer>> = match SmtpMailer::from_env() {
        Some(mailer) => Some(Arc::new(mailer)),
        None => {
            warn!(
                logger,
                "SMTP configuration is incomplete; confirmation emails are disabled"
            );
            None
        }
    };

    let config = Config::new(get_variable("BACKEND_DASHBOARD_TOKEN"));
    let environment = Environment::new(logger.clone(), db.clone(), ai, mailer, config);

    let watch_interval = Duration::from_secs(
        get_optional_variable("BACKEND_WATCH_INTERVAL_SECONDS")
            .map(|seconds| {
                seconds
                    .parse()
                    .expect("parse BACKEND_WATCH_INTERVAL_SECONDS as u64")
            })
            .unwrap_or(DEFAULT_WATCH_INTERVAL_SECONDS),
    );

    let (refresh_sender, mut refresh_receiver) = mpsc::channel(8);
    tokio::spawn(run_watch(
        logger.clone(),
        db,
        watch_interval,
        refresh_sender,
    ));

    {
        let logger = logger.clone();

        tokio::spawn(async move {
            while refresh_receiver.recv().await.is_some() {
                info!(logger, "New submission observed");
            }
        });
    }

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            let termination_sender = termination_sender.clone();
            termination_sender.send(()).await.unwrap();
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            let terminate = terminate.clone();

            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let logger2 = logger.clone();

        let create_route = routes::make_create_route(environment.clone());
        let count_route = routes::make_count_route(environment.clone());
        let daily_route = routes::make_daily_route(environment.clone());
        let stats_route = routes::make_stats_route(environment.clone());
        let list_route = routes::make_list_route(environment.clone());
        let testimonials_route = routes::make_testimonials_route(environment.clone());
        let featured_route = routes::make_featured_route(environment.clone());
        let highlight_route = routes::make_highlight_route(environment.clone());
        let summary_route = routes::make_summary_route(environment.clone());

        use warp::Filter;

        let routes = create_route
            .or(count_route)
            .or(daily_route)
            .or(stats_route)
            .or(list_route)
            .or(testimonials_route)
            .or(featured_route)
            .or(highlight_route)
            .or(summary_route)
            .recover(move |r| routes::format_rejection(logger2.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        use warp::Filter;

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
