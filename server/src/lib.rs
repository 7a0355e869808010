pub mod aggregate;
pub mod ai;
pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod form;
pub mod notify;
pub mod routes;
pub mod submission;
pub mod watch;
