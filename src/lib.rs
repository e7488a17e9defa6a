pub mod app;
pub mod backend;
pub mod config;
pub mod day;
pub mod errors;
pub mod feedback;
pub mod handlers;
pub mod history;
pub mod leaderboard;
pub mod ledger;
pub mod mirror;
pub mod models;
pub mod progression;
pub mod registry;
pub mod session;
pub mod state;
pub mod storage;
pub mod tracker;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use day::DayKey;
pub use errors::{AppError, QuestError};
pub use state::AppState;
pub use tracker::Tracker;
