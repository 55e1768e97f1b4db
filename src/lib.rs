//! User registration service: `POST /api/auth/register`.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod state;

pub use app::build_app;
pub use state::AppState;
