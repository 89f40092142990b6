//! HTTP API handlers for gearpoll-srv

pub mod health;
pub mod images;
pub mod session;
pub mod ui;

pub use health::health_routes;
pub use images::serve_image;
pub use session::{create_session, current_pair, session_progress, submit_answer};
pub use ui::{serve_app_js, serve_index};
