//! HTTP API and web UI for AutoDev Team.
//!
//! ## Endpoints
//!
//! - `GET /` - Single-page UI
//! - `GET /api/health` - Health check
//! - `POST /api/task` - Submit a new task (one at a time)
//! - `GET /api/task/{id}` - Task record with step outputs
//! - `GET /api/tasks` - All submitted tasks
//! - `GET /api/session` - Chat log, generated files and run status
//! - `GET /api/stream` - Chat and status updates via SSE
//! - `GET /api/files` - Generated files with content
//! - `GET /api/files/{name}` - Download a generated file

mod routes;
pub mod session;
pub mod types;

pub use routes::{create_app, serve, AppState};
pub use types::*;
