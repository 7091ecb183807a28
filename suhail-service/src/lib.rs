pub mod auth;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod historical;
pub mod llm;
pub mod notifications;
pub mod offer;
pub mod pdf;
pub mod research;
pub mod routes;
pub mod service;
pub mod summary;
pub mod tasks;
pub mod transcript;
pub mod workflow;

pub use config::Config;
pub use service::{AppState, Integrations, build_router, create_app};
pub use workflow::{build_suhail_workflow, create_flow_runner};
