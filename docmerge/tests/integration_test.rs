#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/scenarios.rs"]
mod scenarios;

#[path = "integration/formats.rs"]
mod formats;

#[path = "integration/session.rs"]
mod session;

#[path = "integration/error_cases.rs"]
mod error_cases;
