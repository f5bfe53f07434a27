//! Application records: form validation, dashboard view and HTTP handlers.
//! Persistence goes through `store::ApplicationStore` only.

pub mod dashboard;
pub mod handlers;
pub mod validation;
