pub mod applications;
pub mod config;
pub mod db;
pub mod errors;
pub mod inspect;
pub mod models;
pub mod repair;
pub mod routes;
pub mod state;
pub mod store;
pub mod supabase;
