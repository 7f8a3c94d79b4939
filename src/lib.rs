pub mod auth;
pub mod backup;
pub mod barangay;
pub mod certificate;
pub mod config;
pub mod db;
pub mod error;
pub mod inbox;
pub mod models;
pub mod requests;
pub mod routes;
pub mod schema;
pub mod state;
pub mod storage;
pub mod utils;
