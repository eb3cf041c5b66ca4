pub mod admin;
pub mod auth;
pub mod cases;
pub mod cli;
pub mod client;
pub mod core;
pub mod patients;
