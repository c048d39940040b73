//! WSPay hosted-form payment integration for a web shop
//!
//! Signs outbound payment requests, verifies the gateway's return callback
//! and turns a paid cart into an order.

pub mod api;
pub mod commerce;
pub mod config;
pub mod database;
pub mod error;
pub mod payments;
pub mod views;

pub use error::{AppError, AppResult};
