//! Vapi Lead Sheets Library
//!
//! Receives call-completion webhooks from a Vapi voice assistant, extracts
//! the caller's lead details and appends them as a row to a Google Sheet.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `dedupe`: Process-local call de-duplication.
//! - `errors`: Error handling types.
//! - `extraction`: Lead extraction from webhook payloads.
//! - `handlers`: HTTP routes and request handlers.
//! - `rows`: Spreadsheet row building.
//! - `sheets_client`: Google Sheets API client.
//! - `webhook_models`: Lead record and webhook acknowledgement models.

pub mod config;
pub mod dedupe;
pub mod errors;
pub mod extraction;
pub mod handlers;
pub mod rows;
pub mod sheets_client;
pub mod webhook_models;
