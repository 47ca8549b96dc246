//! Remote tabular-data server access
//!
//! This module handles:
//! - The Data API abstraction and its FileMaker HTTPS implementation
//! - Session token lifecycle (login, reuse, age-based logout)

mod fms;
mod session;
pub mod traits;

pub use fms::FmsClient;
pub use session::{RemoteSession, SessionStatus};
pub use traits::DataApi;
