//! Paginated feed retrieval from the archive API.
//!
//! [`ApiClient`] walks the creator's post feed page by page, decoding the
//! loose remote schema into validated [`Post`] values at the boundary.
//! Everything downstream (grouping, task preparation, download) operates
//! only on these types.

mod client;
mod error;
mod post;

pub use client::{ApiClient, PAGE_DELAY, PAGE_SIZE};
pub use error::FetchError;
pub use post::{MediaRef, Post};
