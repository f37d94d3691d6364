//! # Millrace Web
//!
//! Streams a pipeline result to an HTTP client.
//!
//! The delivery rules: the first chunk is awaited before a status is
//! committed; a result with zero bytes total is `204 No Content`; a read
//! error before any bytes were sent is `404 Not Found` when the underlying
//! cause is a missing file and `500` otherwise; a read error after bytes
//! were sent ends the body silently, since a response already in progress
//! cannot change its status. The content type comes from the result's cache path
//! extension, defaulting to `application/octet-stream`.

mod deliver;

pub use deliver::{deliver, invoke_and_deliver, respond};
