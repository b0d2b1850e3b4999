//! Attempt counter port and the rate limiter service bound to one policy.
//!
//! Each [`RateLimitService`] owns a single [`folio_domain::RateLimitPolicy`];
//! general and login limiters therefore never share a key namespace.

mod ports;
mod service;


pub use ports::AttemptStore;
pub use service::RateLimitService;
