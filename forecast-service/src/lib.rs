//! Weather forecast and address suggestion lookups.
//!
//! Both lookups go through a pluggable provider, a structural check on the
//! provider's answer and a time-windowed cache keyed on rounded input.

pub mod cache;
pub mod clock;
pub mod config;
pub mod coordinates;
pub mod handlers;
pub mod openapi;
pub mod providers;
pub mod services;
pub mod validator;
