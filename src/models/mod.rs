//! Data Transfer Objects
//!
//! JSON bodies for the auxiliary endpoints and error responses. Cache reads
//! themselves answer in plain text.

pub mod responses;

pub use responses::*;
