//! Token results returned by identity clients and the secrets they carry.

pub mod credential;
pub mod result;
pub mod secret;
