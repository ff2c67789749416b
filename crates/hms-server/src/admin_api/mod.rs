//! Request dispatch for the mock server.
//!
//! Three reserved paths control the server:
//! - `/__expect`: register an expectation (POST, JSON body)
//! - `/__check`: verify every expectation, then reset the registry
//! - `/__shutdown`: stop the server
//!
//! Every other path is matched against the registered expectations.

mod handlers;
mod router;
pub mod types;

pub use router::Dispatcher;
