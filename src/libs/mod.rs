pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod ident;
pub mod json;
pub mod query_builder;
pub mod rows;
pub mod schema;
pub mod session;
pub mod store;

// Re-export them for easier access from main.rs
pub use auth::*;
pub use config::*;
pub use error::*;
pub use http::*;
pub use ident::*;
pub use json::*;
pub use query_builder::*;
pub use rows::*;
pub use schema::*;
pub use session::*;
pub use store::*;
