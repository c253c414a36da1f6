//! A loopback-only editor for arbitrary SQL tables.
//!
//! Tables are discovered from the live catalog, rows are listed, fetched,
//! inserted, updated and deleted by primary key, and every identifier passes
//! through [`Ident`] before it is written into SQL. Access needs a bearer token
//! minted by a root-password login.

pub mod libs;

pub use libs::*;
