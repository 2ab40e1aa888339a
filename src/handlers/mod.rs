//! Resource controllers shipped with the crate.

pub mod crud;
pub use crud::{CrudController, DEFAULT_PAGE_SIZE};
