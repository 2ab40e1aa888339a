//! CrudService: generic CRUD over a repository; RequestValidator: body checks.

mod crud;
mod validation;
pub use crud::{CrudService, MAX_PAGE_SIZE};
pub use validation::{BodyMode, RequestValidator};
