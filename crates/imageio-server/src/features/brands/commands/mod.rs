pub mod create;
pub mod delete;

pub use create::{CreateBrandCommand, CreateBrandError};
pub use delete::{DeleteBrandCommand, DeleteBrandError, DeleteBrandResponse};
