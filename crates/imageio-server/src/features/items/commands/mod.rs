pub mod delete;

pub use delete::{DeleteItemCommand, DeleteItemError, DeleteItemResponse};
