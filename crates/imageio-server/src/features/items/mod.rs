pub mod commands;
pub mod routes;

pub use commands::{DeleteItemCommand, DeleteItemError, DeleteItemResponse};
pub use routes::items_routes;
