//! Archive and link-spreadsheet downloads

pub mod routes;

pub use routes::exports_routes;
