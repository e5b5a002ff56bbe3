pub mod get;
pub mod list;

pub use get::{GetBrandError, GetBrandQuery, GetBrandResponse};
pub use list::{ListBrandsError, ListBrandsQuery};
