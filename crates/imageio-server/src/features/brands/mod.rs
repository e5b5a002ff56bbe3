pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    CreateBrandCommand, CreateBrandError, DeleteBrandCommand, DeleteBrandError,
    DeleteBrandResponse,
};

pub use queries::{GetBrandError, GetBrandQuery, GetBrandResponse, ListBrandsError, ListBrandsQuery};

pub use routes::brands_routes;
