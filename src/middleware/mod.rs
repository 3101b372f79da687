pub mod access;
pub mod response;

pub use access::collection_access;
pub use response::{ApiResponse, ApiResult};
