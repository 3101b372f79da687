// handlers/mod.rs - Route handlers grouped by resource
//
// system       GET /, GET /health, 404 fallback
// collections  generic CRUD per registered collection name
// users        /users, /users/login
// roles        /roles
// test_data    /test, /data

pub mod collections;
pub mod roles;
pub mod system;
pub mod test_data;
pub mod users;
