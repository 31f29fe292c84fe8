pub mod request_id;
pub mod service_scope;

pub use request_id::request_id_middleware;
pub use service_scope::{service_scope_middleware, RequestScope};
