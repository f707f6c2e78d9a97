pub mod admin_auth;
pub mod request_id;

pub use admin_auth::require_admin;
pub use request_id::request_id_middleware;
