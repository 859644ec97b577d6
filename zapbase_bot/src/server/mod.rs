pub mod handler;
pub mod router;
