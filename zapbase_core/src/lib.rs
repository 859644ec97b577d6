pub mod ai;
pub mod conversation;
pub mod error;
pub mod helpers;
pub mod transfer;
