pub mod handler;
pub mod intent;
pub mod storage;
