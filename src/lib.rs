pub mod action;
pub mod coordinator;
pub mod device;
pub mod session;
pub mod worker;
