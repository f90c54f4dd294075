pub mod broker;
pub mod coordinator;
pub mod direct;
pub mod region;
pub mod token;
