pub mod cipher;
pub mod set;
pub mod store;
