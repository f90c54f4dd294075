pub mod common;

mod renewal_flow;
