pub mod control;
pub mod hub;
