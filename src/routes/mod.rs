pub mod attendance;
pub mod auth;
pub mod employee;
pub mod geo;
pub mod network;
pub mod region;
