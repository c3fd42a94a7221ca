pub mod browser;
pub mod channel;
pub mod cli;
pub mod error;
pub mod geometry;
pub mod http;
pub mod netinfo;
pub mod packet;
pub mod simulator;
pub mod state;
