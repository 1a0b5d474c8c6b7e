pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod cors;
pub mod identity;
pub mod state;
