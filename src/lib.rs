//! Single-node streaming map-reduce over shell-command mappers and
//! reducers, with an in-memory GPFS store and HTTP control surface.

pub mod adapter;
pub mod cli;
pub mod client;
pub mod controller;
pub mod error;
pub mod gpfs;
pub mod http_server;
pub mod intake;
pub mod keys;
pub mod mapper;
pub mod parameters;
pub mod partition;
pub mod reducer;
pub mod shuffle;
