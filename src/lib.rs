pub mod app;
pub mod client;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod model;
pub mod output;
pub mod transport;
