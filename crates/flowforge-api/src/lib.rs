mod client;
mod files;
mod types;

pub use client::*;
pub use files::*;
pub use types::*;
