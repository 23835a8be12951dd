pub mod fighter;
pub mod raid_config;

pub use fighter::*;
pub use raid_config::*;
