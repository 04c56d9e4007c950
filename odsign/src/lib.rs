pub mod context;
pub use context::{Context, DefaultContext};

pub mod config;
pub use config::Settings;

pub mod errors;
pub use errors::{Error, Result};

pub mod adb;

pub mod command;
pub use command::run_cmd;

pub mod device;
pub use device::Device;

pub mod apex;
pub use apex::ApexInfo;

pub mod maps;

pub mod properties;
pub use properties::TestProperties;

pub mod odsign;
pub use odsign::OdsignTestUtils;

pub mod utils;

pub const DEVICE_PATH_SEP_CHAR: char = '/';

#[cfg(test)]
pub mod testing;
