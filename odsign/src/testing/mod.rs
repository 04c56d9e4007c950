mod adb;
pub use adb::*;

mod apex;
pub use apex::*;

mod context;
pub use context::*;
