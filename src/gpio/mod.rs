//! GPIO backends implementing `wire::Platform`.
//!
//! OS-specific; for now Linux sysfs only.

mod sysfs;

pub use self::sysfs::{
	SysfsGpio,
	open_sysfs,
};
