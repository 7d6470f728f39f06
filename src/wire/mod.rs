//! Master-side I2C ("two wire") driven by toggling two GPIO pins.
//!
//! Both lines are open-drain: a participant can only pull a line LOW, the
//! HIGH level comes from an external pull-up. We "release" a line by
//! switching its pin to INPUT and "assert" it by switching to OUTPUT with
//! the output latch at LOW; a pin is never driven HIGH.
//!
//! Framing:
//! - START: DATA falls while CLOCK is released
//! - 8 data bits, MSB first; DATA only changes while CLOCK is low, the
//!   receiver samples while CLOCK is released
//! - 9th clock: receiver pulls DATA low to ACK, leaves it high to NACK
//! - STOP: DATA rises while CLOCK is released
//!
//! The first byte after START is the 7-bit address shifted left by one,
//! with the low bit set for reads.
//!
//! All operations block for the full electrical duration; there is no
//! buffering, no interrupt use and no timeout (a device holding a line low
//! hangs the caller).

mod config;
mod engine;
mod hal;
mod hardware;
mod interface;
mod lines;

pub use self::config::{
	BusConfig,
	ClockTiming,
	FixedConfig,
	WireConfig,
};

pub use self::engine::SimpleWire;

pub use self::hal::{
	HalBus,
	HalError,
};

pub use self::hardware::{
	Direction,
	PinId,
	Platform,
	reliable_sleep,
};

pub use self::interface::{
	Ack,
	Address,
	TransmissionStatus,
	WireInterface,
	parse_byte,
};

pub use self::lines::LineDriver;
