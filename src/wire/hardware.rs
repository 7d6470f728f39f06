use std::thread;
use std::time::{
	Duration,
	Instant,
};

/// Logical GPIO identifier, interpreted by the `Platform`.
pub type PinId = u16;

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Direction {
	/// high impedance; an open-drain line floats HIGH through its pull-up
	Input,
	Output,
}

/// The GPIO capability the bus is built on.
///
/// These four primitives are all the engine ever uses; in particular there
/// is no way to drive a pin HIGH.
pub trait Platform {
	fn set_direction(&mut self, pin: PinId, direction: Direction);

	/// current level of the pin (true = HIGH)
	fn read_digital(&mut self, pin: PinId) -> bool;

	/// switch pin to OUTPUT with level LOW
	///
	/// must not pass through an OUTPUT+HIGH state on the way.
	fn drive_low(&mut self, pin: PinId);

	fn delay_micros(&mut self, micros: u32) {
		reliable_sleep(Duration::from_micros(micros.into()));
	}
}

impl<'a, P: Platform + ?Sized> Platform for &'a mut P {
	fn set_direction(&mut self, pin: PinId, direction: Direction) {
		(**self).set_direction(pin, direction)
	}

	fn read_digital(&mut self, pin: PinId) -> bool {
		(**self).read_digital(pin)
	}

	fn drive_low(&mut self, pin: PinId) {
		(**self).drive_low(pin)
	}

	fn delay_micros(&mut self, micros: u32) {
		(**self).delay_micros(micros)
	}
}
