use super::{
	BusConfig,
	ClockTiming,
	Direction,
	Platform,
};

/// Open-drain view of the two bus lines.
///
/// "release" switches the pin to INPUT (the pull-up makes the line HIGH),
/// "assert" switches it to OUTPUT LOW. Each transition is followed by the
/// configured bit delay.
pub struct LineDriver<P, C> {
	platform: P,
	config: C,
}

impl<P: Platform, C: BusConfig> LineDriver<P, C> {
	pub fn new(platform: P, config: C) -> Self {
		LineDriver {
			platform,
			config,
		}
	}

	pub fn config(&self) -> &C {
		&self.config
	}

	pub fn platform(&self) -> &P {
		&self.platform
	}

	pub fn platform_mut(&mut self) -> &mut P {
		&mut self.platform
	}

	pub fn into_inner(self) -> (P, C) {
		(self.platform, self.config)
	}

	fn settle(&mut self) {
		let micros = self.config.delay_micros();
		self.platform.delay_micros(micros);
	}

	pub fn release_clock(&mut self) {
		let pin = self.config.clock_pin();
		self.platform.set_direction(pin, Direction::Input);
		self.settle();
	}

	pub fn assert_clock_low(&mut self) {
		let pin = self.config.clock_pin();
		self.platform.drive_low(pin);
		self.settle();
	}

	pub fn release_data(&mut self) {
		let pin = self.config.data_pin();
		self.platform.set_direction(pin, Direction::Input);
		self.settle();
	}

	pub fn assert_data_low(&mut self) {
		let pin = self.config.data_pin();
		self.platform.drive_low(pin);
		self.settle();
	}

	/// release or assert DATA according to `high`
	pub fn set_data(&mut self, high: bool) {
		if high {
			self.release_data();
		} else {
			self.assert_data_low();
		}
	}

	// only meaningful while DATA is released
	pub fn read_data(&mut self) -> bool {
		let pin = self.config.data_pin();
		self.platform.read_digital(pin)
	}

	/// wait out the rest of the CLOCK high phase of a data bit
	pub fn hold_clock_high(&mut self) {
		if self.config.timing() == ClockTiming::Symmetric {
			self.settle();
		}
	}
}
