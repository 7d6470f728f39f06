use super::PinId;

/// How long CLOCK stays released during a data bit.
///
/// Every line transition is followed by one bit delay. Setting the data bit
/// and pulling CLOCK low each cost one delay, so with `Asymmetric` CLOCK is
/// low for two delays and released for one.
/// `Symmetric` adds a second delay while CLOCK is released.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ClockTiming {
	Asymmetric,
	Symmetric,
}

impl Default for ClockTiming {
	fn default() -> Self {
		ClockTiming::Asymmetric
	}
}

/// Pins and timing of one bus; fixed for the lifetime of an engine.
pub trait BusConfig {
	fn data_pin(&self) -> PinId;
	fn clock_pin(&self) -> PinId;

	/// settle time after every line transition
	fn delay_micros(&self) -> u32;

	fn timing(&self) -> ClockTiming {
		ClockTiming::Asymmetric
	}
}

/// Bus configuration chosen at runtime.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct WireConfig {
	pub data_pin: PinId,
	pub clock_pin: PinId,
	pub delay_micros: u32,
	pub timing: ClockTiming,
}

impl WireConfig {
	pub fn new(data_pin: PinId, clock_pin: PinId, delay_micros: u32) -> Self {
		WireConfig {
			data_pin,
			clock_pin,
			delay_micros,
			timing: ClockTiming::Asymmetric,
		}
	}

	pub fn with_timing(self, timing: ClockTiming) -> Self {
		WireConfig {
			timing,
			..self
		}
	}
}

impl BusConfig for WireConfig {
	fn data_pin(&self) -> PinId {
		self.data_pin
	}

	fn clock_pin(&self) -> PinId {
		self.clock_pin
	}

	fn delay_micros(&self) -> u32 {
		self.delay_micros
	}

	fn timing(&self) -> ClockTiming {
		self.timing
	}
}

/// Bus configuration fixed at compile time; zero-sized.
///
/// ```
/// use softwire::wire::{BusConfig, FixedConfig};
///
/// type Display = FixedConfig<2, 3, 4>;
/// assert_eq!(Display::default().delay_micros(), 4);
/// ```
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct FixedConfig<const DATA: PinId, const CLOCK: PinId, const DELAY: u32>;

impl<const DATA: PinId, const CLOCK: PinId, const DELAY: u32> BusConfig for FixedConfig<DATA, CLOCK, DELAY> {
	#[inline(always)]
	fn data_pin(&self) -> PinId {
		DATA
	}

	#[inline(always)]
	fn clock_pin(&self) -> PinId {
		CLOCK
	}

	#[inline(always)]
	fn delay_micros(&self) -> u32 {
		DELAY
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn fixed_and_runtime_agree() {
		let fixed = FixedConfig::<4, 5, 3>;
		let runtime = WireConfig::new(4, 5, 3);

		assert_eq!(fixed.data_pin(), runtime.data_pin());
		assert_eq!(fixed.clock_pin(), runtime.clock_pin());
		assert_eq!(fixed.delay_micros(), runtime.delay_micros());
		assert_eq!(fixed.timing(), runtime.timing());
		assert_eq!(std::mem::size_of::<FixedConfig<4, 5, 3>>(), 0);
	}

	#[test]
	fn symmetric_is_opt_in() {
		let config = WireConfig::new(0, 1, 5);
		assert_eq!(config.timing(), ClockTiming::Asymmetric);
		assert_eq!(config.with_timing(ClockTiming::Symmetric).timing(), ClockTiming::Symmetric);
	}
}
