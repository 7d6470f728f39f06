use super::interface::address_byte;
use super::{
	Ack,
	BusConfig,
	LineDriver,
	Platform,
	TransmissionStatus,
	WireConfig,
	WireInterface,
};

// state of a read started by `request_from`
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct PendingRead {
	// never zero
	remaining: u8,
	send_stop: bool,
}

/// Bit-banged I2C master.
///
/// Nothing is buffered: `begin_transmission` and `write` put their byte on
/// the bus before returning and report the device's ACK/NACK directly.
///
/// `C` carries pins and delay; use `FixedConfig` to bake them in at compile
/// time or `WireConfig` to choose them at runtime.
pub struct SimpleWire<P, C = WireConfig> {
	lines: LineDriver<P, C>,
	pending: Option<PendingRead>,
}

impl<P: Platform, C: BusConfig> SimpleWire<P, C> {
	pub fn new(platform: P, config: C) -> Self {
		SimpleWire {
			lines: LineDriver::new(platform, config),
			pending: None,
		}
	}

	pub fn config(&self) -> &C {
		self.lines.config()
	}

	pub fn platform(&self) -> &P {
		self.lines.platform()
	}

	pub fn platform_mut(&mut self) -> &mut P {
		self.lines.platform_mut()
	}

	pub fn into_inner(self) -> (P, C) {
		self.lines.into_inner()
	}

	/// bytes `read` will still deliver in the current read transaction
	pub fn pending_bytes(&self) -> u8 {
		self.pending.map_or(0, |p| p.remaining)
	}

	// DATA falls while CLOCK is released; leaves CLOCK low
	fn start(&mut self) {
		trace!("START");
		self.lines.release_clock();
		self.lines.release_data();

		self.lines.assert_data_low();
		self.lines.assert_clock_low();
	}

	// DATA rises while CLOCK is released; expects CLOCK low
	fn stop(&mut self) {
		trace!("STOP");
		self.lines.assert_data_low();
		self.lines.release_clock();
		self.lines.release_data();
	}

	// send 8 bits MSB first, then sample the device's ACK
	fn write_byte(&mut self, data: u8) -> Ack {
		for bit in (0..8).rev() {
			self.lines.set_data(0 != data & (1 << bit));
			self.lines.release_clock();
			self.lines.hold_clock_high();
			self.lines.assert_clock_low();
		}

		let ack = self.read_ack();
		trace!("wrote 0x{:02x}: {:?}", data, ack);
		ack
	}

	// 9th clock of a written byte: the device drives DATA
	fn read_ack(&mut self) -> Ack {
		self.lines.release_data();
		self.lines.release_clock();
		self.lines.hold_clock_high();
		let ack = Ack::from_level(self.lines.read_data());
		// device releases DATA after this falling edge
		self.lines.assert_clock_low();
		ack
	}

	// 9th clock of a read byte: we drive DATA
	fn send_ack(&mut self, ack: Ack) {
		match ack {
			Ack::Ack => self.lines.assert_data_low(),
			Ack::Nack => self.lines.release_data(),
		}
		self.lines.release_clock();
		self.lines.hold_clock_high();
		self.lines.assert_clock_low();
	}

	fn read_byte(&mut self) -> u8 {
		// let the device drive DATA
		self.lines.release_data();

		let mut data = 0u8;
		for _ in 0..8 {
			self.lines.release_clock();
			self.lines.hold_clock_high();
			data = data << 1 | self.lines.read_data() as u8;
			self.lines.assert_clock_low();
		}
		data
	}
}

impl<P: Platform, C: BusConfig> WireInterface for SimpleWire<P, C> {
	fn begin(&mut self) {
		self.lines.release_clock();
		self.lines.release_data();
	}

	fn end(&mut self) {
		self.lines.release_clock();
		self.lines.release_data();
	}

	fn begin_transmission(&mut self, address: u8) -> Ack {
		if self.pending.take().is_some() {
			warn!("starting write to 0x{:02x} with unread bytes pending", address);
		}
		self.start();
		let ack = self.write_byte(address_byte(address, false));
		if !ack.is_ack() {
			debug!("address 0x{:02x} (write) not acknowledged", address);
		}
		ack
	}

	fn write(&mut self, byte: u8) -> Ack {
		let ack = self.write_byte(byte);
		if !ack.is_ack() {
			debug!("data byte 0x{:02x} not acknowledged", byte);
		}
		ack
	}

	fn end_transmission(&mut self, send_stop: bool) -> TransmissionStatus {
		// CLOCK is always low here
		if send_stop {
			self.stop();
		}
		TransmissionStatus::Success
	}

	fn request_from(&mut self, address: u8, quantity: u8, send_stop: bool) -> u8 {
		if self.pending.take().is_some() {
			warn!("starting read from 0x{:02x} with unread bytes pending", address);
		}
		self.start();
		let ack = self.write_byte(address_byte(address, true));
		if !ack.is_ack() {
			debug!("address 0x{:02x} (read) not acknowledged", address);
		}

		if 0 == quantity {
			// nothing to read: nobody would send the terminating NACK + STOP,
			// and the caller can't tell ACK from NACK by the result
			if send_stop {
				self.stop();
			}
			return 0;
		}
		if !ack.is_ack() {
			return 0;
		}

		self.pending = Some(PendingRead {
			remaining: quantity,
			send_stop,
		});
		quantity
	}

	fn read(&mut self) -> u8 {
		let pending = match self.pending {
			Some(p) => p,
			None => {
				warn!("read without pending bytes");
				return 0xff;
			}
		};

		let data = self.read_byte();

		let remaining = pending.remaining - 1;
		if 0 != remaining {
			self.pending = Some(PendingRead {
				remaining,
				..pending
			});
			self.send_ack(Ack::Ack);
		} else {
			self.pending = None;
			self.send_ack(Ack::Nack);
			if pending.send_stop {
				self.stop();
			}
		}

		trace!("read 0x{:02x}", data);
		data
	}
}
