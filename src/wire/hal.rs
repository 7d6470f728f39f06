use std::error;
use std::fmt;

use embedded_hal::i2c::{
	self,
	ErrorKind,
	NoAcknowledgeSource,
	Operation,
	SevenBitAddress,
};

use super::WireInterface;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HalError {
	Nack(NoAcknowledgeSource),
	/// adjacent reads are one bus read, which is limited to 255 bytes
	ReadTooLong,
}

impl i2c::Error for HalError {
	fn kind(&self) -> ErrorKind {
		match self {
			HalError::Nack(source) => ErrorKind::NoAcknowledge(*source),
			HalError::ReadTooLong => ErrorKind::Other,
		}
	}
}

impl fmt::Display for HalError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			HalError::Nack(source) => write!(f, "no acknowledge: {}", source),
			HalError::ReadTooLong => write!(f, "more than 255 bytes in one read"),
		}
	}
}

impl error::Error for HalError {}

fn check_read_runs(operations: &[Operation<'_>]) -> Result<(), HalError> {
	let mut run = 0usize;
	for op in operations {
		match op {
			Operation::Read(buf) => run += buf.len(),
			Operation::Write(_) => run = 0,
		}
		if run > usize::from(u8::MAX) {
			return Err(HalError::ReadTooLong);
		}
	}
	Ok(())
}

fn is_read(op: &Operation<'_>) -> bool {
	match op {
		Operation::Read(_) => true,
		Operation::Write(_) => false,
	}
}

/// `embedded_hal::i2c::I2c` on top of any `WireInterface`.
///
/// Follows the embedded-hal transaction contract: adjacent operations of the
/// same direction are merged, a direction change is a repeated START, and
/// the last operation ends with STOP. A NACK aborts with STOP.
pub struct HalBus<W> {
	wire: W,
}

impl<W: WireInterface> HalBus<W> {
	/// puts the bus into idle state
	pub fn new(mut wire: W) -> Self {
		wire.begin();
		HalBus {
			wire,
		}
	}

	pub fn wire(&self) -> &W {
		&self.wire
	}

	pub fn wire_mut(&mut self) -> &mut W {
		&mut self.wire
	}

	pub fn into_inner(mut self) -> W {
		self.wire.end();
		self.wire
	}

	fn write_run(&mut self, address: u8, ops: &[Operation<'_>], last: bool) -> Result<(), HalError> {
		if !self.wire.begin_transmission(address).is_ack() {
			self.wire.end_transmission(true);
			return Err(HalError::Nack(NoAcknowledgeSource::Address));
		}
		for op in ops {
			if let Operation::Write(bytes) = op {
				for &byte in bytes.iter() {
					if !self.wire.write(byte).is_ack() {
						self.wire.end_transmission(true);
						return Err(HalError::Nack(NoAcknowledgeSource::Data));
					}
				}
			}
		}
		self.wire.end_transmission(last);
		Ok(())
	}

	fn read_run(&mut self, address: u8, ops: &mut [Operation<'_>], last: bool) -> Result<(), HalError> {
		let total: usize = ops.iter().map(|op| match op {
			Operation::Read(buf) => buf.len(),
			Operation::Write(_) => 0,
		}).sum();
		// checked by check_read_runs
		let quantity = total as u8;

		// an empty read can't tell ACK from NACK; probe instead (ends with STOP)
		if 0 == quantity {
			if self.wire.probe(address) {
				return Ok(());
			}
			return Err(HalError::Nack(NoAcknowledgeSource::Address));
		}
		if 0 == self.wire.request_from(address, quantity, last) {
			self.wire.end_transmission(true);
			return Err(HalError::Nack(NoAcknowledgeSource::Address));
		}
		for op in ops.iter_mut() {
			if let Operation::Read(buf) = op {
				for b in buf.iter_mut() {
					*b = self.wire.read();
				}
			}
		}
		Ok(())
	}
}

impl<W> i2c::ErrorType for HalBus<W> {
	type Error = HalError;
}

impl<W: WireInterface> i2c::I2c for HalBus<W> {
	fn transaction(&mut self, address: SevenBitAddress, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
		check_read_runs(operations)?;

		let count = operations.len();
		let mut begin = 0;
		while begin < count {
			let read = is_read(&operations[begin]);
			let mut end = begin + 1;
			while end < count && is_read(&operations[end]) == read {
				end += 1;
			}
			let last = end == count;

			if read {
				self.read_run(address, &mut operations[begin..end], last)?;
			} else {
				self.write_run(address, &operations[begin..end], last)?;
			}
			begin = end;
		}
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use embedded_hal::i2c::{
		Error,
		ErrorKind,
		I2c,
		NoAcknowledgeSource,
		Operation,
	};

	use super::{
		HalBus,
		HalError,
	};
	use crate::sim::{
		BusEvent,
		SimBus,
		SimDevice,
	};
	use crate::wire::{
		SimpleWire,
		WireConfig,
	};

	type Bus = HalBus<SimpleWire<SimBus>>;

	fn hal_bus(device: SimDevice) -> Bus {
		let bus = SimBus::new(0, 1).with_device(device);
		let mut hal = HalBus::new(SimpleWire::new(bus, WireConfig::new(0, 1, 1)));
		hal.wire_mut().platform_mut().clear_trace();
		hal
	}

	fn events(hal: &Bus) -> Vec<BusEvent> {
		hal.wire().platform().events().to_vec()
	}

	// what a typical sensor driver does
	fn read_register<I: I2c>(i2c: &mut I, address: u8, register: u8) -> Result<u8, I::Error> {
		let mut value = [0u8];
		i2c.write_read(address, &[register], &mut value)?;
		Ok(value[0])
	}

	#[test]
	fn generic_driver_over_bitbang() {
		let mut hal = hal_bus(SimDevice::new(0x76).with_memory(&[0, 0, 0x58, 0]));
		assert_eq!(read_register(&mut hal, 0x76, 2).unwrap(), 0x58);
		assert_eq!(events(&hal), vec![
			BusEvent::Start,
			BusEvent::Address { address: 0x76, read: false, ack: true },
			BusEvent::Written { byte: 2, ack: true },
			BusEvent::Start,
			BusEvent::Address { address: 0x76, read: true, ack: true },
			BusEvent::Read { byte: 0x58, ack: false },
			BusEvent::Stop,
		]);
		assert!(hal.wire().platform().is_idle());
	}

	#[test]
	fn adjacent_operations_are_merged() {
		let mut hal = hal_bus(SimDevice::new(0x50).with_memory(&[1, 2, 3, 4]));
		let mut first = [0u8; 1];
		let mut second = [0u8; 2];
		hal.transaction(0x50, &mut [
			Operation::Write(&[0x00]),
			Operation::Write(&[]),
			Operation::Read(&mut first),
			Operation::Read(&mut second),
		]).unwrap();
		assert_eq!(first, [1]);
		assert_eq!(second, [2, 3]);
		assert_eq!(events(&hal), vec![
			BusEvent::Start,
			BusEvent::Address { address: 0x50, read: false, ack: true },
			BusEvent::Written { byte: 0, ack: true },
			BusEvent::Start,
			BusEvent::Address { address: 0x50, read: true, ack: true },
			BusEvent::Read { byte: 1, ack: true },
			BusEvent::Read { byte: 2, ack: true },
			BusEvent::Read { byte: 3, ack: false },
			BusEvent::Stop,
		]);
	}

	#[test]
	fn plain_write() {
		let mut hal = hal_bus(SimDevice::new(0x50));
		hal.write(0x50, &[0x20, 0xaa, 0xbb]).unwrap();
		let memory = hal.wire().platform().device(0x50).unwrap().memory();
		assert_eq!(&memory[0x20..0x22], &[0xaa, 0xbb]);
		assert_eq!(events(&hal).last(), Some(&BusEvent::Stop));
	}

	#[test]
	fn nack_kinds() {
		let mut hal = hal_bus(SimDevice::new(0x50).nack_write_at(1));
		let err = hal.write(0x51, &[0]).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
		assert!(hal.wire().platform().is_idle());

		let err = hal.write(0x50, &[0, 1]).unwrap_err();
		assert_eq!(err, HalError::Nack(NoAcknowledgeSource::Data));
		assert!(hal.wire().platform().is_idle());

		let mut buf = [0u8; 2];
		let err = hal.read(0x51, &mut buf).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
		assert!(hal.wire().platform().is_idle());
	}

	#[test]
	fn empty_read_checks_address() {
		let mut hal = hal_bus(SimDevice::new(0x50));
		let err = hal.read(0x51, &mut []).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
		assert!(hal.wire().platform().is_idle());

		hal.read(0x50, &mut []).unwrap();
		assert!(hal.wire().platform().is_idle());
		// after Start, Address and Stop of the failed probe
		assert_eq!(&events(&hal)[3..], &[
			BusEvent::Start,
			BusEvent::Address { address: 0x50, read: false, ack: true },
			BusEvent::Stop,
		][..]);
	}

	#[test]
	fn oversized_read_is_rejected_up_front() {
		let mut hal = hal_bus(SimDevice::new(0x50));
		let mut a = [0u8; 200];
		let mut b = [0u8; 56];
		let err = hal.transaction(0x50, &mut [
			Operation::Read(&mut a),
			Operation::Read(&mut b),
		]).unwrap_err();
		assert_eq!(err, HalError::ReadTooLong);
		assert_eq!(err.kind(), ErrorKind::Other);
		assert!(hal.wire().platform().calls().is_empty());

		// split by a write it's two reads
		let mut a = [0u8; 200];
		let mut b = [0u8; 56];
		hal.transaction(0x50, &mut [
			Operation::Read(&mut a),
			Operation::Write(&[0]),
			Operation::Read(&mut b),
		]).unwrap();
	}
}
