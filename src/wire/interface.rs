use std::fmt;
use std::ops::RangeInclusive;
use std::str;

/// Answer of the receiver in the 9th clock of a byte.
///
/// The numeric codes follow the `endTransmission` convention: 0 means
/// success.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Ack {
	/// receiver pulled DATA low
	Ack = 0,
	/// DATA stayed high (pull-up)
	Nack = 1,
}

impl Ack {
	/// interpret the DATA level sampled during the acknowledge clock
	pub fn from_level(high: bool) -> Self {
		if high { Ack::Nack } else { Ack::Ack }
	}

	pub fn is_ack(self) -> bool {
		self == Ack::Ack
	}

	pub fn code(self) -> u8 {
		self as u8
	}
}

impl From<Ack> for u8 {
	fn from(ack: Ack) -> u8 {
		ack.code()
	}
}

/// Status of a finished write transaction; shared by all implementations of
/// `WireInterface`, so some codes never come out of the bit-banged engine.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum TransmissionStatus {
	Success = 0,
	/// buffered implementations: more data than fits the buffer
	BufferTooLong = 1,
	AddressNack = 2,
	DataNack = 3,
	Other = 4,
}

impl TransmissionStatus {
	pub fn code(self) -> u8 {
		self as u8
	}

	pub fn from_code(code: u8) -> Option<Self> {
		match code {
			0 => Some(TransmissionStatus::Success),
			1 => Some(TransmissionStatus::BufferTooLong),
			2 => Some(TransmissionStatus::AddressNack),
			3 => Some(TransmissionStatus::DataNack),
			4 => Some(TransmissionStatus::Other),
			_ => None,
		}
	}

	pub fn is_success(self) -> bool {
		self == TransmissionStatus::Success
	}
}

impl fmt::Display for TransmissionStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let msg = match self {
			TransmissionStatus::Success => "success",
			TransmissionStatus::BufferTooLong => "data too long for buffer",
			TransmissionStatus::AddressNack => "address not acknowledged",
			TransmissionStatus::DataNack => "data not acknowledged",
			TransmissionStatus::Other => "other error",
		};
		write!(f, "{} ({})", msg, self.code())
	}
}

/// First byte of a transaction: 7-bit address and direction bit.
///
/// Bit 7 of `address` is shifted out and ignored.
pub fn address_byte(address: u8, read: bool) -> u8 {
	address << 1 | read as u8
}

/// Byte written as decimal ("80") or hex ("0x50"), without sign.
pub fn parse_byte(s: &str) -> crate::AResult<u8> {
	let (digits, radix) = if s.starts_with("0x") || s.starts_with("0X") {
		(&s[2..], 16)
	} else {
		(s, 10)
	};
	// from_str_radix takes a leading '+'
	ensure!(!digits.starts_with('+'), "invalid byte {:?}: unexpected sign", s);
	with_context!(("invalid byte {:?}", s),
		Ok(u8::from_str_radix(digits, radix)?)
	)
}

/// Validated 7-bit device address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Address(u8);

impl Address {
	pub const MAX: u8 = 0x7f;

	pub fn new(address: u8) -> crate::AResult<Self> {
		ensure!(address <= Self::MAX, "invalid I2C address 0x{:02x} (only 7 bits)", address);
		Ok(Address(address))
	}

	pub fn get(self) -> u8 {
		self.0
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl str::FromStr for Address {
	type Err = ::failure::Error;

	// "0x50" or "80"
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let value = with_context!(("invalid I2C address {:?}", s), parse_byte(s))?;
		Address::new(value)
	}
}

/// The two-wire master contract.
///
/// Writing: `begin_transmission`, any number of `write`, `end_transmission`.
/// Reading: `request_from`, then exactly as many `read` calls as it
/// returned. Implementations that transmit immediately report ACK/NACK from
/// `begin_transmission` and `write`; buffered ones report it from
/// `end_transmission`.
pub trait WireInterface {
	/// put both lines into the idle (released) state
	fn begin(&mut self);

	fn end(&mut self);

	/// START, then the address with the write bit
	fn begin_transmission(&mut self, address: u8) -> Ack;

	fn write(&mut self, byte: u8) -> Ack;

	/// STOP if `send_stop`; otherwise the bus stays claimed for a repeated
	/// START
	fn end_transmission(&mut self, send_stop: bool) -> TransmissionStatus;

	/// START, then the address with the read bit; returns `quantity` if the
	/// device answered, 0 otherwise
	fn request_from(&mut self, address: u8, quantity: u8, send_stop: bool) -> u8;

	/// next byte of the current read; 0xff if none is pending
	fn read(&mut self) -> u8;

	/// whether a device answers at `address`; always ends with STOP
	fn probe(&mut self, address: u8) -> bool {
		let ack = self.begin_transmission(address);
		self.end_transmission(true);
		ack.is_ack()
	}

	/// complete write transaction; aborts with STOP on the first NACK
	fn write_bytes(&mut self, address: u8, bytes: &[u8], send_stop: bool) -> TransmissionStatus {
		if !self.begin_transmission(address).is_ack() {
			self.end_transmission(true);
			return TransmissionStatus::AddressNack;
		}
		for &byte in bytes {
			if !self.write(byte).is_ack() {
				self.end_transmission(true);
				return TransmissionStatus::DataNack;
			}
		}
		self.end_transmission(send_stop)
	}

	/// complete read transaction filling `buf`
	///
	/// A single read can't exceed 255 bytes; longer buffers are rejected
	/// without touching the bus. An empty `buf` only probes the address
	/// (and always ends with STOP).
	fn read_bytes(&mut self, address: u8, buf: &mut [u8], send_stop: bool) -> TransmissionStatus {
		if buf.len() > usize::from(u8::MAX) {
			return TransmissionStatus::BufferTooLong;
		}
		if buf.is_empty() {
			// `request_from` returns 0 either way
			return if self.probe(address) {
				TransmissionStatus::Success
			} else {
				TransmissionStatus::AddressNack
			};
		}
		let quantity = buf.len() as u8;
		if 0 == self.request_from(address, quantity, send_stop) {
			self.end_transmission(true);
			return TransmissionStatus::AddressNack;
		}
		for b in buf.iter_mut() {
			*b = self.read();
		}
		TransmissionStatus::Success
	}

	/// write `bytes`, then read into `buf` after a repeated START
	fn write_read(&mut self, address: u8, bytes: &[u8], buf: &mut [u8]) -> TransmissionStatus {
		if buf.len() > usize::from(u8::MAX) {
			return TransmissionStatus::BufferTooLong;
		}
		let status = self.write_bytes(address, bytes, false);
		if !status.is_success() {
			return status;
		}
		self.read_bytes(address, buf, true)
	}

	/// addresses in `addresses` that acknowledge a probe
	fn scan(&mut self, addresses: RangeInclusive<u8>) -> Vec<u8> {
		addresses.filter(|&address| self.probe(address)).collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn check_address(repr: &str, value: u8) {
		match repr.parse::<Address>() {
			Err(e) => panic!("{} failed to parse as Address: {}", repr, e),
			Ok(a) => assert_eq!(a.get(), value, "failed validating parsed {}", repr),
		}
	}

	fn check_invalid_address(repr: &str) {
		assert!(repr.parse::<Address>().is_err(), "{:?} must not be a valid address", repr);
	}

	#[test]
	fn parse_address() {
		check_address("0", 0);
		check_address("80", 0x50);
		check_address("0x50", 0x50);
		check_address("0X7f", 0x7f);
		check_address("127", 0x7f);
		check_invalid_address("");
		check_invalid_address("0x");
		check_invalid_address("0x80");
		check_invalid_address("128");
		check_invalid_address("256");
		check_invalid_address("-1");
		check_invalid_address("0x5g");
		check_invalid_address("+80");
		check_invalid_address("0x+5");
		assert_eq!(Address::new(0x50).unwrap().to_string(), "0x50");
	}

	fn check_byte(repr: &str, value: u8) {
		match parse_byte(repr) {
			Err(e) => panic!("{} failed to parse as byte: {}", repr, e),
			Ok(b) => assert_eq!(b, value, "failed validating parsed {}", repr),
		}
	}

	#[test]
	fn parse_bytes() {
		check_byte("0", 0);
		check_byte("255", 0xff);
		check_byte("0xa5", 0xa5);
		check_byte("0XFF", 0xff);
		for invalid in &["", "0x", "256", "0x100", "+1", "0x+f", "-0", " 1"] {
			assert!(parse_byte(invalid).is_err(), "{:?} must not be a valid byte", invalid);
		}
	}

	#[test]
	fn address_byte_layout() {
		for a in 0..=Address::MAX {
			assert_eq!(address_byte(a, false), a << 1);
			assert_eq!(address_byte(a, true), (a << 1) | 1);
		}
	}

	#[test]
	fn status_codes() {
		assert_eq!(Ack::Ack.code(), 0);
		assert_eq!(Ack::Nack.code(), 1);
		assert_eq!(Ack::from_level(false), Ack::Ack);
		assert_eq!(Ack::from_level(true), Ack::Nack);

		for code in 0..5 {
			let status = TransmissionStatus::from_code(code).unwrap();
			assert_eq!(status.code(), code);
		}
		assert_eq!(TransmissionStatus::from_code(5), None);
		assert_eq!(TransmissionStatus::AddressNack.code(), 2);
		assert_eq!(TransmissionStatus::DataNack.code(), 3);
	}
}
