//! Simulated open-drain bus.
//!
//! `SimBus` implements `Platform` for exactly two pins and models both
//! lines as wired-AND of the master's pins and the attached devices. It
//! decodes the master's signalling (START, STOP, address and data bytes,
//! ACK/NACK) and lets `SimDevice`s answer like a small EEPROM: the first
//! byte written after the address sets a register pointer, further written
//! bytes are stored there, reads return memory from the pointer onwards.
//!
//! Everything the master does is recorded, so tests can check the exact
//! sequence of GPIO calls, the decoded bus events and the clock waveform.

use crate::wire::{
	Direction,
	PinId,
	Platform,
};

/// A call the master made on the GPIO capability.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum GpioCall {
	SetDirection(PinId, Direction),
	DriveLow(PinId),
	Read(PinId, bool),
}

/// Decoded bus activity.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BusEvent {
	Start,
	Stop,
	Address {
		address: u8,
		read: bool,
		ack: bool,
	},
	/// data byte sent by the master; `ack` is the device's answer
	Written {
		byte: u8,
		ack: bool,
	},
	/// data byte sent by the device; `ack` is the master's answer
	Read {
		byte: u8,
		ack: bool,
	},
}

/// CLOCK transition with the DATA level at that moment.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ClockEdge {
	pub at_micros: u64,
	pub rising: bool,
	pub data: bool,
}

#[derive(Clone, Debug)]
pub struct SimDevice {
	address: u8,
	memory: Vec<u8>,
	pointer: usize,
	nack_address: bool,
	nack_write_at: Option<usize>,
}

impl SimDevice {
	/// 256 bytes of memory, all 0xff
	///
	/// # Panics
	///
	/// If `address` doesn't fit in 7 bits.
	pub fn new(address: u8) -> Self {
		assert!(address < 0x80);
		SimDevice {
			address,
			memory: vec![0xff; 256],
			pointer: 0,
			nack_address: false,
			nack_write_at: None,
		}
	}

	/// memory content starting at register 0; replaces the default memory
	///
	/// # Panics
	///
	/// If `memory` is empty or longer than 256 bytes.
	pub fn with_memory(mut self, memory: &[u8]) -> Self {
		assert!(!memory.is_empty() && memory.len() <= 256);
		self.memory = memory.to_vec();
		self
	}

	/// never acknowledge the address
	pub fn nack_address(mut self) -> Self {
		self.nack_address = true;
		self
	}

	/// NACK the data byte with this index (0 = register pointer) of every
	/// write transaction
	pub fn nack_write_at(mut self, index: usize) -> Self {
		self.nack_write_at = Some(index);
		self
	}

	pub fn address(&self) -> u8 {
		self.address
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn pointer(&self) -> usize {
		self.pointer
	}

	// returns whether the byte gets acknowledged
	fn receive(&mut self, index: usize, byte: u8) -> bool {
		if self.nack_write_at == Some(index) {
			return false;
		}
		if 0 == index {
			self.pointer = byte as usize % self.memory.len();
		} else {
			self.memory[self.pointer] = byte;
			self.pointer = (self.pointer + 1) % self.memory.len();
		}
		true
	}

	fn transmit(&mut self) -> u8 {
		let byte = self.memory[self.pointer];
		self.pointer = (self.pointer + 1) % self.memory.len();
		byte
	}
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Phase {
	// nobody addressed (or addressed device gave up) until next START
	Idle,
	Address { bits: u8, shift: u8 },
	AddressAck { device: usize, read: bool },
	Write { device: usize, index: usize, bits: u8, shift: u8 },
	WriteAck { device: usize, index: usize, ack: bool },
	Read { device: usize, byte: u8, bits: u8 },
	ReadAck { device: usize, byte: u8, ack: bool },
}

pub struct SimBus {
	data_pin: PinId,
	clock_pin: PinId,
	// master pins in OUTPUT mode (always LOW)
	master_data_low: bool,
	master_clock_low: bool,
	device_data_low: bool,
	phase: Phase,
	devices: Vec<SimDevice>,
	now_micros: u64,
	calls: Vec<GpioCall>,
	events: Vec<BusEvent>,
	clock_edges: Vec<ClockEdge>,
}

impl SimBus {
	/// idle bus with both master pins in INPUT mode
	///
	/// # Panics
	///
	/// If both lines use the same pin.
	pub fn new(data_pin: PinId, clock_pin: PinId) -> Self {
		assert_ne!(data_pin, clock_pin);
		SimBus {
			data_pin,
			clock_pin,
			master_data_low: false,
			master_clock_low: false,
			device_data_low: false,
			phase: Phase::Idle,
			devices: Vec::new(),
			now_micros: 0,
			calls: Vec::new(),
			events: Vec::new(),
			clock_edges: Vec::new(),
		}
	}

	pub fn with_device(mut self, device: SimDevice) -> Self {
		self.attach(device);
		self
	}

	/// # Panics
	///
	/// If another device already uses the address.
	pub fn attach(&mut self, device: SimDevice) {
		assert!(self.device(device.address).is_none(), "address 0x{:02x} already in use", device.address);
		self.devices.push(device);
	}

	pub fn device(&self, address: u8) -> Option<&SimDevice> {
		self.devices.iter().find(|d| d.address == address)
	}

	pub fn data_level(&self) -> bool {
		!(self.master_data_low || self.device_data_low)
	}

	pub fn clock_level(&self) -> bool {
		!self.master_clock_low
	}

	/// both lines released by everyone
	pub fn is_idle(&self) -> bool {
		self.data_level() && self.clock_level()
	}

	pub fn calls(&self) -> &[GpioCall] {
		&self.calls
	}

	pub fn events(&self) -> &[BusEvent] {
		&self.events
	}

	pub fn clock_edges(&self) -> &[ClockEdge] {
		&self.clock_edges
	}

	/// DATA level at every rising CLOCK edge, i.e. every sampled bit
	pub fn sampled_bits(&self) -> Vec<bool> {
		self.clock_edges.iter().filter(|e| e.rising).map(|e| e.data).collect()
	}

	pub fn elapsed_micros(&self) -> u64 {
		self.now_micros
	}

	/// forget recorded calls, events and edges; bus and device state stay
	pub fn clear_trace(&mut self) {
		self.calls.clear();
		self.events.clear();
		self.clock_edges.clear();
	}

	fn find_device(&self, address: u8) -> Option<usize> {
		self.devices.iter().position(|d| d.address == address && !d.nack_address)
	}

	fn set_master_pin(&mut self, pin: PinId, low: bool) {
		let clock_before = self.clock_level();
		let data_before = self.data_level();

		if pin == self.data_pin {
			self.master_data_low = low;
		} else if pin == self.clock_pin {
			self.master_clock_low = low;
		} else {
			warn!("simulated bus: ignoring unknown pin {}", pin);
			return;
		}

		let clock = self.clock_level();
		let data = self.data_level();

		if clock != clock_before {
			self.clock_edges.push(ClockEdge {
				at_micros: self.now_micros,
				rising: clock,
				data,
			});
			if clock {
				self.clock_rising(data);
			} else {
				self.clock_falling();
			}
		} else if clock && data != data_before {
			if data {
				trace!("simulated bus: STOP");
				self.events.push(BusEvent::Stop);
				self.phase = Phase::Idle;
			} else {
				trace!("simulated bus: START");
				self.events.push(BusEvent::Start);
				self.phase = Phase::Address { bits: 0, shift: 0 };
			}
			self.device_data_low = false;
		}
	}

	// receiver samples DATA
	fn clock_rising(&mut self, data: bool) {
		let phase = self.phase;
		self.phase = match phase {
			Phase::Address { bits, shift } => Phase::Address {
				bits: bits + 1,
				shift: shift << 1 | data as u8,
			},
			Phase::Write { device, index, bits, shift } => Phase::Write {
				device,
				index,
				bits: bits + 1,
				shift: shift << 1 | data as u8,
			},
			Phase::Read { device, byte, bits } => Phase::Read {
				device,
				byte,
				bits: bits + 1,
			},
			Phase::ReadAck { device, byte, .. } => {
				let ack = !data;
				self.events.push(BusEvent::Read { byte, ack });
				Phase::ReadAck { device, byte, ack }
			},
			other => other,
		};
	}

	// transmitter may change DATA
	fn clock_falling(&mut self) {
		let phase = self.phase;
		self.phase = match phase {
			Phase::Address { bits: 8, shift } => {
				let address = shift >> 1;
				let read = 0 != shift & 1;
				let device = self.find_device(address);
				self.events.push(BusEvent::Address {
					address,
					read,
					ack: device.is_some(),
				});
				match device {
					Some(device) => {
						self.device_data_low = true;
						Phase::AddressAck { device, read }
					},
					None => Phase::Idle,
				}
			},
			Phase::AddressAck { device, read: true } => {
				let byte = self.devices[device].transmit();
				self.start_byte(device, byte)
			},
			Phase::AddressAck { device, read: false } => {
				self.device_data_low = false;
				Phase::Write { device, index: 0, bits: 0, shift: 0 }
			},
			Phase::Write { device, index, bits: 8, shift } => {
				let ack = self.devices[device].receive(index, shift);
				self.events.push(BusEvent::Written { byte: shift, ack });
				self.device_data_low = ack;
				Phase::WriteAck { device, index, ack }
			},
			Phase::WriteAck { device, index, ack } => {
				self.device_data_low = false;
				if ack {
					Phase::Write { device, index: index + 1, bits: 0, shift: 0 }
				} else {
					Phase::Idle
				}
			},
			Phase::Read { device, byte, bits } => {
				if bits < 8 {
					self.device_data_low = 0 == byte & (0x80 >> bits);
					Phase::Read { device, byte, bits }
				} else {
					// master drives the 9th bit
					self.device_data_low = false;
					Phase::ReadAck { device, byte, ack: false }
				}
			},
			Phase::ReadAck { device, ack: true, .. } => {
				let byte = self.devices[device].transmit();
				self.start_byte(device, byte)
			},
			Phase::ReadAck { ack: false, .. } => Phase::Idle,
			other => other,
		};
	}

	fn start_byte(&mut self, device: usize, byte: u8) -> Phase {
		self.device_data_low = 0 == byte & 0x80;
		Phase::Read { device, byte, bits: 0 }
	}
}

impl Platform for SimBus {
	fn set_direction(&mut self, pin: PinId, direction: Direction) {
		self.calls.push(GpioCall::SetDirection(pin, direction));
		self.set_master_pin(pin, direction == Direction::Output);
	}

	fn read_digital(&mut self, pin: PinId) -> bool {
		let level = if pin == self.data_pin {
			self.data_level()
		} else if pin == self.clock_pin {
			self.clock_level()
		} else {
			true
		};
		self.calls.push(GpioCall::Read(pin, level));
		level
	}

	fn drive_low(&mut self, pin: PinId) {
		self.calls.push(GpioCall::DriveLow(pin));
		self.set_master_pin(pin, true);
	}

	fn delay_micros(&mut self, micros: u32) {
		self.now_micros += u64::from(micros);
	}
}
