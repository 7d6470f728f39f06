#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate softwire;
use softwire::*;

use std::process::exit;

use softwire::sim::{
	SimBus,
	SimDevice,
};
use softwire::wire::{
	ClockTiming,
	Platform,
	parse_byte,
};

// address of the EEPROM on the simulated bus
const SIM_EEPROM: u8 = 0x50;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn print_dump(start: usize, data: &[u8]) {
	for (i, chunk) in data.chunks(16).enumerate() {
		print!("{:02x}:", start + i * 16);
		for b in chunk {
			print!(" {:02x}", b);
		}
		println!();
	}
}

fn scan<W: WireInterface>(wire: &mut W) -> AResult<()> {
	// 0x00-0x07 and 0x78-0x7f are reserved
	let found = wire.scan(0x08..=0x77);
	for &address in &found {
		println!("{}", Address::new(address)?);
	}
	info!("{} device(s) found", found.len());
	Ok(())
}

fn read<W: WireInterface>(wire: &mut W, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address: Address = get_param(sub_m, "ADDRESS")?;
	let count: u8 = get_param(sub_m, "COUNT")?;
	let mut buf = vec![0u8; count as usize];

	let (start, status) = match sub_m.value_of("register") {
		Some(r) => {
			let register = parse_byte(r)?;
			(register as usize, wire.write_read(address.get(), &[register], &mut buf))
		},
		None => (0, wire.read_bytes(address.get(), &mut buf, true)),
	};
	ensure!(status.is_success(), "reading from {} failed: {}", address, status);

	print_dump(start, &buf);
	Ok(())
}

fn write<W: WireInterface>(wire: &mut W, sub_m: &clap::ArgMatches) -> AResult<()> {
	let address: Address = get_param(sub_m, "ADDRESS")?;
	let bytes = match sub_m.values_of("BYTE") {
		Some(values) => values.map(parse_byte).collect::<AResult<Vec<u8>>>()?,
		None => bail!("missing parameter BYTE"),
	};

	let status = wire.write_bytes(address.get(), &bytes, true);
	ensure!(status.is_success(), "writing to {} failed: {}", address, status);
	info!("wrote {} byte(s) to {}", bytes.len(), address);
	Ok(())
}

fn run<P: Platform>(platform: P, config: WireConfig, matches: &clap::ArgMatches) -> AResult<()> {
	let mut wire = SimpleWire::new(platform, config);
	wire.begin();

	let result = match matches.subcommand() {
		("scan", _) => {
			scan(&mut wire)
		},
		("read", Some(sub_m)) => {
			read(&mut wire, sub_m)
		},
		("write", Some(sub_m)) => {
			write(&mut wire, sub_m)
		},
		("", _) => Err(format_err!("no subcommand")),
		(cmd, _) => Err(format_err!("not implemented subcommand {:?}", cmd)),
	};

	wire.end();
	result
}

fn simulated_bus(config: &WireConfig) -> SimBus {
	// every cell holds its own offset
	let memory: Vec<u8> = (0..=255u8).collect();
	SimBus::new(config.data_pin, config.clock_pin)
		.with_device(SimDevice::new(SIM_EEPROM).with_memory(&memory))
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg sda: --sda +takes_value default_value("2") "GPIO number of the data line (SDA)")
		(@arg scl: --scl +takes_value default_value("3") "GPIO number of the clock line (SCL)")
		(@arg delay: --delay +takes_value default_value("5") "settle time after each line transition in microseconds")
		(@arg symmetric: --symmetric "keep the clock released as long as it is held low")
		(@arg simulate: --simulate "use a simulated bus with an EEPROM at 0x50 instead of GPIOs")
		(@subcommand scan =>
			(about: "list addresses of responding devices")
		)
		(@subcommand read =>
			(about: "read bytes from a device and print them")
			(@arg register: -r --register +takes_value "register to select before reading (repeated START)")
			(@arg ADDRESS: +required "7-bit device address (decimal or 0x..)")
			(@arg COUNT: +required "number of bytes to read (max 255)")
		)
		(@subcommand write =>
			(about: "write bytes to a device")
			(@arg ADDRESS: +required "7-bit device address (decimal or 0x..)")
			(@arg BYTE: +required ... "bytes to write (decimal or 0x..)")
		)
	).get_matches();

	let mut config = WireConfig::new(
		get_param(&matches, "sda")?,
		get_param(&matches, "scl")?,
		get_param(&matches, "delay")?,
	);
	ensure!(config.data_pin != config.clock_pin, "data and clock need different GPIOs");
	if matches.is_present("symmetric") {
		config = config.with_timing(ClockTiming::Symmetric);
	}

	if matches.is_present("simulate") {
		info!("using simulated bus");
		run(simulated_bus(&config), config, &matches)
	} else {
		let gpio = gpio::open_sysfs(&[config.data_pin, config.clock_pin])?;
		run(gpio, config, &matches)
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
