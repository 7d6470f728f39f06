use std::fs;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{
	Path,
	PathBuf,
};
use std::time::Duration;

use crate::wire::{
	Direction,
	PinId,
	Platform,
	reliable_sleep,
};

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

// udev may need a moment to fix permissions of freshly exported pins
const EXPORT_POLL: Duration = Duration::from_millis(10);
const EXPORT_ATTEMPTS: usize = 100;

struct Line {
	pin: PinId,
	direction: PathBuf,
	value: fs::File,
}

/// Pins driven through `/sys/class/gpio`.
///
/// The attribute files don't report errors through the infallible
/// `Platform` calls; failures are logged and reads fall back to HIGH (the
/// idle level of a pulled-up line).
pub struct SysfsGpio {
	lines: Vec<Line>,
}

/// export (if needed) and open `pins`, switching all of them to INPUT
pub fn open_sysfs(pins: &[PinId]) -> crate::AResult<SysfsGpio> {
	SysfsGpio::open_at(SYSFS_GPIO_ROOT, pins)
}

fn export(root: &Path, pin: PinId) -> crate::AResult<PathBuf> {
	let dir = root.join(format!("gpio{}", pin));
	if dir.is_dir() {
		return Ok(dir);
	}

	debug!("exporting GPIO {}", pin);
	with_context!(("couldn't export GPIO {}", pin),
		Ok(fs::write(root.join("export"), pin.to_string())?)
	)?;

	let direction = dir.join("direction");
	for _ in 0..EXPORT_ATTEMPTS {
		if fs::OpenOptions::new().write(true).open(&direction).is_ok() {
			return Ok(dir);
		}
		reliable_sleep(EXPORT_POLL);
	}
	bail!("exported GPIO {} but {} didn't become writable", pin, direction.display());
}

fn open_line(root: &Path, pin: PinId) -> crate::AResult<Line> {
	let dir = export(root, pin)?;
	let direction = dir.join("direction");
	with_context!(("couldn't release GPIO {}", pin),
		Ok(fs::write(&direction, "in")?)
	)?;
	let value = with_context!(("couldn't open value of GPIO {}", pin),
		Ok(fs::File::open(dir.join("value"))?)
	)?;

	Ok(Line {
		pin,
		direction,
		value,
	})
}

impl SysfsGpio {
	/// like `open_sysfs`, with a different sysfs root
	pub fn open_at<P: AsRef<Path>>(root: P, pins: &[PinId]) -> crate::AResult<Self> {
		let root = root.as_ref();
		let mut lines = Vec::with_capacity(pins.len());
		for &pin in pins {
			ensure!(lines.iter().all(|l: &Line| l.pin != pin), "GPIO {} requested twice", pin);
			lines.push(open_line(root, pin)?);
		}
		info!("using GPIOs {:?} from {}", pins, root.display());
		Ok(SysfsGpio {
			lines,
		})
	}

	fn line(&self, pin: PinId) -> Option<&Line> {
		let line = self.lines.iter().find(|l| l.pin == pin);
		if line.is_none() {
			error!("GPIO {} wasn't opened", pin);
		}
		line
	}

	fn write_direction(&self, pin: PinId, direction: &str) {
		if let Some(line) = self.line(pin) {
			if let Err(e) = fs::write(&line.direction, direction) {
				error!("GPIO {}: couldn't set direction {:?}: {}", pin, direction, e);
			}
		}
	}

	fn read_value(line: &Line) -> io::Result<bool> {
		let mut buf = [0u8; 2];
		let l = line.value.read_at(&mut buf, 0)?;
		match &buf[..l] {
			[b'0', ..] => Ok(false),
			[b'1', ..] => Ok(true),
			other => Err(io::Error::new(io::ErrorKind::InvalidData, format!("unexpected value {:?}", other))),
		}
	}
}

impl Platform for SysfsGpio {
	fn set_direction(&mut self, pin: PinId, direction: Direction) {
		match direction {
			Direction::Input => self.write_direction(pin, "in"),
			// "out" starts LOW as well
			Direction::Output => self.write_direction(pin, "out"),
		}
	}

	fn read_digital(&mut self, pin: PinId) -> bool {
		let line = match self.line(pin) {
			Some(line) => line,
			None => return true,
		};
		match Self::read_value(line) {
			Ok(v) => v,
			Err(e) => {
				error!("GPIO {}: couldn't read value: {}", pin, e);
				true
			},
		}
	}

	fn drive_low(&mut self, pin: PinId) {
		// switches to output and sets the level in one step
		self.write_direction(pin, "low");
	}
}
