//! Simulated Jetson Nano kernel tree for integration tests.
//!
//! The tree mirrors what the kernel exposes on a Nano developer kit, rooted
//! in a temporary directory. Nothing plays the kernel's part, so the GPIO
//! lines and PWM channels a test touches are created up front as if they had
//! already been exported.

#![allow(dead_code)]

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use jetson_gpio::SysfsConfig;
use tempfile::TempDir;

pub const NANO_COMPATIBLE: &[u8] =
    b"nvidia,p3449-0000-b00+p3448-0000-b00\0nvidia,jetson-nano\0nvidia,tegra210\0";

pub const GPIO_CHIP: &str = "6000d000.gpio";
pub const PWM_CHIP: &str = "7000a000.pwm";

pub struct SimulatedJetson {
    dir: TempDir,
}

impl SimulatedJetson {
    /// A Nano whose GPIO chip starts at global line `base`.
    pub fn nano(base: u32) -> Self {
        let sim = Self {
            dir: tempfile::tempdir().unwrap(),
        };

        sim.write("proc/device-tree/compatible", NANO_COMPATIBLE);
        sim.mkdir("proc/device-tree/chosen/plugin-manager/ids/3448-0000-400");

        // The GPIO chip sits under the second device prefix
        let chip = format!("sys/devices/platform/{}/gpio/gpiochip{}", GPIO_CHIP, base);
        sim.write(&format!("{}/base", chip), format!("{}\n", base).as_bytes());
        sim.write(&format!("{}/ngpio", chip), b"256\n");

        let pwm_chip = format!("sys/devices/{}/pwm/pwmchip0", PWM_CHIP);
        sim.write(&format!("{}/export", pwm_chip), b"");
        sim.write(&format!("{}/unexport", pwm_chip), b"");

        sim.write("sys/class/gpio/export", b"");
        sim.write("sys/class/gpio/unexport", b"");

        sim
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> SysfsConfig {
        SysfsConfig::with_root(self.root())
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &[u8]) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn mkdir(&self, relative: &str) {
        fs::create_dir_all(self.path(relative)).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn remove(&self, relative: &str) {
        let path = self.path(relative);
        if path.is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }

    /// Create `gpioN/` as the kernel would after an export.
    pub fn add_line(&self, gpio: u32) {
        let line = format!("sys/class/gpio/gpio{}", gpio);
        self.write(&format!("{}/direction", line), b"in");
        self.write(&format!("{}/value", line), b"0");
        self.write(&format!("{}/edge", line), b"none");
    }

    pub fn line_attr(&self, gpio: u32, attr: &str) -> String {
        self.read(&format!("sys/class/gpio/gpio{}/{}", gpio, attr))
    }

    /// Rewrite a line's value in place, producing a single modify event.
    pub fn drive_line(&self, gpio: u32, value: &str) {
        let path = self.path(&format!("sys/class/gpio/gpio{}/value", gpio));
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.write_all(value.as_bytes()).unwrap();
    }

    /// Create `pwmN/` under the PWM chip as the kernel would after an export.
    pub fn add_pwm_channel(&self, id: u32) {
        let channel = format!("sys/devices/{}/pwm/pwmchip0/pwm{}", PWM_CHIP, id);
        for attr in ["period", "duty_cycle", "enable"] {
            self.write(&format!("{}/{}", channel, attr), b"0");
        }
    }

    pub fn pwm_attr(&self, id: u32, attr: &str) -> String {
        self.read(&format!(
            "sys/devices/{}/pwm/pwmchip0/pwm{}/{}",
            PWM_CHIP, id, attr
        ))
    }

    pub fn pwm_chip_attr(&self, attr: &str) -> String {
        self.read(&format!("sys/devices/{}/pwm/pwmchip0/{}", PWM_CHIP, attr))
    }
}
