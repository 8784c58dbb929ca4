//! PWM channel control through the sysfs pwm class.
//!
//! A PWM chip directory (`.../pwm/pwmchipN`) exposes `export`/`unexport`;
//! exporting channel `K` creates `pwmK/` with `period`, `duty_cycle` and
//! `enable` attributes, all in nanoseconds or 0/1.
//!
//! The kernel boots channels with period and duty cycle both zero and rejects
//! any duty cycle while the period is zero, so the period is always written
//! before the first duty cycle. It also rejects a period shorter than the
//! current duty cycle, which decides the write order on frequency changes.

use std::path::PathBuf;

use crate::{
    channel::ChannelInfo,
    error::{Error, Result},
    sysfs::{self, ControlFile},
    tracing::prelude::*,
};

/// Highest accepted frequency; gives a 1 ns period.
pub const MAX_FREQUENCY_HZ: f64 = 1e9;

const NANOS_PER_SECOND: f64 = 1e9;
const DEFAULT_FREQUENCY_HZ: f64 = 50.0;
const DEFAULT_DUTY_CYCLE: f64 = 50.0;

/// An exported PWM channel; unexports itself when dropped.
struct ExportedChannel {
    chip_dir: PathBuf,
    id: u32,
}

impl Drop for ExportedChannel {
    fn drop(&mut self) {
        match sysfs::write_once(&self.chip_dir.join("unexport"), &self.id.to_string()) {
            Ok(()) => debug!(chip = %self.chip_dir.display(), id = self.id, "Unexported PWM channel"),
            Err(e) => error!(
                chip = %self.chip_dir.display(),
                id = self.id,
                error = %e,
                "Failed to unexport PWM channel"
            ),
        }
    }
}

/// Controller for one PWM channel.
pub struct PwmController {
    channel: String,
    frequency_hz: f64,
    duty_cycle: f64,
    period_ns: u64,
    duty_cycle_ns: u64,
    enabled: bool,
    period_file: ControlFile,
    duty_cycle_file: ControlFile,
    enable_file: ControlFile,
    _exported: ExportedChannel,
}

impl PwmController {
    /// Export the channel, then apply the frequency and the duty cycle.
    ///
    /// An out-of-range frequency or duty cycle falls back to 50 Hz / 50 %.
    pub(crate) fn new(info: &ChannelInfo, frequency_hz: f64, duty_cycle: f64) -> Result<Self> {
        let (chip_dir, id) = match (&info.pwm_chip_dir, info.pwm_id) {
            (Some(dir), Some(id)) => (dir.clone(), id),
            _ => {
                return Err(Error::PwmUnavailable {
                    channel: info.channel.clone(),
                })
            }
        };

        let root = chip_dir.join(format!("pwm{}", id));
        let period_path = root.join("period");
        let duty_cycle_path = root.join("duty_cycle");
        let enable_path = root.join("enable");

        if !root.exists() {
            sysfs::write_once(&chip_dir.join("export"), &id.to_string())?;
            debug!(chip = %chip_dir.display(), id, "Exported PWM channel");
        }
        let exported = ExportedChannel { chip_dir, id };
        sysfs::wait_for_files(&[&period_path, &duty_cycle_path, &enable_path])?;

        let mut controller = Self {
            channel: info.channel.clone(),
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            duty_cycle: DEFAULT_DUTY_CYCLE,
            period_ns: 0,
            duty_cycle_ns: 0,
            enabled: false,
            period_file: ControlFile::open_write(period_path)?,
            duty_cycle_file: ControlFile::open_write(duty_cycle_path)?,
            enable_file: ControlFile::open_write(enable_path)?,
            _exported: exported,
        };

        controller.reset_frequency(frequency_hz)?;
        if controller.period_ns == 0 {
            controller.apply_frequency(DEFAULT_FREQUENCY_HZ)?;
        }
        controller.reset_duty_cycle(duty_cycle)?;

        Ok(controller)
    }

    /// Start producing the waveform.
    pub fn start(&mut self) -> Result<()> {
        self.enable_file.write_value("1")?;
        self.enabled = true;
        Ok(())
    }

    /// Stop producing the waveform.
    pub fn stop(&mut self) -> Result<()> {
        self.enable_file.write_value("0")?;
        self.enabled = false;
        Ok(())
    }

    /// Change the frequency, keeping the duty cycle percentage.
    ///
    /// Frequencies outside `(0, MAX_FREQUENCY_HZ]` are ignored.
    pub fn reset_frequency(&mut self, frequency_hz: f64) -> Result<()> {
        if !(frequency_hz > 0.0 && frequency_hz <= MAX_FREQUENCY_HZ) {
            warn!(channel = %self.channel, frequency_hz, "Ignoring out-of-range PWM frequency");
            return Ok(());
        }
        self.apply_frequency(frequency_hz)
    }

    fn apply_frequency(&mut self, frequency_hz: f64) -> Result<()> {
        let period_ns = (NANOS_PER_SECOND / frequency_hz).round() as u64;
        let duty_cycle_ns = duty_cycle_ns(period_ns, self.duty_cycle);

        if period_ns < self.duty_cycle_ns {
            self.write_duty_cycle_ns(duty_cycle_ns)?;
            self.write_period_ns(period_ns)?;
        } else {
            self.write_period_ns(period_ns)?;
            self.write_duty_cycle_ns(duty_cycle_ns)?;
        }

        self.frequency_hz = frequency_hz;
        trace!(channel = %self.channel, frequency_hz, period_ns, duty_cycle_ns, "PWM frequency set");
        Ok(())
    }

    /// Change the duty cycle, in percent of the period.
    ///
    /// Values outside `[0, 100]` are ignored.
    pub fn reset_duty_cycle(&mut self, duty_cycle: f64) -> Result<()> {
        if !(0.0..=100.0).contains(&duty_cycle) {
            warn!(channel = %self.channel, duty_cycle, "Ignoring out-of-range PWM duty cycle");
            return Ok(());
        }

        self.write_duty_cycle_ns(duty_cycle_ns(self.period_ns, duty_cycle))?;
        self.duty_cycle = duty_cycle;
        Ok(())
    }

    fn write_period_ns(&mut self, period_ns: u64) -> Result<()> {
        self.period_file.write_value(&period_ns.to_string())?;
        self.period_ns = period_ns;
        Ok(())
    }

    fn write_duty_cycle_ns(&mut self, duty_cycle_ns: u64) -> Result<()> {
        self.duty_cycle_file.write_value(&duty_cycle_ns.to_string())?;
        self.duty_cycle_ns = duty_cycle_ns;
        Ok(())
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn frequency(&self) -> f64 {
        self.frequency_hz
    }

    pub fn duty_cycle(&self) -> f64 {
        self.duty_cycle
    }

    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    pub fn duty_cycle_ns(&self) -> u64 {
        self.duty_cycle_ns
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for PwmController {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(channel = %self.channel, error = %e, "Failed to disable PWM channel");
        }
    }
}

fn duty_cycle_ns(period_ns: u64, percent: f64) -> u64 {
    (period_ns as f64 * percent / 100.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, path::Path};

    /// PWM chip with channel 0 already exported.
    fn pwm_tree(root: &Path) -> ChannelInfo {
        let chip_dir = root.join("sys/devices/7000a000.pwm/pwm/pwmchip0");
        let channel_dir = chip_dir.join("pwm0");
        fs::create_dir_all(&channel_dir).unwrap();
        for file in ["export", "unexport"] {
            fs::write(chip_dir.join(file), "").unwrap();
        }
        for file in ["period", "duty_cycle", "enable"] {
            fs::write(channel_dir.join(file), "0").unwrap();
        }

        ChannelInfo {
            channel: "32".into(),
            gpio_chip_dir: root.join("sys/devices/6000d000.gpio"),
            chip_gpio: 168,
            gpio: 168,
            gpio_name: "gpio168".into(),
            pwm_chip_dir: Some(chip_dir),
            pwm_id: Some(0),
        }
    }

    fn attr(info: &ChannelInfo, name: &str) -> String {
        let dir = info.pwm_chip_dir.as_ref().unwrap().join("pwm0");
        fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn test_duty_cycle_ns() {
        assert_eq!(duty_cycle_ns(20_000_000, 50.0), 10_000_000);
        assert_eq!(duty_cycle_ns(20_000_000, 7.5), 1_500_000);
        assert_eq!(duty_cycle_ns(3, 50.0), 2);
        assert_eq!(duty_cycle_ns(0, 50.0), 0);
    }

    #[test]
    fn test_construction_writes_period_then_duty() {
        let dir = tempfile::tempdir().unwrap();
        let info = pwm_tree(dir.path());

        let pwm = PwmController::new(&info, 50.0, 25.0).unwrap();
        assert_eq!(attr(&info, "period"), "20000000");
        assert_eq!(attr(&info, "duty_cycle"), "5000000");
        assert_eq!(pwm.frequency(), 50.0);
        assert_eq!(pwm.duty_cycle(), 25.0);
        assert!(!pwm.is_enabled());
    }

    #[test]
    fn test_frequency_change_rescales_duty() {
        let dir = tempfile::tempdir().unwrap();
        let info = pwm_tree(dir.path());

        let mut pwm = PwmController::new(&info, 50.0, 50.0).unwrap();
        pwm.reset_frequency(1000.0).unwrap();
        assert_eq!(attr(&info, "period"), "1000000");
        assert_eq!(attr(&info, "duty_cycle"), "500000");
        assert_eq!(pwm.duty_cycle(), 50.0);

        pwm.reset_frequency(3.0).unwrap();
        assert_eq!(pwm.period_ns(), 333_333_333);
        assert_eq!(pwm.duty_cycle_ns(), 166_666_667);
    }

    #[test]
    fn test_out_of_range_values_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let info = pwm_tree(dir.path());

        let mut pwm = PwmController::new(&info, 100.0, 40.0).unwrap();

        pwm.reset_frequency(0.0).unwrap();
        pwm.reset_frequency(-10.0).unwrap();
        pwm.reset_frequency(f64::NAN).unwrap();
        pwm.reset_frequency(2e9).unwrap();
        assert_eq!(pwm.frequency(), 100.0);
        assert_eq!(attr(&info, "period"), "10000000");

        pwm.reset_duty_cycle(150.0).unwrap();
        pwm.reset_duty_cycle(-5.0).unwrap();
        assert_eq!(pwm.duty_cycle(), 40.0);
        assert_eq!(attr(&info, "duty_cycle"), "4000000");

        pwm.reset_duty_cycle(0.0).unwrap();
        assert_eq!(attr(&info, "duty_cycle"), "0");
        pwm.reset_duty_cycle(100.0).unwrap();
        assert_eq!(attr(&info, "duty_cycle"), "10000000");
    }

    #[test]
    fn test_invalid_initial_frequency_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let info = pwm_tree(dir.path());

        let pwm = PwmController::new(&info, 0.0, 10.0).unwrap();
        assert_eq!(pwm.frequency(), DEFAULT_FREQUENCY_HZ);
        assert_eq!(attr(&info, "period"), "20000000");
        assert_eq!(attr(&info, "duty_cycle"), "2000000");
    }

    #[test]
    fn test_start_stop_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let info = pwm_tree(dir.path());
        let chip_dir = info.pwm_chip_dir.clone().unwrap();

        let mut pwm = PwmController::new(&info, 50.0, 50.0).unwrap();
        pwm.start().unwrap();
        assert_eq!(attr(&info, "enable"), "1");
        pwm.stop().unwrap();
        assert_eq!(attr(&info, "enable"), "0");

        pwm.start().unwrap();
        drop(pwm);
        assert_eq!(attr(&info, "enable"), "0");
        assert_eq!(fs::read_to_string(chip_dir.join("unexport")).unwrap(), "0");
        // Channel was already exported, so export was never written
        assert_eq!(fs::read_to_string(chip_dir.join("export")).unwrap(), "");
    }

    #[test]
    fn test_pwm_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = pwm_tree(dir.path());
        info.pwm_chip_dir = None;

        assert!(matches!(
            PwmController::new(&info, 50.0, 50.0),
            Err(Error::PwmUnavailable { .. })
        ));
    }

    #[test]
    fn test_export_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut info = pwm_tree(dir.path());
        info.pwm_id = Some(2);
        let chip_dir = info.pwm_chip_dir.clone().unwrap();

        let err = PwmController::new(&info, 50.0, 50.0).err().unwrap();
        assert!(matches!(err, Error::ExportTimeout { attempts: 100, .. }));
        assert_eq!(fs::read_to_string(chip_dir.join("export")).unwrap(), "2");
        assert_eq!(fs::read_to_string(chip_dir.join("unexport")).unwrap(), "2");
    }
}
