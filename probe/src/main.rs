use std::cell::RefCell;
use std::thread::sleep;
use std::time::Duration;
use dotenv::{dotenv, var};
use embedded_hal_bus::i2c::RefCellDevice;
use linux_embedded_hal::I2cdev;
use log::{debug, info, warn};
use sysinfo::System;
use time::macros::format_description;
use time::OffsetDateTime;
use hetao_sensor::audio::AudioModule;
use hetao_sensor::bus::{HalI2cBus, I2cBusExt};
use hetao_sensor::climate::ClimateSensor;
use hetao_sensor::gpiod::GpiodDriver;
use hetao_sensor::iio::IioAnalogInput;
use hetao_sensor::keypad::I2cKeypad;
use hetao_sensor::knob::{AnalogPin, Knob};
use hetao_sensor::sonar::{PingUnit, Sonar};
use hetao_sensor::thermometer::{Thermometer, ThermometerMode};
use hetao_sensor::{GpioBias, GpioDriver, SensorError};

/// Reads an optional pin number from the environment.
fn env_pin(name: &str) -> eyre::Result<Option<usize>> {
    match var(name) {
        Ok(pin) => Ok(Some(pin.trim().parse()?)),
        Err(_) => Ok(None),
    }
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!("Architecture {}", System::cpu_arch());

    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    info!(
        "Probe started at {}",
        now.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))?
    );

    let i2c_path = var("HETAO_I2C_BUS").unwrap_or_else(|_| "/dev/i2c-1".to_string());
    let i2c = RefCell::new(I2cdev::new(&i2c_path)?);

    let mut bus = HalI2cBus::new(RefCellDevice::new(&i2c));
    let devices = bus.scan()?;
    info!("I2C devices on {}: {:02x?}", i2c_path, devices);

    let mut audio = AudioModule::new(HalI2cBus::new(RefCellDevice::new(&i2c)));
    match audio.volume() {
        Ok(volume) => info!("Sound intensity {}", volume),
        Err(e) => warn!("{:?}: {}", audio, e),
    }

    let mut climate = ClimateSensor::new(HalI2cBus::new(RefCellDevice::new(&i2c)));
    match climate.read() {
        Ok(reading) => info!(
            "Temperature {:.1} °C, humidity {:.1} %RH",
            reading.temperature, reading.humidity
        ),
        Err(e) => warn!("{:?}: {}", climate, e),
    }

    let mut keypad = I2cKeypad::new(HalI2cBus::new(RefCellDevice::new(&i2c)));
    match keypad.read_number_keys() {
        Ok(code) => info!("Keypad reports key code {}", code),
        Err(e) => warn!("{:?}: {}", keypad, e),
    }

    let chip_path = var("HETAO_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized.", gpio);

    let pwm_pin = env_pin("HETAO_THERMO_PIN_PWM")?;
    let mut thermometer = Thermometer::new(HalI2cBus::new(RefCellDevice::new(&i2c)));
    let mode = thermometer.start(|| match pwm_pin {
        Some(pin) => gpio.edge_source(pin, GpioBias::PullDown),
        None => Err(SensorError::NotSupported),
    });
    match mode {
        Ok(mode) => {
            if mode == ThermometerMode::Pwm {
                // Give the monitor a few periods.
                sleep(Duration::from_secs(1));
            }
            match thermometer.read_temperature() {
                Ok(Some(celsius)) => info!("Body temperature {:.1} °C ({:?})", celsius, mode),
                Ok(None) => warn!("{:?} has no reading yet.", thermometer),
                Err(e) => warn!("{:?}: {}", thermometer, e),
            }
        }
        Err(e) => warn!("Thermometer not started: {}", e),
    }

    if let (Some(trig_no), Some(echo_no)) = (env_pin("HETAO_SONAR_PIN_TRIG")?, env_pin("HETAO_SONAR_PIN_ECHO")?) {
        let mut trig = gpio.get_pin(trig_no)?;
        trig.set_bias(GpioBias::None)?;
        let trig_out = trig.as_output()?;
        let mut echo = gpio.get_pin(echo_no)?;
        let echo_in = echo.as_input()?;

        let sonar = Sonar::new(&*trig_out, &*echo_in);
        let distance = sonar.ping(PingUnit::Centimeters)?;
        info!("Distance {} cm", distance);
    } else {
        debug!("Sonar pins not set, skipping.");
    }

    if let Ok(pin) = var("HETAO_KNOB_ADC") {
        let pin: AnalogPin = pin.parse()?;
        let device: usize = var("HETAO_IIO_DEVICE").map_or(Ok(0), |device| device.trim().parse())?;
        let input = IioAnalogInput::open(device, pin.channel())?;
        let knob = Knob::new(&input);
        info!("Knob on {:?} at position {}", pin, knob.read_knob()?);
    } else {
        debug!("Knob pin not set, skipping.");
    }

    Ok(())
}
