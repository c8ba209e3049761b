mod config;
mod app;

use std::cell::RefCell;
use dotenv::{dotenv, var};
use embedded_hal_bus::i2c::RefCellDevice;
use linux_embedded_hal::I2cdev;
use log::{debug, info, warn};
use hetao_sensor::audio::{AudioModule, SoundIndex, SoundVolume};
use hetao_sensor::bus::HalI2cBus;
use hetao_sensor::keypad::{I2cKeypad, KeyMatch, KeypadDispatcher, KeypadKey};
use crate::app::App;
use crate::config::Config;

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    info!("Hetao calculator starting...");

    let i2c_path = var("HETAO_I2C_BUS").unwrap_or_else(|_| "/dev/i2c-1".to_string());
    info!("I2C @ {}", i2c_path);

    debug!("Opening I2C bus...");
    let i2c = RefCell::new(I2cdev::new(&i2c_path)?);

    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load() {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    debug!("{:?}", config);

    let mut audio = AudioModule::new(HalI2cBus::new(RefCellDevice::new(&i2c)));
    if let Err(e) = audio.set_volume(SoundVolume::try_from(config.volume)?) {
        warn!("Failed to set playback volume: {}", e);
    }
    let result_sound = config.result_sound.map(SoundIndex::try_from).transpose()?;
    let mut app = App::new(audio, result_sound);

    let keypad = I2cKeypad::new(HalI2cBus::new(RefCellDevice::new(&i2c)));
    debug!("{:?} initialized.", keypad);

    let mut dispatcher = KeypadDispatcher::new(keypad);
    dispatcher.register(KeyMatch::Any, move |decoder| app.on_key(decoder));
    dispatcher.register(KeypadKey::KeyClear, |_| info!("Cleared."));

    info!("Starting keypad loop...");
    dispatcher.run(config.poll_interval())
}
