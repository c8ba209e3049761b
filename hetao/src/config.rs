use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use dotenv::var;
use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Pause between keypad polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Recording slot (1-6) played when a result is shown.
    pub result_sound: Option<u8>,
    /// Playback volume level, 1 (20%) to 5 (100%).
    pub volume: u8,
}

impl Config {
    pub fn try_load() -> Option<Self> {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("config.json"));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let config_str = var("CONFIG_FILE").unwrap_or_else(|_| "config.json".to_string());
        let config_path = Path::new(&config_str);
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            poll_interval_ms: 20,
            result_sound: Some(1),
            volume: 3,
        }
    }
}
