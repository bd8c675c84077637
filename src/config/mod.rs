mod loader;
mod settings;

pub use loader::{load_config, LoadedConfig, ProfileConfig, SmokeConfig, CONFIG_FILE_NAME};
pub use settings::{Overrides, Settings, SettingsBuilder, DEFAULT_RESULTS_DIR};
