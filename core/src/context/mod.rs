mod config;
mod error;

pub use config::{APP_NAME, CONFIG_NAME, PixieConfigExt};
pub use error::ConfigError;
pub use pixie_types::{BubbleAppearance, BubbleOptions, PixieConfig};
