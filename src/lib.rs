pub mod engine {
  pub mod audio;
  pub mod backend;
  pub mod decode;
  pub mod messages;
  pub mod mixer;
  pub mod playback;
  pub mod state;
  pub mod volume;
}
pub mod background;
pub mod board;
pub mod config;
pub mod controller;
pub mod error;
pub mod paths;
pub mod shell;
pub mod store;

pub use config::Config;
pub use controller::{Controller, KeyOutcome, UiEvent};
pub use error::{Error, Result};
