pub mod button;
pub mod filter;
pub mod hotkeys;
pub mod order;
pub mod registry;

pub use button::{Color, ManifestEntry, SoundButton};
pub use registry::{Registry, SoundItem};
