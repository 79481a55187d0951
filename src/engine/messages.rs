use std::sync::Arc;

use super::decode::Clip;

pub type VoiceId = u64;

#[derive(Clone, Debug)]
pub enum EngineMsg {
  /// Leave the suspended state; the mixer renders silence until then.
  Resume,
  Start { voice: VoiceId, clip: Arc<Clip>, looping: bool, routed: bool },
  /// Put an already started voice behind the shared gain stage.
  Route { voice: VoiceId },
  Stop { voice: VoiceId },
  SetGain { gain: f32 },
  Quit,
}
