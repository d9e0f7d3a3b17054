/// Sound definitions
///
/// Content-authored descriptions of playable sounds. They are read-only at
/// runtime and shared between requests and emitters through `Arc`.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Name of the parameter used for pitch variation
pub const PITCH_PARAMETER: &str = "Pitch";

/// Identity of an underlying audio asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(String);

impl SoundId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SoundId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Immutable description of a playable sound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundDefinition {
    /// Asset reference
    pub sound: SoundId,

    /// Keep playing until explicitly stopped
    #[serde(default)]
    pub looping: bool,

    /// Start as soon as the emitter is bound when prepared
    #[serde(default)]
    pub play_on_ready: bool,

    /// Subject to the concurrent frequent-sound cap
    #[serde(default)]
    pub frequent: bool,
}

impl SoundDefinition {
    /// One-shot, non-frequent sound
    pub fn new(sound: impl Into<SoundId>) -> Self {
        Self {
            sound: sound.into(),
            looping: false,
            play_on_ready: false,
            frequent: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn play_on_ready(mut self, play_on_ready: bool) -> Self {
        self.play_on_ready = play_on_ready;
        self
    }

    pub fn frequent(mut self, frequent: bool) -> Self {
        self.frequent = frequent;
        self
    }

    /// Wrap for sharing
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl From<String> for SoundId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Named float parameter forwarded to a voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundParameter {
    pub name: String,
    pub value: f32,
}

impl SoundParameter {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Named sounds available to gameplay code
#[derive(Debug, Clone, Default)]
pub struct SoundLibrary {
    sounds: HashMap<String, Arc<SoundDefinition>>,
}

impl SoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `sounds` table of the configuration
    pub fn from_definitions(definitions: &BTreeMap<String, SoundDefinition>) -> Self {
        let sounds = definitions
            .iter()
            .map(|(name, definition)| (name.clone(), Arc::new(definition.clone())))
            .collect();
        Self { sounds }
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: SoundDefinition) {
        self.sounds.insert(name.into(), Arc::new(definition));
    }

    pub fn get(&self, name: &str) -> Option<Arc<SoundDefinition>> {
        self.sounds.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sounds.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_builder() {
        let def = SoundDefinition::new("footstep").frequent(true);
        assert_eq!(def.sound.as_str(), "footstep");
        assert!(def.frequent);
        assert!(!def.looping);
        assert!(!def.play_on_ready);
    }

    #[test]
    fn test_definition_defaults_from_json() {
        let def: SoundDefinition = serde_json::from_str(r#"{ "sound": "coin" }"#).unwrap();
        assert_eq!(def, SoundDefinition::new("coin"));

        let def: SoundDefinition =
            serde_json::from_str(r#"{ "sound": "music", "looping": true }"#).unwrap();
        assert!(def.looping);
    }

    #[test]
    fn test_library_lookup() {
        let mut defs = BTreeMap::new();
        defs.insert("coin_collected".to_string(), SoundDefinition::new("coin"));
        defs.insert(
            "player_footsteps".to_string(),
            SoundDefinition::new("footstep").frequent(true),
        );

        let library = SoundLibrary::from_definitions(&defs);
        assert_eq!(library.len(), 2);
        assert!(library.get("player_footsteps").unwrap().frequent);
        assert!(library.get("missing").is_none());
    }
}
