use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::domain::shortcut::{ShortcutError, ShortcutSlot, ShortcutSpec};

/// One shortcut slot: whether it is active and its wire-format shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutBinding {
    pub enabled: bool,
    pub shortcut: String,
}

impl ShortcutBinding {
    fn new(enabled: bool, shortcut: &str) -> Self {
        Self {
            enabled,
            shortcut: shortcut.to_string(),
        }
    }
}

/// The three shortcut slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutBindings {
    pub smart: ShortcutBinding,
    pub hold: ShortcutBinding,
    pub toggle: ShortcutBinding,
}

impl Default for ShortcutBindings {
    fn default() -> Self {
        Self {
            smart: ShortcutBinding::new(true, "Alt+Space"),
            hold: ShortcutBinding::new(false, "Control+Alt+Space"),
            toggle: ShortcutBinding::new(false, "Control+Shift+Space"),
        }
    }
}

impl ShortcutBindings {
    pub fn get(&self, slot: ShortcutSlot) -> &ShortcutBinding {
        match slot {
            ShortcutSlot::Smart => &self.smart,
            ShortcutSlot::Hold => &self.hold,
            ShortcutSlot::Toggle => &self.toggle,
        }
    }

    pub fn get_mut(&mut self, slot: ShortcutSlot) -> &mut ShortcutBinding {
        match slot {
            ShortcutSlot::Smart => &mut self.smart,
            ShortcutSlot::Hold => &mut self.hold,
            ShortcutSlot::Toggle => &mut self.toggle,
        }
    }

    /// Number of enabled slots.
    pub fn enabled_count(&self) -> usize {
        ShortcutSlot::ALL
            .iter()
            .filter(|slot| self.get(**slot).enabled)
            .count()
    }
}

/// Where transcription runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionMode {
    #[default]
    Cloud,
    Local,
}

/// LLM provider used for transcript cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
    Anthropic,
    Ollama,
    LmStudio,
    Custom,
}

impl LlmProvider {
    /// Endpoint the provider listens on out of the box.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Anthropic => "https://api.anthropic.com/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
            LlmProvider::LmStudio => "http://localhost:1234/v1",
            LlmProvider::Custom => "",
        }
    }
}

/// API key for the cleanup provider.
///
/// Wiped from memory on drop and never rendered by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(\"\")")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// LLM cleanup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmCleanupConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub endpoint: String,
    pub api_key: ApiKey,
    pub model: String,
}

impl Default for LlmCleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LlmProvider::OpenAi,
            endpoint: LlmProvider::OpenAi.default_endpoint().to_string(),
            api_key: ApiKey::default(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// User settings owned by the host. The front-end edits a draft copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub shortcuts: ShortcutBindings,
    pub transcription_mode: TranscriptionMode,
    /// Key of the selected local model.
    pub local_model: String,
    /// Microphone device id, `None` for the system default.
    pub microphone_device: Option<String>,
    /// Language code, e.g. "en" or "auto".
    pub language: String,
    pub llm_cleanup: LlmCleanupConfig,
    /// Custom vocabulary fed to the transcriber.
    pub dictionary: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shortcuts: ShortcutBindings::default(),
            transcription_mode: TranscriptionMode::Cloud,
            local_model: "whisper-small".to_string(),
            microphone_device: None,
            language: "auto".to_string(),
            llm_cleanup: LlmCleanupConfig::default(),
            dictionary: Vec::new(),
        }
    }
}

impl Settings {
    /// Enable or disable a shortcut slot.
    ///
    /// Disabling the last enabled slot is refused and leaves the settings
    /// untouched. Returns whether the request was applied.
    #[must_use]
    pub fn set_slot_enabled(&mut self, slot: ShortcutSlot, enabled: bool) -> bool {
        let binding = self.shortcuts.get(slot);
        if !enabled && binding.enabled && self.shortcuts.enabled_count() == 1 {
            return false;
        }
        self.shortcuts.get_mut(slot).enabled = enabled;
        true
    }

    /// Store a captured shortcut in a slot.
    pub fn set_shortcut(&mut self, slot: ShortcutSlot, spec: &ShortcutSpec) {
        self.shortcuts.get_mut(slot).shortcut = spec.to_string();
    }

    pub fn is_slot_enabled(&self, slot: ShortcutSlot) -> bool {
        self.shortcuts.get(slot).enabled
    }

    /// Rewrite every slot's shortcut in canonical form.
    ///
    /// Slots whose string does not parse are left untouched and returned.
    pub fn normalize_shortcuts(&mut self) -> Vec<(ShortcutSlot, ShortcutError)> {
        let mut invalid = Vec::new();
        for slot in ShortcutSlot::ALL {
            let binding = self.shortcuts.get_mut(slot);
            match binding.shortcut.parse::<ShortcutSpec>() {
                Ok(spec) => binding.shortcut = spec.to_string(),
                Err(error) => invalid.push((slot, error)),
            }
        }
        invalid
    }
}
