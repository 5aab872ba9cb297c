use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::{SortMode, SortOrder, SortSpec};

pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 400;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_sort")]
    pub default_sort: SortSpec,
}

impl Settings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            search_debounce_ms: default_search_debounce_ms(),
            default_sort: default_sort(),
        }
    }
}

fn default_search_debounce_ms() -> u64 {
    DEFAULT_SEARCH_DEBOUNCE_MS
}

fn default_sort() -> SortSpec {
    SortSpec {
        mode: SortMode::DueAt,
        order: SortOrder::Descending,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            settings: Settings::default(),
        }
    }
}
