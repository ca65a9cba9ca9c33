use serde::{Deserialize, Serialize};

/// One row of the profile display table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub value: i32,
    pub name: String,
}

impl ProfileEntry {
    pub fn new(value: i32, name: &str) -> Self {
        Self {
            value,
            name: name.to_string(),
        }
    }
}

/// Ordered lookup from engine profile ids to display names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTable {
    entries: Vec<ProfileEntry>,
}

impl ProfileTable {
    pub fn new(entries: Vec<ProfileEntry>) -> Self {
        Self { entries }
    }

    /// Display name for a profile id, or `None` when the id is not listed
    pub fn name_of(&self, profile: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.value == profile)
            .map(|e| e.name.as_str())
    }

    pub fn position_of(&self, profile: i32) -> Option<usize> {
        self.entries.iter().position(|e| e.value == profile)
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::new(default_profiles())
    }
}

pub fn default_profiles() -> Vec<ProfileEntry> {
    vec![
        ProfileEntry::new(0, "Dynamic"),
        ProfileEntry::new(1, "Movie"),
        ProfileEntry::new(2, "Music"),
        ProfileEntry::new(3, "Custom"),
    ]
}
