use serde::{Deserialize, Serialize};

/// Internal id for a guild (`/maplestory/v1/guild/id`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildId {
    pub oguild_id: String,
}

/// Guild basic information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuildBasic {
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub world_name: String,

    pub guild_name: String,

    #[serde(default)]
    pub guild_level: u32,

    #[serde(default)]
    pub guild_fame: u64,

    #[serde(default)]
    pub guild_point: u64,

    #[serde(default)]
    pub guild_master_name: String,

    #[serde(default)]
    pub guild_member_count: u32,

    #[serde(default)]
    pub guild_member: Vec<String>,
}

impl GuildBasic {
    pub fn has_member(&self, character_name: &str) -> bool {
        self.guild_member.iter().any(|m| m == character_name)
    }
}

/// Composed guild lookup: (name, world) → oguild_id → basic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuildProfile {
    pub oguild_id: String,
    pub basic: GuildBasic,
}
