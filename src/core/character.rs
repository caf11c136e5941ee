use serde::{Deserialize, Serialize};

/// Internal id for a character name (`/maplestory/v1/id`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterId {
    pub ocid: String,
}

/// Character basic information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterBasic {
    /// Snapshot date; `None` when the latest data was requested
    #[serde(default)]
    pub date: Option<String>,

    pub character_name: String,

    #[serde(default)]
    pub world_name: String,

    #[serde(default)]
    pub character_gender: String,

    #[serde(default)]
    pub character_class: String,

    /// Job advancement level ("1" - "6")
    #[serde(default)]
    pub character_class_level: String,

    #[serde(default)]
    pub character_level: u32,

    #[serde(default)]
    pub character_exp: u64,

    /// Experience percentage within the current level, as sent upstream
    #[serde(default)]
    pub character_exp_rate: String,

    #[serde(default)]
    pub character_guild_name: Option<String>,

    #[serde(default)]
    pub character_image: String,

    #[serde(default)]
    pub character_date_create: Option<String>,

    /// Whether the character logged in during the last 7 days ("true"/"false")
    #[serde(default)]
    pub access_flag: String,
}

impl CharacterBasic {
    pub fn is_recently_active(&self) -> bool {
        self.access_flag.eq_ignore_ascii_case("true")
    }
}

/// One entry of the final stat table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatEntry {
    pub stat_name: String,
    #[serde(default)]
    pub stat_value: Option<String>,
}

/// Character stats (`/maplestory/v1/character/stat`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterStat {
    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub character_class: String,

    #[serde(default)]
    pub final_stat: Vec<StatEntry>,

    #[serde(default)]
    pub remain_ap: Option<u32>,
}

impl CharacterStat {
    /// Raw value of a named stat (e.g. "전투력")
    pub fn stat(&self, name: &str) -> Option<&str> {
        self.final_stat
            .iter()
            .find(|s| s.stat_name == name)
            .and_then(|s| s.stat_value.as_deref())
    }
}

/// Composed character lookup: name → ocid → basic + stat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterProfile {
    pub ocid: String,
    pub basic: CharacterBasic,
    pub stat: CharacterStat,
}
