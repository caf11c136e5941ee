use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Query parameters for one upstream call.
///
/// A `BTreeMap` keeps keys sorted, so cache keys are deterministic
/// regardless of insertion order.
pub type Params = BTreeMap<String, String>;

/// Builds a [`Params`] map from string pairs
pub fn params<K, V, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// How long responses of an endpoint stay fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// name → id mappings, stable for days
    Identity,
    /// Character/guild descriptions, refreshed a few times a day
    Profile,
    /// Volatile character stats
    Stats,
    /// Daily leaderboards
    Ranking,
}

/// One logical upstream operation, independent of its HTTP path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    CharacterId,
    CharacterBasic,
    CharacterStat,
    GuildId,
    GuildBasic,
    OverallRanking,
}

impl Endpoint {
    pub const ALL: [Endpoint; 6] = [
        Endpoint::CharacterId,
        Endpoint::CharacterBasic,
        Endpoint::CharacterStat,
        Endpoint::GuildId,
        Endpoint::GuildBasic,
        Endpoint::OverallRanking,
    ];

    /// Stable id, used in cache keys and config overrides
    pub fn id(&self) -> &'static str {
        match self {
            Endpoint::CharacterId => "character_id",
            Endpoint::CharacterBasic => "character_basic",
            Endpoint::CharacterStat => "character_stat",
            Endpoint::GuildId => "guild_id",
            Endpoint::GuildBasic => "guild_basic",
            Endpoint::OverallRanking => "overall_ranking",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::CharacterId => "/maplestory/v1/id",
            Endpoint::CharacterBasic => "/maplestory/v1/character/basic",
            Endpoint::CharacterStat => "/maplestory/v1/character/stat",
            Endpoint::GuildId => "/maplestory/v1/guild/id",
            Endpoint::GuildBasic => "/maplestory/v1/guild/basic",
            Endpoint::OverallRanking => "/maplestory/v1/ranking/overall",
        }
    }

    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Endpoint::CharacterId | Endpoint::GuildId => TtlClass::Identity,
            Endpoint::CharacterBasic | Endpoint::GuildBasic => TtlClass::Profile,
            Endpoint::CharacterStat => TtlClass::Stats,
            Endpoint::OverallRanking => TtlClass::Ranking,
        }
    }

    /// Cache key for a call: `endpoint_id?k1=v1&k2=v2` with sorted,
    /// percent-encoded parameters.
    pub fn cache_key(&self, params: &Params) -> String {
        let mut key = String::from(self.id());
        for (i, (k, v)) in params.iter().enumerate() {
            key.push(if i == 0 { '?' } else { '&' });
            key.push_str(&urlencoding::encode(k));
            key.push('=');
            key.push_str(&urlencoding::encode(v));
        }
        key
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .iter()
            .copied()
            .find(|e| e.id() == s)
            .ok_or_else(|| format!("unknown endpoint: {}", s))
    }
}
