pub mod character;
pub mod endpoint;
pub mod guild;
pub mod health;
pub mod ranking;

pub use character::{CharacterBasic, CharacterId, CharacterProfile, CharacterStat, StatEntry};
pub use endpoint::{params, Endpoint, Params, TtlClass};
pub use guild::{GuildBasic, GuildId, GuildProfile};
pub use health::{HealthReport, HealthStatus};
pub use ranking::{
    default_ranking_date, RankingEntry, RankingPage, RankingQuery, RankingSearch,
    RankingSearchResult, MAX_PAGE_BUDGET,
};
