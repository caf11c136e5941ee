use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::endpoint::Params;
use crate::error::{EngineError, Result};

/// Hard upper bound on the page budget of one search
pub const MAX_PAGE_BUDGET: u32 = 20;

/// Offset of the upstream's publishing timezone (KST, UTC+9)
const UPSTREAM_UTC_OFFSET_HOURS: i64 = 9;

/// Most recent leaderboard day: yesterday in KST
pub fn default_ranking_date(now: DateTime<Utc>) -> NaiveDate {
    let today = (now + Duration::hours(UPSTREAM_UTC_OFFSET_HOURS)).date_naive();
    today.pred_opt().unwrap_or(today)
}

/// One row of the overall leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingEntry {
    #[serde(rename = "ranking")]
    pub rank: u32,

    #[serde(rename = "character_name")]
    pub name: String,

    #[serde(rename = "world_name", default)]
    pub world: String,

    #[serde(rename = "class_name", default)]
    pub class: String,

    #[serde(rename = "sub_class_name", default)]
    pub sub_class: String,

    #[serde(rename = "character_level", default)]
    pub level: u32,

    #[serde(rename = "character_exp", default)]
    pub exp: u64,

    #[serde(rename = "character_popularity", default)]
    pub popularity: i64,

    #[serde(rename = "character_guildname", default)]
    pub guild_name: Option<String>,

    #[serde(default)]
    pub date: Option<String>,
}

/// One page of a leaderboard, in rank order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RankingPage {
    #[serde(rename = "ranking", default)]
    pub entries: Vec<RankingEntry>,
}

impl RankingPage {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Request for one overall ranking page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingQuery {
    /// Leaderboard day; defaults to [`default_ranking_date`]
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub world: Option<String>,
    /// Upstream class filter, e.g. "전사-히어로"
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

impl Default for RankingQuery {
    fn default() -> Self {
        Self {
            date: None,
            world: None,
            class: None,
            page: first_page(),
        }
    }
}

impl RankingQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn to_params(&self, now: DateTime<Utc>) -> Params {
        let date = self.date.unwrap_or_else(|| default_ranking_date(now));

        let mut params = Params::new();
        params.insert("date".into(), date.format("%Y-%m-%d").to_string());
        params.insert("page".into(), self.page.max(1).to_string());
        if let Some(world) = &self.world {
            params.insert("world_name".into(), world.clone());
        }
        if let Some(class) = &self.class {
            params.insert("class".into(), class.clone());
        }
        params
    }
}

/// Arguments of a ranking position search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSearch {
    /// Exact, case-sensitive character name
    pub name: String,
    /// Restrict to one world's leaderboard
    #[serde(default)]
    pub world: Option<String>,
    /// Must equal the entry's class or sub-class
    #[serde(default)]
    pub class: Option<String>,
    /// Page budget, `1..=MAX_PAGE_BUDGET`
    pub max_pages: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl RankingSearch {
    pub fn new(name: impl Into<String>, max_pages: u32) -> Self {
        Self {
            name: name.into(),
            world: None,
            class: None,
            max_pages,
            date: None,
        }
    }

    pub fn world(mut self, world: impl Into<String>) -> Self {
        self.world = Some(world.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::InvalidArgument("name must not be empty".into()));
        }
        if self.max_pages == 0 || self.max_pages > MAX_PAGE_BUDGET {
            return Err(EngineError::InvalidArgument(format!(
                "max_pages must be within 1..={}, got {}",
                MAX_PAGE_BUDGET, self.max_pages
            )));
        }
        Ok(())
    }

    /// Leaderboard request for page `page` of this search.
    ///
    /// The world is narrowed upstream; the class is only matched locally.
    pub fn page_query(&self, page: u32) -> RankingQuery {
        RankingQuery {
            date: self.date,
            world: self.world.clone(),
            class: None,
            page,
        }
    }

    pub fn matches(&self, entry: &RankingEntry) -> bool {
        if entry.name != self.name {
            return false;
        }
        if let Some(world) = &self.world {
            if &entry.world != world {
                return false;
            }
        }
        if let Some(class) = &self.class {
            if &entry.class != class && &entry.sub_class != class {
                return false;
            }
        }
        true
    }
}

/// Outcome of a ranking position search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingSearchResult {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<RankingEntry>,
    pub searched_pages: u32,
}

impl RankingSearchResult {
    pub fn found(entry: RankingEntry, searched_pages: u32) -> Self {
        Self {
            found: true,
            position: Some(entry.rank),
            entry: Some(entry),
            searched_pages,
        }
    }

    pub fn not_found(searched_pages: u32) -> Self {
        Self {
            found: false,
            position: None,
            entry: None,
            searched_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry(rank: u32, name: &str, world: &str, class: &str, sub_class: &str) -> RankingEntry {
        RankingEntry {
            rank,
            name: name.into(),
            world: world.into(),
            class: class.into(),
            sub_class: sub_class.into(),
            level: 280,
            exp: 0,
            popularity: 0,
            guild_name: None,
            date: None,
        }
    }

    #[test]
    fn test_default_date_uses_kst() {
        // 2024-03-10 16:00 UTC is already 2024-03-11 01:00 in KST
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 16, 0, 0).unwrap();
        assert_eq!(default_ranking_date(now), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap();
        assert_eq!(default_ranking_date(now), NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    }

    #[test]
    fn test_page_from_upstream_json() {
        let page: RankingPage = serde_json::from_value(json!({
            "ranking": [{
                "date": "2024-03-10",
                "ranking": 1,
                "character_name": "KissBot",
                "character_level": 296,
                "character_exp": 123,
                "class_name": "전사",
                "sub_class_name": "히어로",
                "character_popularity": 42,
                "character_guildname": "KissGuild",
                "world_name": "스카니아"
            }]
        }))
        .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page.entries[0].rank, 1);
        assert_eq!(page.entries[0].sub_class, "히어로");

        let empty: RankingPage = serde_json::from_value(json!({ "ranking": [] })).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_query_params() {
        let query = RankingQuery {
            date: NaiveDate::from_ymd_opt(2024, 3, 10),
            world: Some("루나".into()),
            class: None,
            page: 3,
        };
        let params = query.to_params(Utc::now());
        assert_eq!(params.get("date").map(String::as_str), Some("2024-03-10"));
        assert_eq!(params.get("page").map(String::as_str), Some("3"));
        assert_eq!(params.get("world_name").map(String::as_str), Some("루나"));
        assert!(!params.contains_key("class"));
    }

    #[test]
    fn test_validate_page_budget() {
        assert!(RankingSearch::new("KissBot", 1).validate().is_ok());
        assert!(RankingSearch::new("KissBot", MAX_PAGE_BUDGET).validate().is_ok());
        assert!(RankingSearch::new("KissBot", 0).validate().is_err());
        assert!(RankingSearch::new("KissBot", MAX_PAGE_BUDGET + 1).validate().is_err());
        assert!(RankingSearch::new("   ", 5).validate().is_err());
    }

    #[test]
    fn test_matches_is_exact_and_case_sensitive() {
        let search = RankingSearch::new("Target", 5);
        assert!(search.matches(&entry(1, "Target", "루나", "전사", "히어로")));
        assert!(!search.matches(&entry(1, "target", "루나", "전사", "히어로")));
        assert!(!search.matches(&entry(1, "Target2", "루나", "전사", "히어로")));
    }

    #[test]
    fn test_matches_filters() {
        let target = entry(7, "Target", "루나", "전사", "히어로");

        assert!(RankingSearch::new("Target", 5).world("루나").matches(&target));
        assert!(!RankingSearch::new("Target", 5).world("스카니아").matches(&target));
        assert!(RankingSearch::new("Target", 5).class("히어로").matches(&target));
        assert!(RankingSearch::new("Target", 5).class("전사").matches(&target));
        assert!(!RankingSearch::new("Target", 5).class("팔라딘").matches(&target));
    }

    #[test]
    fn test_page_query_forwards_world_only() {
        let search = RankingSearch::new("Target", 5).world("루나").class("히어로");
        let query = search.page_query(4);
        assert_eq!(query.page, 4);
        assert_eq!(query.world.as_deref(), Some("루나"));
        assert_eq!(query.class, None);
    }
}
