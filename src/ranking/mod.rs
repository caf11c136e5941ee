//! Ranking position search over the paginated overall leaderboard.

use async_trait::async_trait;
use chrono::Utc;

use crate::core::{
    default_ranking_date, RankingPage, RankingQuery, RankingSearch, RankingSearchResult,
};
use crate::error::Result;

/// Source of leaderboard pages
#[async_trait]
pub trait RankingSource: Send + Sync {
    /// Fetch one page of the overall leaderboard
    async fn ranking_page(&self, query: &RankingQuery) -> Result<RankingPage>;
}

/// Scan pages `1..=max_pages` in order until an entry matches `search`.
///
/// Pages are fetched one at a time, all for the same leaderboard day: a
/// search without a date is pinned to [`default_ranking_date`] when it
/// starts. An empty page means the leaderboard ended and stops the scan; it
/// still counts as a searched page. Any page failure aborts the whole search.
pub async fn find_position<S>(source: &S, search: &RankingSearch) -> Result<RankingSearchResult>
where
    S: RankingSource + ?Sized,
{
    search.validate()?;

    let date = search.date.unwrap_or_else(|| default_ranking_date(Utc::now()));
    let search = &search.clone().date(date);

    for page in 1..=search.max_pages {
        let ranking = source.ranking_page(&search.page_query(page)).await?;

        if ranking.is_empty() {
            tracing::debug!("📭 Leaderboard ended at page {}", page);
            return Ok(RankingSearchResult::not_found(page));
        }

        if let Some(entry) = ranking.entries.into_iter().find(|e| search.matches(e)) {
            tracing::info!("🏆 Found {} at rank {} (page {})", entry.name, entry.rank, page);
            return Ok(RankingSearchResult::found(entry, page));
        }
    }

    tracing::debug!("'{}' not in the first {} pages", search.name, search.max_pages);
    Ok(RankingSearchResult::not_found(search.max_pages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RankingEntry;
    use crate::error::{EngineError, UpstreamError};
    use parking_lot::Mutex;

    fn entry(rank: u32, name: &str, world: &str, class: &str, sub_class: &str) -> RankingEntry {
        RankingEntry {
            rank,
            name: name.to_string(),
            world: world.to_string(),
            class: class.to_string(),
            sub_class: sub_class.to_string(),
            level: 280,
            exp: 0,
            popularity: 0,
            guild_name: None,
            date: None,
        }
    }

    /// In-memory leaderboard, `page_size` entries per page
    struct Board {
        entries: Vec<RankingEntry>,
        page_size: usize,
        fail_on: Option<u32>,
        requested: Mutex<Vec<RankingQuery>>,
    }

    impl Board {
        fn new(entries: Vec<RankingEntry>, page_size: usize) -> Self {
            Self { entries, page_size, fail_on: None, requested: Mutex::new(Vec::new()) }
        }

        fn pages_requested(&self) -> Vec<u32> {
            self.requested.lock().iter().map(|q| q.page).collect()
        }
    }

    #[async_trait]
    impl RankingSource for Board {
        async fn ranking_page(&self, query: &RankingQuery) -> Result<RankingPage> {
            self.requested.lock().push(query.clone());
            if self.fail_on == Some(query.page) {
                return Err(UpstreamError::fatal("Please input valid parameter")
                    .with_status(Some(400))
                    .into());
            }

            let start = (query.page as usize - 1) * self.page_size;
            let entries = self
                .entries
                .iter()
                .filter(|e| query.world.as_ref().map_or(true, |w| &e.world == w))
                .skip(start)
                .take(self.page_size)
                .cloned()
                .collect();
            Ok(RankingPage { entries })
        }
    }

    fn board() -> Board {
        Board::new(
            vec![
                entry(1, "Alpha", "스카니아", "전사", "히어로"),
                entry(2, "Bravo", "베라", "마법사", "비숍"),
                entry(3, "Charlie", "스카니아", "궁수", "보우마스터"),
                entry(4, "KissBot", "루나", "도적", "나이트로드"),
                entry(5, "kissbot", "스카니아", "해적", "바이퍼"),
                entry(6, "KissBot", "스카니아", "해적", "캡틴"),
            ],
            2,
        )
    }

    #[tokio::test]
    async fn test_found_on_second_page() {
        let board = board();
        let result = find_position(&board, &RankingSearch::new("Charlie", 5)).await.unwrap();

        assert!(result.found);
        assert_eq!(result.position, Some(3));
        assert_eq!(result.searched_pages, 2);
        assert_eq!(board.pages_requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_budget_of_one_page_is_respected() {
        let board = board();
        let result = find_position(&board, &RankingSearch::new("Charlie", 1)).await.unwrap();

        assert!(!result.found);
        assert_eq!(result.searched_pages, 1);
        assert_eq!(board.pages_requested(), vec![1]);
    }

    #[tokio::test]
    async fn test_name_match_is_exact_and_case_sensitive() {
        let board = board();
        let result = find_position(&board, &RankingSearch::new("kissbot", 3)).await.unwrap();
        assert_eq!(result.position, Some(5));

        let result = find_position(&board, &RankingSearch::new("Kiss", 3)).await.unwrap();
        assert!(!result.found);
    }

    #[tokio::test]
    async fn test_world_filter_narrows_upstream_query() {
        let board = board();
        let search = RankingSearch::new("KissBot", 5).world("스카니아");
        let result = find_position(&board, &search).await.unwrap();

        // 스카니아 board: Alpha, Charlie | kissbot, KissBot(6)
        assert_eq!(result.position, Some(6));
        assert_eq!(result.searched_pages, 2);
        assert!(board
            .requested
            .lock()
            .iter()
            .all(|q| q.world.as_deref() == Some("스카니아") && q.class.is_none()));
    }

    #[tokio::test]
    async fn test_class_filter_matches_class_or_sub_class() {
        let board = board();

        let by_sub_class = RankingSearch::new("KissBot", 5).class("캡틴");
        assert_eq!(find_position(&board, &by_sub_class).await.unwrap().position, Some(6));

        let by_class = RankingSearch::new("KissBot", 5).class("도적");
        assert_eq!(find_position(&board, &by_class).await.unwrap().position, Some(4));

        let no_match = RankingSearch::new("KissBot", 5).class("비숍");
        assert!(!find_position(&board, &no_match).await.unwrap().found);
    }

    #[tokio::test]
    async fn test_empty_page_ends_scan_early() {
        let board = board();
        let result = find_position(&board, &RankingSearch::new("Nobody", 20)).await.unwrap();

        assert!(!result.found);
        assert_eq!(result.searched_pages, 4);
        assert_eq!(board.pages_requested(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_undated_search_uses_one_day_for_every_page() {
        let board = board();
        find_position(&board, &RankingSearch::new("Nobody", 20)).await.unwrap();

        let dates: Vec<_> = board.requested.lock().iter().map(|q| q.date).collect();
        assert_eq!(dates.len(), 4);
        assert!(dates[0].is_some());
        assert!(dates.iter().all(|d| *d == dates[0]));
    }

    #[tokio::test]
    async fn test_explicit_date_is_kept() {
        let board = board();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        find_position(&board, &RankingSearch::new("Charlie", 5).date(date)).await.unwrap();

        assert!(board.requested.lock().iter().all(|q| q.date == Some(date)));
    }

    #[tokio::test]
    async fn test_page_failure_aborts_search() {
        let mut board = board();
        board.fail_on = Some(2);

        let err = find_position(&board, &RankingSearch::new("Nobody", 5)).await.unwrap_err();
        assert!(err.upstream().map_or(false, |e| e.is_fatal()));
        assert_eq!(board.pages_requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_invalid_budget_is_rejected_before_any_fetch() {
        let board = board();
        for max_pages in [0, 21] {
            let search = RankingSearch::new("Alpha", max_pages);
            let err = find_position(&board, &search).await.unwrap_err();
            assert!(matches!(err, EngineError::InvalidArgument(_)));
        }
        assert!(board.pages_requested().is_empty());
    }
}
