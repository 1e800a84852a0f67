use serde::{Deserialize, Serialize};

use crate::models::MovieCard;

/// Cards per row in the recommendation grid
pub const GRID_COLUMNS: usize = 4;

/// Genres offered by the genre filter
pub const FILTER_GENRES: [&str; 8] = [
    "Action",
    "Adventure",
    "Family",
    "Fantasy",
    "Science Fiction",
    "Drama",
    "Comedy",
    "Romance",
];

/// Ordering applied to content recommendations before display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Similarity rank
    #[default]
    Default,
    /// Rating, high to low
    Rating,
    /// Release year, newest first
    Year,
}

/// Splits a comma-separated genre list, dropping blanks
pub fn parse_genres(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Keeps cards whose genre string contains any selected genre, ignoring case
///
/// An empty selection keeps everything.
pub fn filter_by_genres(cards: Vec<MovieCard>, genres: &[String]) -> Vec<MovieCard> {
    if genres.is_empty() {
        return cards;
    }

    let wanted: Vec<String> = genres.iter().map(|g| g.to_lowercase()).collect();
    cards
        .into_iter()
        .filter(|card| {
            let available = card.details.genres.to_lowercase();
            wanted.iter().any(|g| available.contains(g.as_str()))
        })
        .collect()
}

/// Sorts cards in place; ties keep their current order
///
/// Ratings and years that do not parse (such as `N/A`) sort as 0.
pub fn sort_cards(cards: &mut [MovieCard], order: SortOrder) {
    match order {
        SortOrder::Default => {}
        SortOrder::Rating => {
            cards.sort_by(|a, b| rating_key(b).total_cmp(&rating_key(a)));
        }
        SortOrder::Year => {
            cards.sort_by_key(|card| std::cmp::Reverse(year_key(card)));
        }
    }
}

fn rating_key(card: &MovieCard) -> f64 {
    card.details.vote_average.trim().parse().unwrap_or(0.0)
}

fn year_key(card: &MovieCard) -> i32 {
    card.details.release_year.trim().parse().unwrap_or(0)
}

/// Lays items out in rows of `columns`
pub fn grid<T: Clone>(items: &[T], columns: usize) -> Vec<Vec<T>> {
    items.chunks(columns.max(1)).map(<[T]>::to_vec).collect()
}
