use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;

use crate::search::{search_concerts, ConcertResult};
use crate::state::AppState;

/// First `q` wins when the parameter is repeated.
fn first_query(params: Vec<(String, String)>) -> String {
    params
        .into_iter()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value)
        .unwrap_or_default()
}

/// Public and unauthenticated. Always answers 200 with a bare array.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<Vec<ConcertResult>> {
    let query = first_query(params);
    let results = search_concerts(state.events.as_ref(), &query, Utc::now().date_naive()).await;
    Json(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn repeated_q_takes_the_first() {
        assert_eq!(first_query(pairs(&[("q", "dotan"), ("q", "other")])), "dotan");
        assert_eq!(first_query(pairs(&[("page", "2"), ("q", "x")])), "x");
        assert_eq!(first_query(Vec::new()), "");
    }
}
