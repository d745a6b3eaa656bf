//! Last stage: drain the scored stream and keep the best N.

use crate::channel::StageReceiver;
use crate::types::Recommendation;
use std::cmp::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Drain `input` until every producer is done, then rank and truncate.
///
/// Returns `None` if the run is cancelled before the stream ends; partial
/// results are never returned.
pub async fn collect(
    input: StageReceiver,
    top_n: usize,
    cancel: CancellationToken,
) -> Option<Vec<Recommendation>> {
    let mut scored = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Collector cancelled after {} records", scored.len());
                return None;
            }
            msg = input.recv() => match msg {
                Ok(rec) => scored.push(rec),
                Err(_) => break,
            },
        }
    }

    debug!("Collector drained {} records", scored.len());
    Some(select_top(scored, top_n))
}

/// Highest score first; equal scores fall back to ascending movie id so the
/// result does not depend on which scorer worker finished first.
pub fn rank(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.movie_id.cmp(&b.movie_id))
}

/// Sort with [`rank`] and keep at most `top_n` records
pub fn select_top(mut recs: Vec<Recommendation>, top_n: usize) -> Vec<Recommendation> {
    recs.sort_by(rank);
    recs.truncate(top_n);
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::stage_channel;

    fn rec(movie_id: u32, score: f64) -> Recommendation {
        Recommendation {
            user_id: 1,
            movie_id,
            movie_title: format!("Movie {}", movie_id),
            score,
            n_users: 10,
        }
    }

    #[test]
    fn test_select_top_sorts_descending() {
        let top = select_top(vec![rec(1, 0.1), rec(2, 0.9), rec(3, 0.5)], 10);
        let ids: Vec<_> = top.iter().map(|r| r.movie_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_select_top_truncates() {
        let recs = (1..=30).map(|id| rec(id, id as f64 / 100.0)).collect();
        let top = select_top(recs, 20);

        assert_eq!(top.len(), 20);
        assert_eq!(top[0].movie_id, 30);
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_break_on_movie_id() {
        let top = select_top(vec![rec(9, 0.5), rec(3, 0.5), rec(5, 0.7), rec(1, 0.5)], 3);
        let ids: Vec<_> = top.iter().map(|r| r.movie_id).collect();
        assert_eq!(ids, vec![5, 1, 3]);
    }

    #[test]
    fn test_fewer_than_n() {
        assert_eq!(select_top(vec![rec(1, 0.2)], 20).len(), 1);
        assert!(select_top(vec![], 20).is_empty());
    }

    #[tokio::test]
    async fn test_collect_drains_until_closed() {
        let (tx, rx) = stage_channel();
        let producer = tokio::spawn(async move {
            for id in 1..=5 {
                tx.send(rec(id, id as f64 / 10.0)).await.unwrap();
            }
        });

        let top = collect(rx, 3, CancellationToken::new()).await.unwrap();
        producer.await.unwrap();

        let ids: Vec<_> = top.iter().map(|r| r.movie_id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn test_collect_cancelled() {
        let (_tx, rx) = stage_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(collect(rx, 3, cancel).await.is_none());
    }
}
