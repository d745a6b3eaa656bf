//! End-to-end runs of the orchestrator over small in-memory datasets.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use data_loader::{DataIndex, Movie, MovieId, Rating, User, UserId};
use pipeline::{PipelineConfig, Recommendation, Scorer, similarity};
use recommender::{PipelineOutcome, RecommendError, RecommendationOrchestrator};
use tokio_util::sync::CancellationToken;

fn movie(id: MovieId, title: &str) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        genres: vec![],
    }
}

fn rating(user_id: UserId, movie_id: MovieId, rating: f32) -> Rating {
    Rating {
        user_id,
        movie_id,
        rating,
        timestamp: 0,
    }
}

/// Every user skips about a quarter of the catalog; a movie's rating depends
/// only on its id, so some movies are liked across the board and some are not
fn synthetic_index(users: u32, movies: u32) -> Arc<DataIndex> {
    let catalog = (1..=movies).map(|id| movie(id, &format!("Movie {}", id))).collect();
    let ratings = (1..=users)
        .flat_map(|u| {
            (1..=movies)
                .filter(move |m| (m * 7 + u * 3) % 4 != 0)
                .map(move |m| rating(u, m, ((m * 13 + u * 5) % 5 + 1) as f32))
        })
        .collect();
    Arc::new(DataIndex::from_parts(catalog, ratings, 3.5))
}

fn triples(recs: &[Recommendation]) -> HashSet<(MovieId, u64, usize)> {
    recs.iter()
        .map(|r| (r.movie_id, r.score.to_bits(), r.n_users))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_surfaced_records_respect_invariants() {
    let index = synthetic_index(60, 80);
    let config = PipelineConfig::default().with_min_likers(10).with_top_n(15);
    let orchestrator = RecommendationOrchestrator::new(index.clone(), config);

    for user_id in [1, 17, 42] {
        let report = orchestrator.get_recommendations(user_id).await.unwrap();
        let recs = report.outcome.recommendations();
        let target = index.get_user(user_id).unwrap();

        assert!(!recs.is_empty());
        assert!(recs.len() <= 15);
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));

        for rec in recs {
            assert_eq!(rec.user_id, user_id);
            assert!(!target.liked.contains(&rec.movie_id));
            assert!(!target.not_liked.contains(&rec.movie_id));
            assert!(index.popularity().like_count(rec.movie_id) >= 10);
            assert_eq!(rec.n_users, index.popularity().like_count(rec.movie_id));
            assert!((0.0..=1.0).contains(&rec.score));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_runs_are_idempotent() {
    let index = synthetic_index(60, 80);
    let orchestrator =
        RecommendationOrchestrator::new(index, PipelineConfig::default().with_min_likers(5));

    let first = orchestrator.get_recommendations(3).await.unwrap();
    let second = orchestrator.get_recommendations(3).await.unwrap();

    assert_eq!(
        triples(first.outcome.recommendations()),
        triples(second.outcome.recommendations())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_size_does_not_change_results() {
    let index = synthetic_index(40, 60);
    let base = PipelineConfig::default().with_min_likers(5);

    let single = RecommendationOrchestrator::new(index.clone(), base.clone().with_scorer_workers(1))
        .get_recommendations(9)
        .await
        .unwrap();
    let pooled = RecommendationOrchestrator::new(index, base.with_scorer_workers(8))
        .get_recommendations(9)
        .await
        .unwrap();

    assert_eq!(single.outcome, pooled.outcome);
}

#[tokio::test]
async fn test_seen_filter_runs_before_popularity_filter() {
    // catalog {1:A, 2:B, 3:C}; user 1 likes 2 and 3, users 2..=12 like 3
    let mut ratings = vec![rating(1, 2, 4.0), rating(1, 3, 4.0)];
    for user_id in 2..=12 {
        ratings.push(rating(user_id, 3, 4.0));
    }
    let index = Arc::new(DataIndex::from_parts(
        vec![movie(1, "A"), movie(2, "B"), movie(3, "C")],
        ratings,
        3.5,
    ));
    let orchestrator =
        RecommendationOrchestrator::new(index, PipelineConfig::default().with_min_likers(2));

    let report = orchestrator.get_recommendations(1).await.unwrap();

    // 3 is popular but seen; 2 is seen and has a single liker; 1 has none
    assert_eq!(report.outcome, PipelineOutcome::Completed(vec![]));

    // from user 2's point of view, 2 has a single liker and stays out too
    let report = orchestrator.get_recommendations(2).await.unwrap();
    assert!(report.outcome.recommendations().is_empty());
}

#[tokio::test]
async fn test_target_without_ratings_sees_every_popular_movie() {
    let mut users: Vec<User> = (2..=5)
        .map(|id| User {
            id,
            liked: [10, 20].into_iter().collect(),
            not_liked: [30].into_iter().collect(),
        })
        .collect();
    users.push(User::new(1));

    let index = Arc::new(DataIndex::from_users(
        vec![movie(10, "X"), movie(20, "Y"), movie(30, "Z")],
        users,
    ));
    let orchestrator =
        RecommendationOrchestrator::new(index, PipelineConfig::default().with_min_likers(4));

    let report = orchestrator.get_recommendations(1).await.unwrap();
    let recs = report.outcome.recommendations();

    // 30 was never liked; agreement with an empty profile is always zero
    let ids: Vec<_> = recs.iter().map(|r| r.movie_id).collect();
    assert_eq!(ids, vec![10, 20]);
    assert!(recs.iter().all(|r| r.score == 0.0 && r.n_users == 4));
}

#[test]
fn test_scorer_excludes_the_target_from_its_own_movie() {
    // movie 7 is liked by exactly K = 3 users, the target among them
    let index = Arc::new(DataIndex::from_parts(
        vec![movie(7, "Seven")],
        vec![
            rating(1, 7, 5.0),
            rating(1, 8, 1.0),
            rating(2, 7, 4.0),
            rating(2, 8, 1.0),
            rating(3, 7, 4.0),
        ],
        3.5,
    ));
    assert_eq!(index.popularity().like_count(7), 3);

    let scorer = Scorer::new(index.clone(), 1).unwrap();
    let scored = scorer.score(Recommendation::candidate(1, index.get_movie(7).unwrap()));

    let target = index.get_user(1).unwrap();
    let expected = (similarity(target, index.get_user(2).unwrap())
        + similarity(target, index.get_user(3).unwrap()))
        / 2.0;
    assert!((scored.score - expected).abs() < 1e-12);
    // a self-comparison would have pulled the mean up towards 1
    assert!(scored.score < 1.0);
}

#[tokio::test]
async fn test_unknown_user_does_no_work() {
    let orchestrator =
        RecommendationOrchestrator::new(synthetic_index(5, 5), PipelineConfig::default());

    let err = orchestrator.get_recommendations(777).await.unwrap_err();
    assert!(matches!(err, RecommendError::UserNotFound(777)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_cancels_the_run() {
    let index = synthetic_index(300, 3000);
    let config = PipelineConfig::default()
        .with_min_likers(1)
        .with_timeout(Some(Duration::ZERO));
    let orchestrator = RecommendationOrchestrator::new(index, config);

    let report = tokio::time::timeout(Duration::from_secs(10), orchestrator.get_recommendations(1))
        .await
        .expect("cancelled pipeline did not shut down")
        .unwrap();

    assert!(report.outcome.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abort_mid_run_shuts_down() {
    let index = synthetic_index(300, 3000);
    let orchestrator =
        RecommendationOrchestrator::new(index, PipelineConfig::default().with_min_likers(1));
    let cancel = CancellationToken::new();

    let run = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.get_recommendations_with_cancel(1, cancel).await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    cancel.cancel();

    let report = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("aborted pipeline did not shut down")
        .unwrap()
        .unwrap();

    // scoring 3000 candidates takes far longer than 5ms, so the abort lands mid-run
    assert_eq!(report.outcome, PipelineOutcome::Cancelled);
}
