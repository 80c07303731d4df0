use matrix_util::knn_match::{CorrelationIndex, DEFAULT_EF_SEARCH};
use matrix_util::ranking::scaled_ranks;

#[test]
fn nearest_columns_are_most_correlated() -> anyhow::Result<()> {
    let profiles = [
        vec![1.0, 2.0, 3.0, 4.0, 5.0],
        vec![5.0, 4.0, 3.0, 2.0, 1.0],
        vec![1.0, 3.0, 2.0, 4.0, 5.0],
    ];
    let scaled: Vec<_> = profiles.iter().map(|x| scaled_ranks(x)).collect();
    let views: Vec<_> = scaled.iter().map(|x| x.view()).collect();
    let index = CorrelationIndex::from_column_views(&views);
    assert_eq!(index.len(), 3);

    let query = scaled_ranks(&[0.1, 0.2, 0.3, 0.4, 0.5]);
    let nearest = index.search_nearest(&query, 3);
    assert_eq!(nearest.len(), 3);
    assert_eq!(nearest[0], 0);
    assert_eq!(nearest[2], 1);

    let r = scaled[nearest[0]].dot(&query);
    approx::assert_abs_diff_eq!(r, 1.0, epsilon = 1e-5);
    Ok(())
}

#[test]
fn random_profiles_find_their_best_match() -> anyhow::Result<()> {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    let mut rng = SmallRng::seed_from_u64(7);
    let noise = Normal::new(0.0f32, 1.0)?;

    // no more profiles than search candidates, so the walk is exhaustive
    let scaled: Vec<_> = (0..DEFAULT_EF_SEARCH)
        .map(|_| {
            let x: Vec<f32> = (0..30).map(|_| noise.sample(&mut rng)).collect();
            scaled_ranks(&x)
        })
        .collect();
    let views: Vec<_> = scaled.iter().map(|x| x.view()).collect();
    let index = CorrelationIndex::from_column_views(&views);

    for _ in 0..10 {
        let x: Vec<f32> = (0..30).map(|_| noise.sample(&mut rng)).collect();
        let query = scaled_ranks(&x);

        let best = (0..index.len())
            .max_by(|&a, &b| {
                let ra = scaled[a].dot(&query);
                let rb = scaled[b].dot(&query);
                ra.total_cmp(&rb)
            })
            .unwrap();

        let nearest = index.search_nearest(&query, 5);
        assert_eq!(nearest.len(), 5);
        assert_eq!(nearest[0], best);
    }
    Ok(())
}
