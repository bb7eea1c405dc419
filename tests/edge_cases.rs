use geocell::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn backends() -> Vec<Box<dyn SpatialIndex>> {
    [
        (StrategyKind::Geohash, 5),
        (StrategyKind::H3, 6),
        (StrategyKind::S2, 10),
        (StrategyKind::TreeOnly, 0),
    ]
    .into_iter()
    .map(|(kind, resolution)| {
        IndexBuilder::new()
            .strategy(kind)
            .resolution(resolution)
            .build()
            .unwrap()
    })
    .collect()
}

#[test]
fn test_empty_source() {
    init_logging();
    let source = MemorySource::new();

    for mut index in backends() {
        let stats = index.build(&source).unwrap();
        assert_eq!(stats.features_seen, 0);
        assert_eq!(stats.features_indexed, 0);
        assert_eq!(stats.cells, 0);

        let hits = index
            .query(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), &QueryOptions::default())
            .unwrap();
        assert!(hits.is_empty(), "{}", index.kind());
    }
}

#[test]
fn test_features_without_geometry_are_counted() {
    init_logging();
    let mut source = MemorySource::new();
    for id in 0..5 {
        source.push_empty(id);
    }
    source.push(10, BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0));
    source.push(11, BoundingBox::new(0.0, 0.0, f64::INFINITY, 1.0));

    for mut index in backends() {
        let stats = index.build(&source).unwrap();
        assert_eq!(stats.features_seen, 7);
        assert_eq!(stats.features_indexed, 0);
        assert_eq!(stats.skipped_missing_geometry, 5);
        assert_eq!(stats.skipped_invalid_bounds, 2);

        let snapshot = index.snapshot().unwrap();
        assert_eq!(snapshot.feature_count(), 7);
        assert_eq!(snapshot.skipped(), 7);
        assert!(snapshot.bounds().is_empty());
    }
}

#[test]
fn test_point_features() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(100.9, 25.6, 100.9, 25.6));
    source.push(2, BoundingBox::new(100.95, 25.65, 100.95, 25.65));

    for mut index in backends() {
        index.build(&source).unwrap();
        let kind = index.kind();

        let same_point = index
            .query(&BoundingBox::new(100.9, 25.6, 100.9, 25.6), &QueryOptions::default())
            .unwrap();
        assert_eq!(same_point, [1].into_iter().collect(), "{kind}");

        let around_both = index
            .query(&BoundingBox::new(100.8, 25.5, 101.0, 25.7), &QueryOptions::default())
            .unwrap();
        assert_eq!(around_both, [1, 2].into_iter().collect(), "{kind}");
    }
}

#[test]
fn test_touching_edges_overlap() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0));

    for mut index in backends() {
        index.build(&source).unwrap();
        let kind = index.kind();

        let edge = index
            .query(&BoundingBox::new(1.0, 0.25, 1.5, 0.75), &QueryOptions::default())
            .unwrap();
        assert_eq!(edge, [1].into_iter().collect(), "{kind}");

        let corner = index
            .query(&BoundingBox::new(1.0, 1.0, 1.2, 1.2), &QueryOptions::default())
            .unwrap();
        assert_eq!(corner, [1].into_iter().collect(), "{kind}");
    }
}

#[test]
fn test_distant_query_is_empty() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(100.0, 25.0, 100.5, 25.5));

    for mut index in backends() {
        index.build(&source).unwrap();
        let hits = index
            .query(&BoundingBox::new(-74.1, 40.6, -73.9, 40.8), &QueryOptions::default())
            .unwrap();
        assert!(hits.is_empty(), "{}", index.kind());
    }
}

#[test]
fn test_whole_world_query() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(100.0, 25.0, 100.5, 25.5));
    source.push(2, BoundingBox::new(-74.1, 40.6, -73.9, 40.8));
    source.push(3, BoundingBox::new(151.1, -33.9, 151.3, -33.8));
    let world = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);

    let mut tree = RTreeIndex::rtree().unwrap();
    tree.build(&source).unwrap();
    assert_eq!(
        tree.query(&world, &QueryOptions::default()).unwrap(),
        [1, 2, 3].into_iter().collect()
    );

    // Coarse query levels keep the covering small enough
    let mut s2 = IndexBuilder::new()
        .strategy(StrategyKind::S2)
        .resolution(12)
        .level_policy(LevelPolicy::Auto)
        .build()
        .unwrap();
    s2.build(&source).unwrap();
    assert_eq!(
        s2.query(&world, &QueryOptions::default()).unwrap(),
        [1, 2, 3].into_iter().collect()
    );

    // At a fixed fine level the same query exceeds an explicit cap
    let mut exact = IndexBuilder::new()
        .strategy(StrategyKind::S2)
        .resolution(12)
        .max_cells(1 << 20)
        .build()
        .unwrap();
    exact.build(&source).unwrap();
    assert!(matches!(
        exact.query(&world, &QueryOptions::default()),
        Err(GeocellError::CoveringTooLarge { .. })
    ));
}

#[test]
fn test_covering_limit_fails_build_and_keeps_previous_snapshot() {
    init_logging();
    let mut small = MemorySource::new();
    small.push(1, BoundingBox::new(10.0, 10.0, 10.01, 10.01));

    let mut index = IndexBuilder::new()
        .strategy(StrategyKind::H3)
        .resolution(7)
        .max_cells(10)
        .build()
        .unwrap();
    index.build(&small).unwrap();
    let before = index.snapshot().unwrap();

    let mut large = MemorySource::new();
    large.push(1, BoundingBox::new(10.0, 10.0, 10.01, 10.01));
    large.push(2, BoundingBox::new(20.0, 20.0, 21.0, 21.0));

    assert!(matches!(
        index.build(&large),
        Err(GeocellError::CoveringTooLarge { limit: 10, .. })
    ));

    let after = index.snapshot().unwrap();
    assert!(std::sync::Arc::ptr_eq(&before, &after));
    assert_eq!(after.bounds().len(), 1);
}

#[test]
fn test_duplicate_ids_fail_the_build() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
    source.push(1, BoundingBox::new(5.0, 5.0, 6.0, 6.0));

    for mut index in backends() {
        assert!(
            matches!(index.build(&source), Err(GeocellError::DataSource(_))),
            "{}",
            index.kind()
        );
        assert!(!index.is_built());
    }
}

#[test]
fn test_out_of_range_coordinates() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(179.5, 0.0, 181.0, 1.0));

    let mut index = GeohashIndex::geohash(5).unwrap();
    assert!(matches!(
        index.build(&source),
        Err(GeocellError::InvalidInput(_))
    ));

    // Without cells the R-tree accepts any finite box
    let mut tree = RTreeIndex::rtree().unwrap();
    tree.build(&source).unwrap();
    assert_eq!(
        tree.query(&BoundingBox::new(180.5, 0.5, 182.0, 2.0), &QueryOptions::default())
            .unwrap(),
        [1].into_iter().collect()
    );
}

#[test]
fn test_non_finite_query_rejected() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0));

    for mut index in backends() {
        index.build(&source).unwrap();
        let result = index.query(
            &BoundingBox::new(0.0, f64::NAN, 1.0, 1.0),
            &QueryOptions::default(),
        );
        assert!(
            matches!(result, Err(GeocellError::InvalidInput(_))),
            "{}",
            index.kind()
        );
    }
}

#[test]
fn test_without_tree() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0));
    source.push(2, BoundingBox::new(5.0, 5.0, 6.0, 6.0));

    let mut index = IndexBuilder::new()
        .strategy(StrategyKind::H3)
        .resolution(5)
        .build_tree(false)
        .build()
        .unwrap();
    index.build(&source).unwrap();
    assert!(index.snapshot().unwrap().tree().is_none());

    let result = index
        .query_with_stats(&BoundingBox::new(0.0, 0.0, 2.0, 2.0), &QueryOptions::default())
        .unwrap();
    assert!(!result.stats.tree_used);
    assert_eq!(result.ids, [1].into_iter().collect());
}

#[test]
fn test_tree_only_ignores_build_tree_flag() {
    let mut source = MemorySource::new();
    source.push(1, BoundingBox::new(0.0, 0.0, 1.0, 1.0));

    let mut index = IndexBuilder::new()
        .strategy(StrategyKind::TreeOnly)
        .build_tree(false)
        .build()
        .unwrap();
    index.build(&source).unwrap();
    assert!(index.snapshot().unwrap().tree().is_some());
}
