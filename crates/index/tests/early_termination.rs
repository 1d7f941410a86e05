//! Writer + sorting merge policy + collector, end to end on one core

use std::sync::Arc;

use index::{
    EarlyTerminationCollector, IndexWriter, IndexWriterConfig, PolicyArgs, PolicyLoader,
    ShardQuery, WRAPPED_PREFIX,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tc_core::{Document, FieldType, IndexSchema, Query, SortKey};

fn schema() -> Arc<IndexSchema> {
    Arc::new(IndexSchema::default().with_field("timestamp", FieldType::Long))
}

fn writer() -> IndexWriter {
    let _ = tracing_subscriber::fmt().try_init();
    let loader = Arc::new(PolicyLoader::default());
    let args = PolicyArgs::new()
        .with("class", "SortingMergePolicyFactory")
        .with(WRAPPED_PREFIX, "in")
        .with("in.class", "TieredMergePolicyFactory")
        .with("sort", "timestamp desc");
    let policy = loader.merge_policy_from_args(args, schema()).unwrap();
    IndexWriter::new(schema(), policy, IndexWriterConfig::default())
}

/// 10 commits of 10 docs, force-merged, then 2 more unmerged commits
fn populate(writer: &IndexWriter, rng: &mut StdRng) {
    let mut next: i64 = 0;
    let mut add_commits = |commits: usize| {
        for _ in 0..commits {
            for _ in 0..10 {
                let doc = Document::new(next.to_string())
                    .with_field("timestamp", rng.random_range(0..1_000_000i64))
                    .with_field("odd_l1", next % 2)
                    .with_field("quad_l1", next % 4);
                writer.add_document(doc).unwrap();
                next += 1;
            }
            writer.commit().unwrap();
        }
    };
    add_commits(10);
    writer.force_merge(1).unwrap();
    add_commits(2);
}

fn search(writer: &IndexWriter, query: &ShardQuery) -> index::ShardResult {
    EarlyTerminationCollector::new(query, "id").search(&writer.snapshot())
}

#[test]
fn early_termination_matches_full_scan_top_hits() {
    let writer = writer();
    let mut rng = StdRng::seed_from_u64(42);
    populate(&writer, &mut rng);

    let snapshot = writer.snapshot();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[0].len(), 100);
    assert!(snapshot[0].sort().is_some());

    let sort = SortKey::parse("timestamp desc").unwrap();
    for rows in [1, 5, 17] {
        let full = search(&writer, &ShardQuery::new(Query::All, sort.clone(), rows));
        let early = search(
            &writer,
            &ShardQuery {
                segment_terminate_early: true,
                ..ShardQuery::new(Query::All, sort.clone(), rows)
            },
        );

        assert_eq!(full.num_found, 120);
        assert!(early.terminated_early);
        assert!(early.num_found < 120);
        assert!(early.num_found >= rows);
        let full_ids: Vec<_> = full.hits.iter().map(|h| h.sort_values.clone()).collect();
        let early_ids: Vec<_> = early.hits.iter().map(|h| h.sort_values.clone()).collect();
        assert_eq!(full_ids, early_ids);
    }
}

#[test]
fn filtered_query_terminates_per_segment_match_count() {
    let writer = writer();
    let mut rng = StdRng::seed_from_u64(7);
    populate(&writer, &mut rng);

    let sort = SortKey::parse("timestamp desc").unwrap();
    let query = Query::parse("odd_l1:1").unwrap();
    let full = search(&writer, &ShardQuery::new(query.clone(), sort.clone(), 3));
    let early = search(
        &writer,
        &ShardQuery {
            segment_terminate_early: true,
            ..ShardQuery::new(query, sort, 3)
        },
    );

    assert_eq!(full.num_found, 60);
    assert!(early.terminated_early);
    // 3 from the merged segment, all 10 odd docs from the two flushed ones
    assert_eq!(early.num_found, 13);
    assert_eq!(full.hits[0].sort_values, early.hits[0].sort_values);
}
