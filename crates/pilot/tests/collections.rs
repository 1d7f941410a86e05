//! Collection admin against a running cluster

mod common;

use std::collections::HashMap;
use std::time::Duration;

use node::{CoreDescriptor, NodeError};
use pilot::{AsyncState, ClusterError, CreateCollection, NodeSet};
use search::SearchRequest;
use tc_core::Query;

use common::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn create_search_delete_and_recreate() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = start_cluster(2, dir.path()).await;
    create(&cluster, "X", 2, 1).await;

    let state = cluster.cluster_state().await;
    let collection = state.collection("X").unwrap();
    assert_eq!(collection.replica_count(), 2);
    assert_eq!(collection.leaders().len(), 2);
    // one replica per node
    assert_ne!(
        collection.slices[0].leader().unwrap().node,
        collection.slices[1].leader().unwrap().node
    );

    let client = cluster.client();
    client.add("X", docs(0, 10, |n| n)).await.unwrap();
    client.commit("X").await.unwrap();
    let response = client.query("X", &SearchRequest::new(Query::All)).await.unwrap();
    assert_eq!(response.num_found, 10);

    cluster.delete_collection("X").await.unwrap();
    cluster
        .wait_for_collection_to_disappear("X", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(cluster.cluster_state().await.replica_count("X"), 0);
    for node in cluster.running_nodes().await {
        assert!(node.handle().core_names().is_empty());
    }

    create(&cluster, "X", 2, 1).await;
    let response = client.query("X", &SearchRequest::new(Query::All)).await.unwrap();
    assert_eq!(response.num_found, 0);
    assert!(!response.header.partial_results);
    cluster.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn coreless_collection_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = start_cluster(2, dir.path()).await;
    cluster
        .create_collection(
            CreateCollection::new("empty", CONFIG_SET, 2, 1).with_node_set(NodeSet::Empty),
        )
        .await
        .unwrap();

    let state = cluster.cluster_state().await;
    let collection = state.collection("empty").unwrap();
    assert_eq!(collection.shard_count(), 2);
    assert!(collection.is_empty());
    assert!(collection.leaders().is_empty());

    let response = cluster
        .client()
        .query("empty", &SearchRequest::new(Query::All))
        .await
        .unwrap();
    assert_eq!(response.num_found, 0);
    assert!(response.header.partial_results);

    cluster.delete_collection("empty").await.unwrap();
    assert!(cluster.cluster_state().await.collection("empty").is_none());
    cluster.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn async_create_reports_through_status_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = start_cluster(2, dir.path()).await;

    cluster
        .create_collection(CreateCollection::new("events", CONFIG_SET, 2, 2).with_async_id("1001"))
        .await
        .unwrap();
    let status = cluster
        .async_status("1001", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(status, AsyncState::Completed);
    assert_eq!(cluster.cluster_state().await.replica_count("events"), 4);

    assert!(matches!(
        cluster
            .create_collection(CreateCollection::new("other", CONFIG_SET, 1, 1).with_async_id("1001"))
            .await,
        Err(ClusterError::AsyncIdExists(_))
    ));

    cluster
        .create_collection(CreateCollection::new("broken", "missing", 1, 1).with_async_id("1002"))
        .await
        .unwrap();
    let status = cluster
        .async_status("1002", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(status, AsyncState::Failed("Config set missing not found".to_string()));
    cluster.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn create_rejects_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = start_cluster(1, dir.path()).await;
    create(&cluster, "events", 1, 1).await;

    assert!(matches!(
        cluster
            .create_collection(CreateCollection::new("events", CONFIG_SET, 1, 1))
            .await,
        Err(ClusterError::CollectionExists(_))
    ));
    assert!(matches!(
        cluster
            .create_collection(CreateCollection::new("other", "missing", 1, 1))
            .await,
        Err(ClusterError::ConfigSetNotFound(_))
    ));
    assert!(matches!(
        cluster
            .create_collection(
                CreateCollection::new("other", CONFIG_SET, 1, 1)
                    .with_node_set(NodeSet::Nodes(vec!["nowhere:1_search".to_string()]))
            )
            .await,
        Err(ClusterError::NodeNotFound(_))
    ));
    assert!(matches!(
        cluster.delete_collection("unknown").await,
        Err(ClusterError::CollectionNotFound(_))
    ));
    cluster.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn explicit_node_set_limits_placement() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = start_cluster(3, dir.path()).await;
    let target = cluster.nodes().await[2].name().to_string();

    cluster
        .create_collection(
            CreateCollection::new("pinned", CONFIG_SET, 2, 1)
                .with_node_set(NodeSet::Nodes(vec![target.clone()])),
        )
        .await
        .unwrap();
    let state = cluster.cluster_state().await;
    assert_eq!(state.replicas_on(&target).len(), 2);
    assert_eq!(state.replica_count("pinned"), 2);
    cluster.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn updates_reach_every_replica() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = start_cluster(3, dir.path()).await;
    create(&cluster, "events", 1, 3).await;
    let client = cluster.client();
    client.add("events", docs(0, 12, |n| n)).await.unwrap();
    client.commit("events").await.unwrap();

    let state = cluster.cluster_state().await;
    for node in cluster.running_nodes().await {
        for (_, _, replica) in state.replicas_on(node.name()) {
            assert_eq!(node.handle().core(&replica.core).unwrap().num_docs(), 12);
        }
    }
    cluster.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_replica_removes_partial_collection() {
    let dir = tempfile::tempdir().unwrap();
    let cluster = start_cluster(1, dir.path()).await;
    let node = cluster.nodes().await[0].handle().clone();

    // squat on the core name the second replica will ask for
    let squatter = "pinned_shard2_replica_n2";
    node.create_core(
        CoreDescriptor {
            name: squatter.to_string(),
            collection: "other".to_string(),
            shard: "shard1".to_string(),
            replica: "core_node1".to_string(),
            config_set: CONFIG_SET.to_string(),
            properties: HashMap::new(),
        },
        sorted_config_set(),
    )
    .await
    .unwrap();

    let err = cluster
        .create_collection(CreateCollection::new("pinned", CONFIG_SET, 2, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClusterError::Node(NodeError::CoreExists(_))));
    assert!(cluster.cluster_state().await.collection("pinned").is_none());
    // the first replica's core is gone, the squatter is untouched
    assert_eq!(node.core_names(), vec![squatter.to_string()]);

    node.unload_core(squatter).await.unwrap();
    create(&cluster, "pinned", 2, 1).await;
    assert_eq!(cluster.cluster_state().await.replica_count("pinned"), 2);
    cluster.shutdown().await.unwrap();
}
