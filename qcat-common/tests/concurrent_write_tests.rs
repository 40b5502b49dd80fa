//! Concurrent writes against an on-disk (WAL) catalog database
//!
//! Every task reads before it writes inside one transaction, so concurrent
//! commits force snapshot conflicts that have to be retried, not surfaced.

use qcat_common::db::{algorithms, associations, init_database, properties, tags};
use qcat_common::models::*;
use qcat_common::PageRequest;
use tempfile::TempDir;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_property_adds_all_succeed() {
    let temp = TempDir::new().unwrap();
    let pool = init_database(&temp.path().join("qcat.db")).await.unwrap();

    let alg = algorithms::create(&pool, &AlgorithmInput::new("alg1", AlgorithmKind::Classic))
        .await
        .unwrap();
    let property_type = properties::create_type(
        &pool,
        &ComputeResourcePropertyTypeInput {
            name: "qubits".to_string(),
            datatype: Datatype::Integer,
            description: None,
        },
    )
    .await
    .unwrap();
    let owner = PropertyOwner::Algorithm(alg.id);

    let mut join_set = JoinSet::new();
    for i in 0..200 {
        let pool = pool.clone();
        let input = ComputeResourcePropertyInput {
            value: i.to_string(),
            type_id: property_type.id,
        };
        join_set.spawn(async move { properties::add_property(&pool, owner, &input).await });
    }

    let mut failures = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        if let Err(e) = joined.expect("Task panicked") {
            failures.push(e.to_string());
        }
    }
    assert!(
        failures.is_empty(),
        "{} writes failed, first: {:?}",
        failures.len(),
        failures.first()
    );

    let page = properties::find_by_owner(&pool, owner, &PageRequest::new(0, 1))
        .await
        .unwrap();
    assert_eq!(page.page.total_elements, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_tag_links_all_succeed() {
    let temp = TempDir::new().unwrap();
    let pool = init_database(&temp.path().join("qcat.db")).await.unwrap();

    let alg = algorithms::create(&pool, &AlgorithmInput::new("alg1", AlgorithmKind::Classic))
        .await
        .unwrap();

    let mut join_set = JoinSet::new();
    for i in 0..50 {
        let pool = pool.clone();
        join_set.spawn(async move {
            let tag = Tag::new(format!("tag-{}", i), None);
            algorithms::link_tag(&pool, alg.id, &tag).await
        });
    }
    while let Some(joined) = join_set.join_next().await {
        joined.expect("Task panicked").expect("Tag link failed");
    }

    let linked = associations::fetch_linked(
        &pool,
        associations::Association::AlgorithmTag,
        associations::Direction::Forward,
        &alg.id.to_string(),
        &PageRequest::new(0, 1),
        tags::map_tag,
    )
    .await
    .unwrap();
    assert_eq!(linked.page.total_elements, 50);
}
