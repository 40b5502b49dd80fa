//! End-to-end catalog behaviour across aggregates
//!
//! Each test opens its own in-memory database.

use qcat_common::db::associations::{self, Association, Direction};
use qcat_common::db::{
    algorithms, discussions, implementations, init_memory_database, lookups, patterns,
    platforms, problem_types, properties, relations, tags,
};
use qcat_common::models::*;
use qcat_common::{Error, PageRequest};
use sqlx::SqlitePool;
use uuid::Uuid;

async fn classic(pool: &SqlitePool, name: &str) -> Algorithm {
    algorithms::create(pool, &AlgorithmInput::new(name, AlgorithmKind::Classic))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_tag_links_visible_from_both_sides() {
    let pool = init_memory_database().await.unwrap();
    let alg = classic(&pool, "alg1").await;
    let implementation = implementations::create(&pool, alg.id, &ImplementationInput::new("impl1"))
        .await
        .unwrap();

    algorithms::link_tag(&pool, alg.id, &Tag::new("search", None))
        .await
        .unwrap();
    implementations::link_tag(&pool, alg.id, implementation.id, &Tag::new("search", None))
        .await
        .unwrap();

    let algorithm_tags = associations::fetch_linked(
        &pool,
        Association::AlgorithmTag,
        Direction::Forward,
        &alg.id.to_string(),
        &PageRequest::default(),
        |row| Ok(sqlx::Row::try_get::<String, _>(row, "value")?),
    )
    .await
    .unwrap();
    assert_eq!(algorithm_tags.content, vec!["search"]);

    let tagged_algorithms = tags::find_algorithms(&pool, "search", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(tagged_algorithms.content[0].id, alg.id);

    let tagged_implementations =
        tags::find_implementations(&pool, "search", &PageRequest::default())
            .await
            .unwrap();
    assert_eq!(tagged_implementations.content[0].id, implementation.id);
}

#[tokio::test]
async fn test_platform_links_visible_from_both_sides() {
    let pool = init_memory_database().await.unwrap();
    let alg = classic(&pool, "alg1").await;
    let implementation = implementations::create(&pool, alg.id, &ImplementationInput::new("impl1"))
        .await
        .unwrap();
    let platform = platforms::create_platform(&pool, &SoftwarePlatformInput::new("Qiskit"))
        .await
        .unwrap();

    associations::link(
        &pool,
        Association::ImplementationSoftwarePlatform,
        &implementation.id.to_string(),
        &platform.id.to_string(),
    )
    .await
    .unwrap();

    let on_platform =
        platforms::find_platform_implementations(&pool, platform.id, &PageRequest::default())
            .await
            .unwrap();
    assert_eq!(on_platform.content, vec![implementation.clone()]);

    associations::unlink(
        &pool,
        Association::ImplementationSoftwarePlatform,
        &implementation.id.to_string(),
        &platform.id.to_string(),
    )
    .await
    .unwrap();
    let on_platform =
        platforms::find_platform_implementations(&pool, platform.id, &PageRequest::default())
            .await
            .unwrap();
    assert!(on_platform.content.is_empty());
}

#[tokio::test]
async fn test_algorithm_delete_cascades_owned_rows_only() {
    let pool = init_memory_database().await.unwrap();
    let a = classic(&pool, "A").await;
    let b = classic(&pool, "B").await;

    let relation_type = relations::create_type(
        &pool,
        &AlgoRelationTypeInput {
            name: "generalizes".to_string(),
            inverse_type_name: None,
        },
    )
    .await
    .unwrap();
    relations::add_relation(
        &pool,
        a.id,
        &AlgorithmRelationInput {
            source_algorithm_id: a.id,
            target_algorithm_id: b.id,
            algo_relation_type_id: relation_type.id,
            description: None,
        },
    )
    .await
    .unwrap();

    let pattern_type = patterns::create_type(
        &pool,
        &PatternRelationTypeInput {
            name: "uses".to_string(),
        },
    )
    .await
    .unwrap();
    patterns::add_relation(
        &pool,
        a.id,
        &PatternRelationInput {
            pattern: "https://patterns.example.org/oracle".to_string(),
            pattern_relation_type_id: pattern_type.id,
            description: None,
        },
    )
    .await
    .unwrap();

    algorithms::link_tag(&pool, a.id, &Tag::new("kept", None)).await.unwrap();
    let problem_type = problem_types::create(&pool, &ProblemTypeInput::new("Factoring", None))
        .await
        .unwrap();
    associations::link(
        &pool,
        Association::AlgorithmProblemType,
        &a.id.to_string(),
        &problem_type.id.to_string(),
    )
    .await
    .unwrap();
    let area = lookups::create(
        &pool,
        lookups::Lookup::ApplicationArea,
        &NamedEntityInput::new("Cryptography"),
    )
    .await
    .unwrap();
    associations::link(
        &pool,
        Association::AlgorithmApplicationArea,
        &a.id.to_string(),
        &area.id.to_string(),
    )
    .await
    .unwrap();

    algorithms::delete(&pool, a.id).await.unwrap();

    assert!(matches!(
        algorithms::find_by_id(&pool, a.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
    let remaining = relations::find_by_algorithm(&pool, b.id, &PageRequest::default())
        .await
        .unwrap();
    assert!(remaining.content.is_empty());
    let pattern_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pattern_relations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(pattern_rows, 0);

    assert!(tags::find_by_value(&pool, "kept").await.is_ok());
    assert!(problem_types::find_by_id(&pool, problem_type.id).await.is_ok());
    assert!(lookups::find_by_id(&pool, lookups::Lookup::ApplicationArea, area.id)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_property_type_in_use_is_conflict() {
    let pool = init_memory_database().await.unwrap();
    let resource = platforms::create_compute_resource(
        &pool,
        &ComputeResourceInput::new("ibmq_lima", ComputeResourceKind::Qpu),
    )
    .await
    .unwrap();
    let qubits = properties::create_type(
        &pool,
        &ComputeResourcePropertyTypeInput {
            name: "qubits".to_string(),
            datatype: Datatype::Integer,
            description: None,
        },
    )
    .await
    .unwrap();

    properties::add_property(
        &pool,
        PropertyOwner::ComputeResource(resource.id),
        &ComputeResourcePropertyInput {
            value: "5".to_string(),
            type_id: qubits.id,
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        properties::delete_type(&pool, qubits.id).await.unwrap_err(),
        Error::Conflict(_)
    ));
}

#[tokio::test]
async fn test_pagination_edges() {
    let pool = init_memory_database().await.unwrap();
    for name in ["a", "b", "c"] {
        classic(&pool, name).await;
    }

    let none = algorithms::find_all(&pool, &PageRequest::default().with_search("zzz"))
        .await
        .unwrap();
    assert!(none.content.is_empty());
    assert_eq!(none.page.total_elements, 0);

    let short = algorithms::find_all(&pool, &PageRequest::new(0, 10)).await.unwrap();
    assert_eq!(short.content.len(), 3);
    assert_eq!(short.page.total_pages, 1);

    let past_end = algorithms::find_all(&pool, &PageRequest::new(5, 10)).await.unwrap();
    assert!(past_end.content.is_empty());
    assert_eq!(past_end.page.number, 5);
    assert_eq!(past_end.page.total_elements, 3);
}

#[tokio::test]
async fn test_search_escapes_wildcards() {
    let pool = init_memory_database().await.unwrap();
    classic(&pool, "100% classical").await;
    classic(&pool, "1000 qubits").await;

    let page = algorithms::find_all(&pool, &PageRequest::default().with_search("100%"))
        .await
        .unwrap();
    assert_eq!(page.page.total_elements, 1);
    assert_eq!(page.content[0].name, "100% classical");
}

#[tokio::test]
async fn test_discussion_comment_paging() {
    let pool = init_memory_database().await.unwrap();
    let topic = discussions::create_topic(
        &pool,
        &DiscussionTopicInput::new("Error mitigation", TopicStatus::Open),
    )
    .await
    .unwrap();
    let first = discussions::create_comment(&pool, topic.id, &DiscussionCommentInput::new("first"))
        .await
        .unwrap();
    discussions::create_comment(
        &pool,
        topic.id,
        &DiscussionCommentInput::new("reply").replying_to(first.id),
    )
    .await
    .unwrap();

    let page = discussions::find_comments(&pool, topic.id, &PageRequest::new(0, 1))
        .await
        .unwrap();
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.page.total_elements, 2);
}

#[tokio::test]
async fn test_unlink_requires_existing_entities() {
    let pool = init_memory_database().await.unwrap();
    let alg = classic(&pool, "alg1").await;

    let err = associations::unlink(
        &pool,
        Association::AlgorithmPublication,
        &alg.id.to_string(),
        &Uuid::new_v4().to_string(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
