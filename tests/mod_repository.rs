use bson::{Bson, doc};
use docugate::errors::AccessError;
use docugate::query::{
    CompareOp, FieldType, FilterNode, PageWindow, QueryDescription, SortKey, TypeDescriptor,
};
use docugate::repository::Repository;
use docugate::store::{Cancellation, DocumentStore, WriteConcern, cancel_pair};
use docugate::types::{IdType, ResourceMapping, TargetedFields};
use std::sync::Arc;

fn book_repository() -> (Arc<DocumentStore>, Repository) {
    let store = Arc::new(DocumentStore::new());
    let repository = Repository::new(
        &store,
        ResourceMapping::new("books", "books", "_id", IdType::Int),
        TypeDescriptor::new("books", "_id")
            .with_field("_id", FieldType::Int)
            .with_field("price", FieldType::Double)
            .with_field("name", FieldType::String)
            .with_relationship("author"),
    );
    (store, repository)
}

async fn seed_books(store: &Arc<DocumentStore>, rows: &[(i64, &str, f64)]) {
    let collection = store.collection("books").unwrap();
    for (id, name, price) in rows {
        collection
            .insert_one(
                doc! { "_id": *id, "name": *name, "price": *price },
                None,
                &Cancellation::never(),
            )
            .await
            .unwrap();
    }
}

fn price_between_10_and_20() -> FilterNode {
    FilterNode::And(vec![
        FilterNode::Compare { field: "price".into(), op: CompareOp::Gte, literal: "10".into() },
        FilterNode::Compare { field: "price".into(), op: CompareOp::Lte, literal: "20".into() },
    ])
}

#[tokio::test]
async fn page_two_of_filtered_sorted_set_returns_ranks_four_to_six() {
    let (store, repository) = book_repository();
    // 8 books in the price band, 2 outside it; names deliberately unsorted.
    seed_books(
        &store,
        &[
            (1, "hazel", 12.0),
            (2, "cedar", 15.0),
            (3, "aspen", 11.0),
            (4, "rowan", 19.0),
            (5, "birch", 10.0),
            (6, "larch", 20.0),
            (7, "maple", 14.0),
            (8, "elder", 16.0),
            (9, "willow", 9.0),
            (10, "oak", 25.0),
        ],
    )
    .await;

    let description = QueryDescription {
        filter: Some(price_between_10_and_20()),
        sort: vec![SortKey::ascending("name")],
        page: Some(PageWindow::new(2, 3).unwrap()),
    };
    let docs = repository.get(&description, None, &Cancellation::never()).await.unwrap();
    let names: Vec<&str> = docs.iter().map(|d| d.get_str("name").unwrap()).collect();
    // Filtered set sorted by name: aspen birch cedar elder hazel larch maple rowan
    assert_eq!(names, ["elder", "hazel", "larch"]);
}

#[tokio::test]
async fn count_translates_the_filter_alone() {
    let (store, repository) = book_repository();
    seed_books(&store, &[(1, "a", 5.0), (2, "b", 12.0), (3, "c", 18.0), (4, "d", 30.0)]).await;
    let filter = price_between_10_and_20();
    let n = repository.count(Some(&filter), None, &Cancellation::never()).await.unwrap();
    assert_eq!(n, 2);
    let all = repository.count(None, None, &Cancellation::never()).await.unwrap();
    assert_eq!(all, 4);
}

#[tokio::test]
async fn get_without_sort_orders_by_identifier() {
    let (store, repository) = book_repository();
    seed_books(&store, &[(3, "c", 1.0), (1, "a", 1.0), (2, "b", 1.0)]).await;
    let docs = repository
        .get(&QueryDescription::default(), None, &Cancellation::never())
        .await
        .unwrap();
    let ids: Vec<i64> = docs.iter().map(|d| d.get_i64("_id").unwrap()).collect();
    assert_eq!(ids, [1, 2, 3]);
}

#[tokio::test]
async fn page_size_zero_returns_no_documents() {
    let (store, repository) = book_repository();
    seed_books(&store, &[(1, "a", 1.0), (2, "b", 2.0)]).await;
    let description = QueryDescription {
        page: Some(PageWindow::new(1, 0).unwrap()),
        ..QueryDescription::default()
    };
    let docs = repository.get(&description, None, &Cancellation::never()).await.unwrap();
    assert!(docs.is_empty());
}

#[tokio::test]
async fn create_merges_targeted_fields_onto_fresh_instance() {
    let (store, repository) = book_repository();
    let incoming = doc! { "title": "X", "secret": "leak" };
    let for_storage = doc! { "_id": 7_i64, "title": "", "secret": "" };
    let targeted: TargetedFields = ["title"].into_iter().collect();
    let created = repository
        .create(&incoming, for_storage, &targeted, None, &Cancellation::never())
        .await
        .unwrap();
    assert_eq!(created.get_str("title").unwrap(), "X");
    assert_eq!(created.get_str("secret").unwrap(), "");

    let stored = store
        .collection("books")
        .unwrap()
        .find(
            &docugate::query::TranslatedQuery::all("books"),
            None,
            &Cancellation::never(),
        )
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].get_str("secret").unwrap(), "");
}

#[tokio::test]
async fn update_keeps_untargeted_fields_byte_for_byte() {
    let (store, repository) = book_repository();
    seed_books(&store, &[(1, "original", 12.0)]).await;

    let description = QueryDescription::filter_only(FilterNode::Compare {
        field: "_id".into(),
        op: CompareOp::Eq,
        literal: "1".into(),
    });
    let stored = repository
        .get_for_update(&description, None, &Cancellation::never())
        .await
        .unwrap()
        .expect("seeded document");

    // The request carries different values for fields it did not target.
    let incoming = doc! { "name": "renamed", "price": 99.0 };
    let targeted: TargetedFields = ["name"].into_iter().collect();
    let updated = repository
        .update(&incoming, stored, &targeted, None, &Cancellation::never())
        .await
        .unwrap();
    assert_eq!(updated.get_str("name").unwrap(), "renamed");
    assert_eq!(updated.get_f64("price").unwrap(), 12.0);

    let reloaded = repository
        .get_for_update(&description, None, &Cancellation::never())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded, doc! { "_id": 1_i64, "name": "renamed", "price": 12.0 });
}

#[tokio::test]
async fn get_for_update_returns_none_for_missing_target() {
    let (_store, repository) = book_repository();
    let description = QueryDescription::filter_only(FilterNode::Compare {
        field: "_id".into(),
        op: CompareOp::Eq,
        literal: "42".into(),
    });
    let found = repository
        .get_for_update(&description, None, &Cancellation::never())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn delete_distinguishes_not_found_from_unacknowledged() {
    let (store, repository) = book_repository();
    seed_books(&store, &[(1, "a", 1.0)]).await;

    let err = repository
        .delete(&Bson::Int64(99), None, &Cancellation::never())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::ResourceNotFound { .. }));
    assert!(!err.is_retryable());

    store.collection("books").unwrap().set_write_concern(WriteConcern::Unacknowledged);
    let err = repository
        .delete(&Bson::Int64(1), None, &Cancellation::never())
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::WriteNotAcknowledged(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn delete_removes_exactly_one_document() {
    let (store, repository) = book_repository();
    seed_books(&store, &[(1, "a", 1.0), (2, "b", 2.0)]).await;
    repository.delete(&Bson::Int64(1), None, &Cancellation::never()).await.unwrap();
    assert_eq!(store.collection("books").unwrap().len(), 1);
}

#[tokio::test]
async fn relationship_mutations_always_fail() {
    let (_store, repository) = book_repository();
    for result in [
        repository.set_relationship("author").await,
        repository.add_to_relationship("author").await,
        repository.remove_from_relationship("author").await,
    ] {
        assert!(matches!(result, Err(AccessError::RelationshipsUnsupported(_))));
    }
}

#[tokio::test]
async fn fired_cancellation_token_stops_the_operation() {
    let (store, repository) = book_repository();
    seed_books(&store, &[(1, "a", 1.0)]).await;
    let (canceller, token) = cancel_pair();
    canceller.cancel();
    let err = repository.get(&QueryDescription::default(), None, &token).await.unwrap_err();
    assert!(matches!(err, AccessError::Cancelled));
    // The acknowledged seed write is untouched by cancellation.
    assert_eq!(store.collection("books").unwrap().len(), 1);
}
