use bson::doc;
use docugate::errors::AccessError;
use docugate::query::{
    CompareOp, FieldType, FilterNode, PageWindow, QueryDescription, QueryTranslator, SortKey,
    TranslatedQuery, TypeDescriptor, parse_query_json,
};
use docugate::repository::Repository;
use docugate::store::{Cancellation, DocumentStore, cancel_pair};
use docugate::types::{IdType, ResourceMapping};
use std::sync::Arc;

fn book_descriptor() -> TypeDescriptor {
    TypeDescriptor::new("books", "_id")
        .with_field("price", FieldType::Double)
        .with_field("name", FieldType::String)
        .with_field("published_at", FieldType::DateTime)
        .with_relationship("author")
}

#[test]
fn filter_sort_page_compose_in_fixed_order() {
    let translator = QueryTranslator::new(book_descriptor());
    let description = QueryDescription {
        filter: Some(FilterNode::And(vec![
            FilterNode::Compare { field: "price".into(), op: CompareOp::Gte, literal: "10".into() },
            FilterNode::Compare { field: "price".into(), op: CompareOp::Lte, literal: "20".into() },
        ])),
        sort: vec![SortKey::ascending("name")],
        page: Some(PageWindow::new(2, 3).unwrap()),
    };
    let query = translator.apply_query(TranslatedQuery::all("books"), &description).unwrap();
    assert_eq!(
        query.filter,
        doc! { "$and": [ { "price": { "$gte": 10.0 } }, { "price": { "$lte": 20.0 } } ] }
    );
    assert_eq!(query.sort, doc! { "name": 1 });
    assert_eq!(query.skip, 3);
    assert_eq!(query.limit, Some(3));
}

#[test]
fn relationship_exists_fails_before_any_store_call() {
    let store = Arc::new(DocumentStore::new());
    let repository = Repository::new(
        &store,
        ResourceMapping::new("books", "books", "_id", IdType::ObjectId),
        book_descriptor(),
    );
    // A fired token turns any store round-trip into `Cancelled`; getting
    // `RelationshipsUnsupported` instead proves translation failed first.
    let (canceller, token) = cancel_pair();
    canceller.cancel();
    let description =
        QueryDescription::filter_only(FilterNode::Exists { relation: "author".into() });
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let err = rt.block_on(repository.get(&description, None, &token)).unwrap_err();
    assert!(matches!(err, AccessError::RelationshipsUnsupported(_)));
}

#[test]
fn sort_by_relationship_is_rejected() {
    let translator = QueryTranslator::new(book_descriptor());
    let description = QueryDescription {
        sort: vec![SortKey::ascending("author")],
        ..QueryDescription::default()
    };
    let err = translator.apply_query(TranslatedQuery::all("books"), &description).unwrap_err();
    assert!(matches!(err, AccessError::RelationshipsUnsupported(_)));
}

#[tokio::test]
async fn offsetless_timestamp_literal_matches_stored_utc_value() {
    let store = Arc::new(DocumentStore::new());
    let repository = Repository::new(
        &store,
        ResourceMapping::new("books", "books", "_id", IdType::ObjectId),
        book_descriptor(),
    );
    let collection = store.collection("books").unwrap();
    // 2024-01-01T00:00:00Z
    let stored_at = bson::DateTime::from_millis(1_704_067_200_000);
    collection
        .insert_one(doc! { "_id": 1_i64, "name": "a", "published_at": stored_at }, None, &Cancellation::never())
        .await
        .unwrap();

    let description = QueryDescription::filter_only(FilterNode::Compare {
        field: "published_at".into(),
        op: CompareOp::Eq,
        literal: "2024-01-01T00:00:00".into(),
    });
    let docs = repository.get(&description, None, &Cancellation::never()).await.unwrap();
    assert_eq!(docs.len(), 1);

    // The same clock time tagged with a non-UTC offset is a different instant.
    let shifted = QueryDescription::filter_only(FilterNode::Compare {
        field: "published_at".into(),
        op: CompareOp::Eq,
        literal: "2024-01-01T00:00:00+02:00".into(),
    });
    let docs = repository.get(&shifted, None, &Cancellation::never()).await.unwrap();
    assert!(docs.is_empty());
}

#[test]
fn bad_literal_reports_field_and_value() {
    let translator = QueryTranslator::new(book_descriptor());
    let description = QueryDescription::filter_only(FilterNode::Compare {
        field: "price".into(),
        op: CompareOp::Gt,
        literal: "cheap".into(),
    });
    let err = translator.apply_query(TranslatedQuery::all("books"), &description).unwrap_err();
    match err {
        AccessError::LiteralCoercion { field, value, .. } => {
            assert_eq!(field, "price");
            assert_eq!(value, "cheap");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn json_description_translates_end_to_end() {
    let description = parse_query_json(
        r#"{
            "filter": {"field": "price", "$lt": "15"},
            "sort": [{"field": "name", "descending": true}],
            "page": {"number": 1, "size": 10}
        }"#,
    )
    .unwrap();
    let translator = QueryTranslator::new(book_descriptor());
    let query = translator.apply_query(TranslatedQuery::all("books"), &description).unwrap();
    assert_eq!(query.filter, doc! { "price": { "$lt": 15.0 } });
    assert_eq!(query.sort, doc! { "name": -1 });
    assert_eq!(query.skip, 0);
    assert_eq!(query.limit, Some(10));
}
