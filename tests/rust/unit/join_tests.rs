//! Join resolution when entities are added to a query

use dbquery::query::{DbQuery, EntityJoin, JoinKind, QueryError};

use crate::fixtures::{orders, shop};

#[test]
fn test_join_follows_outbound_link() {
    let mut query = orders();
    query.join(EntityJoin::new("Customer").via("customer")).expect("join Customer");

    assert_eq!(query.aliases(), vec!["T1", "T2"]);
    assert_eq!(query.entity_of("T2"), Some("Customer"));
    let link = &query.tables()[1].links[0];
    assert_eq!(link.source_alias, "T1");
    assert_eq!(link.source_fields, vec!["customerId"]);
    assert_eq!(link.target_fields, vec!["id"]);
    // Both tables select all their columns until a column is added explicitly
    assert_eq!(query.out_vars().len(), 10);
}

#[test]
fn test_join_follows_back_reference() {
    let mut query = orders();
    query.join(EntityJoin::new("OrderLine")).expect("join OrderLine");

    let link = &query.tables()[1].links[0];
    assert_eq!(link.link_name, "order");
    assert_eq!(link.source_fields, vec!["id"]);
    assert_eq!(link.target_fields, vec!["orderId"]);
}

#[test]
fn test_ambiguous_join_picks_first_link() {
    let mut query = orders();
    query.join(EntityJoin::new("Customer")).expect("join Customer");
    assert_eq!(query.tables()[1].links[0].link_name, "customer");
}

#[test]
fn test_ambiguous_join_fails_when_strict() {
    let mut query = orders();
    query.set_strict_joins(true);
    let err = query.join(EntityJoin::new("Customer")).unwrap_err();
    assert_eq!(
        err,
        QueryError::AmbiguousJoinPath {
            entity: "Customer".to_string(),
            candidates: "T1.customer, T1.billTo".to_string(),
        }
    );
}

#[test]
fn test_same_entity_twice_under_another_alias() {
    let mut query = orders();
    query
        .join(EntityJoin::new("Customer").via("customer"))
        .expect("customer")
        .join(EntityJoin::new("Customer").alias("BILL").via("billTo"))
        .expect("bill-to customer");

    assert_eq!(query.aliases(), vec!["T1", "T2", "BILL"]);
    assert_eq!(query.tables()[2].links[0].source_fields, vec!["billToId"]);
}

#[test]
fn test_joining_an_entity_again_is_a_no_op() {
    let mut query = orders();
    query.join(EntityJoin::new("Customer").via("customer")).expect("first");
    query.join(EntityJoin::new("Customer")).expect("again without link");
    query.join(EntityJoin::new("Customer").via("customer")).expect("again with link");

    assert_eq!(query.aliases(), vec!["T1", "T2"]);
    assert_eq!(query.tables()[1].links.len(), 1);
}

#[test]
fn test_join_errors() {
    let mut tags = DbQuery::new(shop(), "Tag").expect("Tag query");
    assert_eq!(
        tags.join(EntityJoin::new("Customer")).unwrap_err(),
        QueryError::NoJoinPath {
            entity: "Customer".to_string()
        }
    );

    let mut query = orders();
    assert_eq!(
        query.join(EntityJoin::new("Customer").via("owner")).unwrap_err(),
        QueryError::LinkNotFound {
            link: "owner".to_string(),
            entity: "Customer".to_string(),
            target_alias: None,
        }
    );
    assert_eq!(
        query.join(EntityJoin::new("Nowhere")).unwrap_err(),
        QueryError::UnknownEntity("Nowhere".to_string())
    );
}

#[test]
fn test_duplicate_alias_is_rejected() {
    let mut query = DbQuery::with_alias(shop(), "Order", "O").expect("aliased query");
    let err = query
        .join(EntityJoin::new("Customer").alias("O").via("customer"))
        .unwrap_err();
    assert_eq!(err, QueryError::DuplicateAlias("O".to_string()));
}

#[test]
fn test_cartesian_and_loose_kinds() {
    let mut query = orders();
    query
        .add_entity("Tag", None, JoinKind::None)
        .expect("cartesian Tag")
        .join(EntityJoin::new("Customer").via("customer").loose())
        .expect("loose Customer");

    let tag = query.table("T2").expect("T2");
    assert!(!tag.has_join_condition());
    let customer = query.table("T3").expect("T3");
    assert!(customer.is_outer());
    assert_eq!(query.alias_of("Customer"), Some("T3"));
}

#[test]
fn test_join_through_chosen_table() {
    let mut query = DbQuery::new(shop(), "OrderLine").expect("OrderLine query");
    query
        .join(EntityJoin::new("Order").via("order"))
        .expect("order")
        .join(EntityJoin::new("Customer").via("customer").from("T2"))
        .expect("customer");

    let link = &query.tables()[2].links[0];
    assert_eq!(link.source_alias, "T2");
    assert_eq!(link.source_entity, "Order");
}

#[test]
fn test_override_join_keys() {
    let mut query = orders();
    query.join(EntityJoin::new("Customer").via("customer")).expect("customer");
    query
        .set_join_keys("T2", "T1", vec!["billToId".to_string()], vec!["id".to_string()])
        .expect("override");
    assert_eq!(query.tables()[1].links[0].source_fields, vec!["billToId"]);

    assert!(matches!(
        query.set_join_keys("T2", "T1", vec!["billToId".to_string()], Vec::new()),
        Err(QueryError::KeyArityMismatch { .. })
    ));
    assert!(matches!(
        query.set_join_keys("T2", "T9", vec!["a".to_string()], vec!["b".to_string()]),
        Err(QueryError::UnknownJoin { .. })
    ));
}
