//! Queries over rows linked to a parent row

use dbquery::dialect::DialectKind;
use dbquery::query::link_query::{ASSOCIATION_ALIAS, LINKED_ALIAS};
use dbquery::query::{link_query, BindValue, Key, QueryError};

use crate::fixtures::{compile, shop};

#[test]
fn test_orders_of_a_customer() {
    let key = Key::new().with("id", 42);
    let query = link_query(shop(), "Customer", "customer", &key).expect("link query");
    assert_eq!(query.main_alias(), Some(LINKED_ALIAS));

    let compiled = compile(DialectKind::MySql, &query);
    assert!(
        compiled.sql.ends_with("FROM ORDERS ASSO WHERE (ASSO.CUSTOMER_ID) = (?)"),
        "{}",
        compiled.sql
    );
    assert_eq!(compiled.binds, vec![BindValue::Int(42)]);
}

#[test]
fn test_second_link_to_same_parent() {
    let key = Key::new().with("id", 42);
    let query = link_query(shop(), "Customer", "billTo", &key).expect("link query");
    let compiled = compile(DialectKind::MySql, &query);
    assert!(compiled.sql.ends_with("WHERE (ASSO.BILL_TO_ID) = (?)"), "{}", compiled.sql);
}

#[test]
fn test_lines_of_an_order() {
    let key = Key::new().with("id", 7);
    let query = link_query(shop(), "Order", "order", &key).expect("link query");
    assert_eq!(query.main_entity(), Some("OrderLine"));
    let compiled = compile(DialectKind::PostgreSql, &query);
    assert!(compiled.sql.ends_with("FROM ORDER_LINES ASSO WHERE (ASSO.ORDER_ID) = (?)"));
}

#[test]
fn test_products_of_a_tag_through_association() {
    let key = Key::new().with("id", 9);
    let query = link_query(shop(), "Tag", "tag", &key).expect("link query");
    assert_eq!(query.main_entity(), Some("Product"));
    assert_eq!(query.aliases(), vec![LINKED_ALIAS, ASSOCIATION_ALIAS]);

    let compiled = compile(DialectKind::MySql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT ASSO.ID AS ASSO_ID, ASSO.NAME AS ASSO_NAME, ASSO.CATEGORY AS ASSO_CATEGORY \
         FROM PRODUCTS ASSO JOIN PRODUCT_TAGS ASSO_NN ON ASSO.ID = ASSO_NN.PRODUCT_ID \
         WHERE (ASSO_NN.TAG_ID) = (?)"
    );
    assert_eq!(compiled.binds, vec![BindValue::Int(9)]);
}

#[test]
fn test_null_parent_key_leaves_query_unconstrained() {
    let key = Key::new().with("id", BindValue::Null);
    let query = link_query(shop(), "Customer", "customer", &key).expect("link query");
    assert!(query.where_conds().is_empty());
    assert!(compile(DialectKind::MySql, &query).sql.ends_with("FROM ORDERS ASSO"));
}

#[test]
fn test_unknown_back_reference() {
    let result = link_query(shop(), "Customer", "invoices", &Key::new());
    assert!(matches!(result, Err(QueryError::LinkNotFound { ref link, .. }) if link == "invoices"));
}
