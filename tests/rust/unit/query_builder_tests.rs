//! Select list, conditions, grouping, sorting and window rules of DbQuery

use dbquery::query::{
    BindValue, Cond, DbQuery, Key, QueryError, SortDirection, SqlOp, VarExpr, Visibility,
};
use rust_decimal::Decimal;

use crate::fixtures::{orders, shop};

fn compare_values(cond: &Cond) -> &[BindValue] {
    match cond {
        Cond::Compare { values, .. } => values,
        other => panic!("Expected a comparison, got {:?}", other),
    }
}

#[test]
fn test_new_query_selects_database_fields() {
    let query = orders();
    assert_eq!(query.main_entity(), Some("Order"));
    assert_eq!(query.main_alias(), Some("T1"));
    let names: Vec<&str> = query.out_vars().iter().map(|v| v.name()).collect();
    // `label` is computed in memory and never selected
    assert_eq!(names, vec!["id", "status", "amount", "orderDate", "customerId", "billToId"]);
    assert_eq!(query.max_rownum(), -1);
    assert!(!query.is_paged());
    assert!(query.is_case_insensitive());
}

#[test]
fn test_first_added_column_replaces_defaults() {
    let mut query = orders();
    query.add_column("status", "T1").expect("status");
    assert_eq!(query.out_vars().len(), 1);

    query
        .add_column("id", "T1")
        .expect("id")
        .add_column_as("status", "T1", "STATE")
        .expect("status again");
    assert_eq!(query.out_vars().len(), 2);
    let status = query.find_out_var("STATE", "T1").expect("aliased status");
    assert_eq!(status.result_alias(), "T1_STATE");
}

#[test]
fn test_column_lookup_by_column_name() {
    let mut query = orders();
    query.add_column("ORDER_DATE", "T1").expect("column name");
    assert_eq!(query.out_vars()[0].name(), "orderDate");
    assert!(query.in_var("label", "T1").is_none());
}

#[test]
fn test_unknown_column_and_table() {
    let mut query = orders();
    assert_eq!(
        query.add_column("missing", "T1").unwrap_err(),
        QueryError::UnknownColumn {
            column: "missing".to_string(),
            alias: "T1".to_string(),
        }
    );
    assert_eq!(
        query.add_column("id", "T9").unwrap_err(),
        QueryError::UnknownTable {
            alias: "T9".to_string(),
            known: "T1".to_string(),
        }
    );
}

#[test]
fn test_values_are_coerced_to_column_type() {
    let mut query = orders();
    query.add_cond_eq("amount", "T1", "12.50").expect("amount");
    assert_eq!(
        compare_values(&query.where_conds()[0]),
        &[BindValue::Decimal(Decimal::new(1250, 2))]
    );

    assert!(matches!(
        query.add_cond_eq("id", "T1", "abc"),
        Err(QueryError::InvalidValue { ref value, .. }) if value == "abc"
    ));

    let mut products = DbQuery::new(shop(), "Product").expect("Product query");
    products.add_cond_eq("category", "T1", "BOOK").expect("category");
    assert_eq!(compare_values(&products.where_conds()[0]), &[BindValue::Text("B".to_string())]);
}

#[test]
fn test_like_pattern_stays_text_on_numeric_column() {
    let mut query = orders();
    query.add_cond_like("amount", "T1", "1%").expect("amount pattern");
    query.add_cond_not_like("id", "T1", "9_").expect("id pattern");
    assert_eq!(compare_values(&query.where_conds()[0]), &[BindValue::Text("1%".to_string())]);
    assert_eq!(compare_values(&query.where_conds()[1]), &[BindValue::Text("9_".to_string())]);

    assert!(matches!(
        query.add_cond_eq("amount", "T1", "1%"),
        Err(QueryError::InvalidValue { ref value, .. }) if value == "1%"
    ));
}

#[test]
fn test_operator_misuse() {
    let mut query = orders();
    assert!(matches!(
        query.add_cond("status", "T1", SqlOp::In, "OPEN"),
        Err(QueryError::IllegalOperator { .. })
    ));
    assert!(matches!(
        query.add_cond("amount", "T1", SqlOp::Between, 1),
        Err(QueryError::IllegalOperator { .. })
    ));
    assert!(matches!(
        query.add_cond_subquery("id", "T1", SqlOp::Like, orders()),
        Err(QueryError::IllegalOperator { .. })
    ));
    assert!(matches!(
        query.add_cond_columns("id", "T1", SqlOp::Between, "id", "P1"),
        Err(QueryError::IllegalOperator { .. })
    ));
    assert!(query.where_conds().is_empty());
}

#[test]
fn test_is_null_takes_no_value() {
    let mut query = orders();
    query.add_cond_is_null("billToId", "T1", false).expect("is null");
    query.add_cond("customerId", "T1", SqlOp::IsNotNull, 5).expect("is not null");
    assert!(compare_values(&query.where_conds()[0]).is_empty());
    assert!(compare_values(&query.where_conds()[1]).is_empty());
}

#[test]
fn test_empty_in_list_adds_nothing() {
    let mut query = orders();
    query.add_cond_in_list("status", "T1", Vec::new(), false).expect("empty list");
    assert!(query.where_conds().is_empty());
}

#[test]
fn test_key_conditions_skip_null_fields() {
    let mut query = DbQuery::new(shop(), "OrderLine").expect("OrderLine query");
    query.add_cond_key(None, "T1").expect("no key");
    assert!(query.where_conds().is_empty());

    let key = Key::new().with("orderId", 7).with("lineNo", BindValue::Null);
    query.add_cond_key(Some(&key), "T1").expect("key");
    assert_eq!(query.where_conds().len(), 1);
}

#[test]
fn test_column_comparison_checks_local_aliases_only() {
    let mut query = orders();
    query
        .add_cond_columns("customerId", "T1", SqlOp::Eq, "id", "OUTER")
        .expect("correlated column");
    assert!(matches!(
        query.add_cond_columns("nope", "T1", SqlOp::Eq, "id", "OUTER"),
        Err(QueryError::UnknownColumn { .. })
    ));
}

#[test]
fn test_aggregates_mark_grouping() {
    let mut query = orders();
    query
        .add_column("customerId", "T1")
        .expect("customer")
        .add_sum("amount", "T1", Some("TOTAL"))
        .expect("sum");
    assert!(query.has_grouping_column());
    let sum = query.find_out_var("TOTAL", "T1").expect("sum var");
    assert_eq!(sum.expr, VarExpr::Template("sum({0})".to_string()));
}

#[test]
fn test_aggregate_templates_compose() {
    let mut query = orders();
    query
        .add_distinct("customerId", "T1", None)
        .expect("distinct")
        .add_count("customerId", "T1", None, false)
        .expect("count");
    let var = &query.out_vars()[0];
    assert_eq!(var.expr, VarExpr::Template("count(distinct({0}))".to_string()));
    assert_eq!(query.out_vars().len(), 1);
}

#[test]
fn test_decode_and_if_null_need_arguments() {
    let mut query = orders();
    assert!(matches!(
        query.add_decode("status", "T1", None, Vec::new(), None),
        Err(QueryError::MissingArguments(_))
    ));
    assert!(matches!(
        query.add_if_null("amount", "T1", None, BindValue::Null),
        Err(QueryError::MissingArguments(_))
    ));
}

#[test]
fn test_having_requires_selected_column() {
    let mut query = orders();
    query.add_sum("amount", "T1", None).expect("sum");
    assert!(matches!(
        query.add_having_cond("status", "T1", SqlOp::Eq, "OPEN"),
        Err(QueryError::UnknownColumn { .. })
    ));
    assert!(matches!(
        query.add_having_cond("amount", "T1", SqlOp::In, 1),
        Err(QueryError::IllegalOperator { .. })
    ));
    query.add_having_cond("amount", "T1", SqlOp::Gt, 100).expect("having");
    assert_eq!(query.having_conds().len(), 1);
}

#[test]
fn test_group_by_is_unique_and_cleared_with_columns() {
    let mut query = orders();
    query
        .add_group_by("status", "T1")
        .expect("group")
        .add_group_by("STATUS", "T1")
        .expect("same group");
    assert_eq!(query.group_by_list().len(), 1);

    query.remove_all_columns();
    assert!(query.group_by_list().is_empty());
    assert!(query.out_vars().is_empty());
}

#[test]
fn test_sorting_rules() {
    let mut query = orders();
    query
        .add_sort_by("id", "T1", "desc")
        .expect("id")
        .add_sort_by("id", "T1", "asc")
        .expect("id again")
        .add_sort_by("amount", "T1", "sideways")
        .expect("amount")
        .add_sort_first("status", "T1", "ASC")
        .expect("status first");

    let sorts: Vec<(&str, SortDirection)> = query
        .sort_by_list()
        .iter()
        .map(|s| (s.var.name(), s.direction))
        .collect();
    assert_eq!(
        sorts,
        vec![
            ("status", SortDirection::Asc),
            ("id", SortDirection::Desc),
            ("amount", SortDirection::Asc),
        ]
    );

    assert!(matches!(
        query.add_sort_by("nope", "T1", "ASC"),
        Err(QueryError::UnknownColumn { .. })
    ));

    query.reset_sort();
    query.add_categorized_sort_by("status", "T1", "ASC").expect("category");
    assert_eq!(query.category_breaks(), vec!["T1_STATUS"]);
}

#[test]
fn test_window_and_count_variants_leave_original_untouched() {
    let mut query = orders();
    query.set_min_rownum(-5);
    assert_eq!(query.min_rownum(), 0);

    let page = query.with_window(20, 10);
    assert!(page.is_paged());
    assert_eq!((page.min_rownum(), page.max_rownum()), (20, 10));
    assert!(!query.is_paged());

    let count = query.to_count();
    assert!(count.is_count());
    assert!(!query.is_count());

    query.set_max_rownum(0);
    assert!(!query.is_paged());
}

#[test]
fn test_constants_and_column_removal() {
    let mut query = orders();
    query
        .add_column("id", "T1")
        .expect("id")
        .add_column("status", "T1")
        .expect("status")
        .add_column_const("SOURCE", "web");
    query.remove_column("STATUS", "T1");

    assert_eq!(query.out_vars().len(), 1);
    assert_eq!(query.consts()[0].name, "SOURCE");

    query.add_all_columns("T1").expect("all columns");
    assert_eq!(query.out_vars().len(), 6);
    query.remove_out_vars("T1");
    assert!(query.out_vars().is_empty());
}

#[test]
fn test_visibility_and_fetch_size() {
    let mut query = orders();
    query
        .add_column("id", "T1")
        .expect("id")
        .add_column_with_visibility("billToId", "T1", Visibility::Invisible)
        .expect("hidden column")
        .set_fetch_size(Some(500));

    let hidden = query.find_out_var("billToId", "T1").expect("hidden var");
    assert_eq!(hidden.visibility, Visibility::Invisible);
    assert_eq!(query.fetch_size(), Some(500));
}
