//! SQL generated for each dialect from the same queries

use dbquery::compiler::SqlCompiler;
use dbquery::dialect::DialectKind;
use dbquery::query::alias::MAX_IDENTIFIER_LEN;
use dbquery::query::{BindValue, DbQuery, EntityJoin, QueryError, SqlOp};
use test_case::test_case;

use crate::fixtures::{compile, orders, shop};

fn open_orders() -> DbQuery {
    let mut query = orders();
    query
        .add_column("id", "T1")
        .expect("id")
        .add_column("status", "T1")
        .expect("status")
        .add_cond_eq("status", "T1", "OPEN")
        .expect("status condition")
        .add_sort_by("id", "T1", "ASC")
        .expect("sort");
    query
}

fn text(value: &str) -> BindValue {
    BindValue::Text(value.to_string())
}

#[test]
fn test_compilation_is_repeatable() {
    let query = open_orders().with_window(0, 10);
    let first = compile(DialectKind::PostgreSql, &query);
    let second = compile(DialectKind::PostgreSql, &query);
    assert_eq!(first, second);
}

#[test_case(DialectKind::PostgreSql, "LIMIT 10 OFFSET 0")]
#[test_case(DialectKind::MySql, "LIMIT 0, 10")]
fn test_limit_pagination(kind: DialectKind, limit: &str) {
    let compiled = compile(kind, &open_orders().with_window(0, 10));
    assert_eq!(
        compiled.sql,
        format!(
            "SELECT T1.ID AS T1_ID, T1.STATUS AS T1_STATUS FROM ORDERS T1 WHERE UPPER(T1.STATUS) = UPPER(?) ORDER BY T1_ID ASC {}",
            limit
        )
    );
    assert_eq!(compiled.binds, vec![text("OPEN")]);
    assert_eq!(compiled.index_of("T1_STATUS"), Ok(2));
}

#[test]
fn test_oracle_loose_join_and_rownum_window() {
    let mut query = orders();
    query
        .join(EntityJoin::new("Customer").via("customer").loose().without_columns())
        .expect("customer")
        .add_column("id", "T1")
        .expect("id")
        .add_column("name", "T2")
        .expect("name")
        .add_cond_eq("status", "T1", "OPEN")
        .expect("status");

    let compiled = compile(DialectKind::Oracle, &query.with_window(0, 10));
    assert_eq!(
        compiled.sql,
        "SELECT * FROM (SELECT sub.*, rownum as ROWNUM_ROWNUM FROM (\
         SELECT T1.ID AS T1_ID, T2.NAME AS T2_NAME FROM ORDERS T1, CUSTOMERS T2 \
         WHERE UPPER(T1.STATUS) = UPPER(?) AND (T1.CUSTOMER_ID = T2.ID(+))\
         ) sub ) WHERE ROWNUM_ROWNUM > 0 AND ROWNUM <= 10"
    );
    assert_eq!(compiled.binds, vec![text("OPEN")]);
}

#[test]
fn test_oracle_inner_join_moves_to_where() {
    let mut query = orders();
    query
        .join(EntityJoin::new("Customer").via("customer").without_columns())
        .expect("customer")
        .add_column("id", "T1")
        .expect("id");
    let compiled = compile(DialectKind::Oracle, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1, CUSTOMERS T2 WHERE T1.CUSTOMER_ID = T2.ID"
    );
}

#[test]
fn test_ansi_joins() {
    let mut query = orders();
    query
        .join(EntityJoin::new("Customer").via("customer").loose().without_columns())
        .expect("customer")
        .add_entity("Tag", None, dbquery::query::JoinKind::None)
        .expect("tag")
        .add_column("id", "T1")
        .expect("id");
    let compiled = compile(DialectKind::MySql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1 LEFT JOIN CUSTOMERS T2 ON T1.CUSTOMER_ID = T2.ID, TAGS T3"
    );
}

#[test]
fn test_separators_and_groups() {
    let mut query = orders();
    query.add_column("id", "T1").expect("id");
    query.add_cond_eq("status", "T1", "OPEN").expect("status");
    query.or().start_group();
    query.add_cond_gt("amount", "T1", 100).expect("amount");
    query.add_cond_is_null("billToId", "T1", false).expect("bill-to");
    query.end_group();

    let compiled = compile(DialectKind::MySql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1 WHERE UPPER(T1.STATUS) = UPPER(?) OR ((T1.AMOUNT) > (?) AND (T1.BILL_TO_ID) IS NULL)"
    );
    assert_eq!(compiled.binds, vec![text("OPEN"), BindValue::Int(100)]);
}

#[test]
fn test_group_opened_after_predicate_gets_and() {
    let mut query = orders();
    query.add_column("id", "T1").expect("id");
    query.add_cond_eq("status", "T1", "OPEN").expect("status");
    query.start_group();
    query.add_cond_lt("amount", "T1", 5).expect("low");
    query.or();
    query.add_cond_gt("amount", "T1", 500).expect("high");
    query.end_group();

    let compiled = compile(DialectKind::PostgreSql, &query);
    assert!(
        compiled
            .sql
            .ends_with("WHERE UPPER(T1.STATUS) = UPPER(?) AND ((T1.AMOUNT) < (?) OR (T1.AMOUNT) > (?))"),
        "{}",
        compiled.sql
    );
}

#[test]
fn test_empty_groups_render_nothing() {
    let mut query = orders();
    query.add_column("id", "T1").expect("id");
    query.add_cond_eq("status", "T1", "OPEN").expect("status");
    query.start_group().end_group();
    query.add_cond_gt("amount", "T1", 100).expect("amount");

    let compiled = compile(DialectKind::MySql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1 WHERE UPPER(T1.STATUS) = UPPER(?) AND (T1.AMOUNT) > (?)"
    );

    let mut only_groups = orders();
    only_groups.add_column("id", "T1").expect("id");
    only_groups.start_group().start_group().end_group().end_group();
    let compiled = compile(DialectKind::MySql, &only_groups);
    assert_eq!(compiled.sql, "SELECT T1.ID AS T1_ID FROM ORDERS T1");
}

#[test]
fn test_null_value_becomes_null_test() {
    let mut query = orders();
    query.add_column("id", "T1").expect("id");
    query.add_cond_neq("billToId", "T1", BindValue::Null).expect("not null");
    query.add_cond_eq("customerId", "T1", None::<i64>).expect("null");

    let compiled = compile(DialectKind::MySql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1 WHERE (T1.BILL_TO_ID) IS NOT NULL AND (T1.CUSTOMER_ID) IS NULL"
    );
    assert!(compiled.binds.is_empty());
}

#[test]
fn test_case_sensitive_query_skips_upper() {
    let mut query = open_orders();
    query.set_case_insensitive(false);
    let compiled = compile(DialectKind::MySql, &query);
    assert!(compiled.sql.contains("WHERE (T1.STATUS) = (?)"), "{}", compiled.sql);
}

#[test]
fn test_in_list_and_empty_list() {
    let mut query = orders();
    query.add_column("id", "T1").expect("id");
    query
        .add_cond_in_list("status", "T1", Vec::new(), false)
        .expect("empty list")
        .add_cond_in_list("status", "T1", vec!["OPEN".into(), "HOLD".into()], true)
        .expect("list");

    let compiled = compile(DialectKind::MySql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1 WHERE T1.STATUS NOT IN ((?), (?))"
    );
    assert_eq!(compiled.binds, vec![text("OPEN"), text("HOLD")]);
}

#[test]
fn test_between_binds_both_bounds() {
    let mut query = orders();
    query.add_column("id", "T1").expect("id");
    query.add_cond_between("orderDate", "T1", "2024-01-01", "2024-01-31").expect("between");

    let compiled = compile(DialectKind::Db2, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1 WHERE (T1.ORDER_DATE) BETWEEN (?) AND (?)"
    );
    assert_eq!(compiled.binds.len(), 2);
    assert!(matches!(compiled.binds[0], BindValue::Date(_)));
}

#[test]
fn test_concatenated_search() {
    let mut query = DbQuery::new(shop(), "Customer").expect("Customer query");
    query
        .add_cond_like_concat(&[("name", "T1"), ("city", "T1")], "par", false)
        .expect("search");

    let compiled = compile(DialectKind::MySql, &query);
    assert!(
        compiled.sql.ends_with(
            "WHERE UPPER(CONCAT(ifnull(T1.NAME, ''),CONCAT(' ',ifnull(T1.CITY, '')))) LIKE ?"
        ),
        "{}",
        compiled.sql
    );
    assert_eq!(compiled.binds, vec![text("%PAR%")]);
}

#[test_case(DialectKind::MySql, " AS COUNT_SUBSELECT_ALIAS")]
#[test_case(DialectKind::PostgreSql, " AS COUNT_SUBSELECT_ALIAS")]
#[test_case(DialectKind::Oracle, "")]
fn test_count_wraps_query_without_order(kind: DialectKind, suffix: &str) {
    let query = open_orders().with_window(20, 10).to_count();
    let compiled = compile(kind, &query);
    assert_eq!(
        compiled.sql,
        format!(
            "SELECT COUNT(1) FROM (SELECT T1.ID AS T1_ID, T1.STATUS AS T1_STATUS FROM ORDERS T1 WHERE UPPER(T1.STATUS) = UPPER(?)){}",
            suffix
        )
    );
    assert_eq!(compiled.binds, vec![text("OPEN")]);
}

#[test]
fn test_count_ignores_constants() {
    let mut query = open_orders();
    query.add_column_const("SOURCE", "web");
    let rows = compile(DialectKind::MySql, &query);
    assert!(rows
        .sql
        .starts_with("SELECT T1.ID AS T1_ID, T1.STATUS AS T1_STATUS, 'web' AS SOURCE FROM"));

    let count = compile(DialectKind::MySql, &query.to_count());
    assert!(!count.sql.contains("SOURCE"), "{}", count.sql);
}

#[test]
fn test_aggregate_groups_other_columns_with_having() {
    let mut query = orders();
    query
        .add_column("customerId", "T1")
        .expect("customer")
        .add_sum("amount", "T1", Some("TOTAL"))
        .expect("sum")
        .add_having_cond("amount", "T1", SqlOp::Gt, 100)
        .expect("having");

    let compiled = compile(DialectKind::PostgreSql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.CUSTOMER_ID AS T1_CUSTOMER_ID, sum(T1.AMOUNT) AS T1_TOTAL FROM ORDERS T1 \
         GROUP BY T1.CUSTOMER_ID HAVING (sum(T1.AMOUNT)) > (?)"
    );
    assert_eq!(compiled.binds, vec![BindValue::Int(100)]);
}

#[test]
fn test_sql_expression_field_grouped_by_alias() {
    let mut query = DbQuery::new(shop(), "OrderLine").expect("OrderLine query");
    query
        .add_column("productId", "T1")
        .expect("product")
        .add_column("total", "T1")
        .expect("total")
        .add_count("lineNo", "T1", Some("LINES"), false)
        .expect("count");

    let compiled = compile(DialectKind::PostgreSql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.PRODUCT_ID AS T1_PRODUCT_ID, (T1.QTY * T1.PRICE) AS T1_TOTAL, count(T1.LINE_NO) AS T1_LINES \
         FROM ORDER_LINES T1 GROUP BY T1.PRODUCT_ID, T1_TOTAL"
    );
}

#[test]
fn test_window_sort_for_db2_and_sqlserver() {
    let mut query = orders();
    query
        .add_column("id", "T1")
        .expect("id")
        .add_column("status", "T1")
        .expect("status")
        .add_sort_by_desc("status", "T1")
        .expect("sort");
    let page = query.with_window(20, 10);
    let inner = "SELECT T1.ID AS T1_ID, T1.STATUS AS T1_STATUS FROM ORDERS T1";

    assert_eq!(
        compile(DialectKind::Db2, &page).sql,
        format!(
            "SELECT internal$1.* FROM (SELECT internal$2.*, ROW_NUMBER() OVER (ORDER BY T1_STATUS DESC) AS internal$rownum \
             FROM ({}) internal$2) internal$1 WHERE internal$1.internal$rownum > 20 AND internal$1.internal$rownum <= 30",
            inner
        )
    );
    assert_eq!(
        compile(DialectKind::SqlServer, &page).sql,
        format!(
            "SELECT * FROM (SELECT sub.*, ROW_NUMBER() OVER (ORDER BY T1_STATUS DESC) AS ROWNUM FROM ({}) sub ) rows \
             WHERE rows.ROWNUM > 20 AND rows.ROWNUM <= 10",
            inner
        )
    );
    // Unpaged queries keep a plain ORDER BY
    assert_eq!(
        compile(DialectKind::SqlServer, &query).sql,
        format!("{} ORDER BY T1_STATUS DESC", inner)
    );
}

#[test]
fn test_decode_binds_in_arm_order() {
    let mut query = orders();
    query
        .add_decode(
            "status",
            "T1",
            Some("STATE"),
            vec![("OPEN".into(), "'Open'".to_string()), ("CLOSED".into(), "'Closed'".to_string())],
            Some("X".into()),
        )
        .expect("decode")
        .add_cond_eq("status", "T1", "HOLD")
        .expect("status");

    let ansi = compile(DialectKind::PostgreSql, &query);
    assert_eq!(
        ansi.sql,
        "SELECT CASE T1.STATUS WHEN ? THEN 'Open' WHEN ? THEN 'Closed' ELSE ? END AS T1_STATE FROM ORDERS T1 \
         WHERE UPPER(T1.STATUS) = UPPER(?)"
    );
    assert_eq!(ansi.binds, vec![text("OPEN"), text("CLOSED"), text("X"), text("HOLD")]);

    let oracle = compile(DialectKind::Oracle, &query);
    assert!(
        oracle.sql.starts_with("SELECT decode(T1.STATUS, ?, 'Open', ?, 'Closed', ?) AS T1_STATE"),
        "{}",
        oracle.sql
    );
    assert_eq!(oracle.binds, ansi.binds);
}

#[test]
fn test_if_null_column() {
    let mut query = orders();
    query.add_if_null("billToId", "T1", None, 0.into()).expect("if null");
    let compiled = compile(DialectKind::SqlServer, &query);
    assert_eq!(
        compiled.sql,
        "SELECT ISNULL(T1.BILL_TO_ID, ?) AS T1_BILL_TO_ID FROM ORDERS T1"
    );
    assert_eq!(compiled.binds, vec![BindValue::Int(0)]);
}

#[test]
fn test_unused_outer_join_is_pruned() {
    let mut query = orders();
    query
        .join(EntityJoin::new("Customer").via("customer").loose().without_columns())
        .expect("customer")
        .add_column("id", "T1")
        .expect("id");

    let pruning = SqlCompiler::new(DialectKind::MySql).with_outer_join_pruning(true);
    assert_eq!(
        pruning.compile(&query).expect("compile").sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1"
    );

    query.add_cond_eq("name", "T2", "Smith").expect("customer name");
    assert_eq!(
        pruning.compile(&query).expect("compile").sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1 LEFT JOIN CUSTOMERS T2 ON T1.CUSTOMER_ID = T2.ID WHERE UPPER(T2.NAME) = UPPER(?)"
    );
}

#[test]
fn test_long_aliases_stay_bounded_and_resolvable() {
    let mut query =
        DbQuery::with_alias(shop(), "Customer", "PREFERRED_CUSTOMER_ACCOUNT").expect("query");
    query
        .add_column("createdAt", "PREFERRED_CUSTOMER_ACCOUNT")
        .expect("created")
        .add_column_as("name", "PREFERRED_CUSTOMER_ACCOUNT", "DISPLAY_NAME_FOR_INVOICES")
        .expect("name");

    let compiled = compile(DialectKind::Oracle, &query);
    assert_eq!(compiled.columns.len(), 2);
    for column in &compiled.columns {
        assert!(column.alias.len() <= MAX_IDENTIFIER_LEN, "{}", column.alias);
        assert_eq!(compiled.index_of(&column.alias), Ok(column.index));
        assert!(compiled.sql.contains(&format!(" AS {}", column.alias)));
    }
    assert_ne!(compiled.columns[0].alias, compiled.columns[1].alias);
    assert_eq!(
        compiled.index_of_field("PREFERRED_CUSTOMER_ACCOUNT", "name"),
        Some(2)
    );
}

#[test]
fn test_unknown_result_column() {
    let compiled = compile(DialectKind::MySql, &open_orders());
    assert!(matches!(
        compiled.index_of("T1_AMOUNT"),
        Err(QueryError::UnknownResultColumn { .. })
    ));
}

#[test]
fn test_distinct_and_for_update() {
    let mut query = open_orders();
    query.set_distinct(true);
    assert!(compile(DialectKind::MySql, &query).sql.starts_with("SELECT DISTINCT T1.ID AS T1_ID"));

    query.set_for_update(true);
    assert!(compile(DialectKind::MySql, &query).sql.ends_with(" FOR UPDATE"));
}

#[test]
fn test_having_groups_and_between() {
    let mut query = orders();
    query
        .add_column("customerId", "T1")
        .expect("customer")
        .add_sum("amount", "T1", Some("TOTAL"))
        .expect("sum")
        .start_having_group()
        .add_having_cond("amount", "T1", SqlOp::Gt, 1000)
        .expect("high")
        .having_or()
        .add_having_cond("amount", "T1", SqlOp::Lt, 10)
        .expect("low")
        .end_having_group()
        .having_and()
        .add_having_cond_between("amount", "T1", 5, 5000)
        .expect("range");

    let compiled = compile(DialectKind::MySql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.CUSTOMER_ID AS T1_CUSTOMER_ID, sum(T1.AMOUNT) AS T1_TOTAL FROM ORDERS T1 \
         GROUP BY T1.CUSTOMER_ID HAVING ((sum(T1.AMOUNT)) > (?) OR (sum(T1.AMOUNT)) < (?)) \
         AND (sum(T1.AMOUNT)) BETWEEN (?) AND (?)"
    );
    assert_eq!(
        compiled.binds,
        vec![BindValue::Int(1000), BindValue::Int(10), BindValue::Int(5), BindValue::Int(5000)]
    );
}

#[test]
fn test_like_and_range_helpers() {
    let mut query = orders();
    query
        .add_column("id", "T1")
        .expect("id")
        .add_cond_like("status", "T1", "OP%")
        .expect("like")
        .add_cond_not_like("status", "T1", "%X")
        .expect("not like")
        .add_cond_ge("amount", "T1", 50)
        .expect("amount");

    let compiled = compile(DialectKind::MySql, &query);
    assert_eq!(
        compiled.sql,
        "SELECT T1.ID AS T1_ID FROM ORDERS T1 WHERE UPPER(T1.STATUS) LIKE UPPER(?) \
         AND UPPER(T1.STATUS) NOT LIKE UPPER(?) AND (T1.AMOUNT) >= (?)"
    );

    query.reset_where();
    assert_eq!(compile(DialectKind::MySql, &query).sql, "SELECT T1.ID AS T1_ID FROM ORDERS T1");
}

#[test]
fn test_oracle_pruning_keeps_tables_joined_through() {
    let mut query = DbQuery::new(shop(), "OrderLine").expect("OrderLine query");
    query
        .join(EntityJoin::new("Order").via("order").loose().without_columns())
        .expect("order")
        .join(EntityJoin::new("Customer").via("customer").loose().without_columns())
        .expect("customer")
        .add_column("name", "T3")
        .expect("customer name");

    let pruning = SqlCompiler::new(DialectKind::Oracle).with_outer_join_pruning(true);
    assert_eq!(
        pruning.compile(&query).expect("compile").sql,
        "SELECT T3.NAME AS T3_NAME FROM ORDER_LINES T1, ORDERS T2, CUSTOMERS T3 \
         WHERE T1.ORDER_ID = T2.ID(+) AND T2.CUSTOMER_ID = T3.ID(+)"
    );

    query.remove_out_vars("T3").add_column("qty", "T1").expect("quantity");
    assert_eq!(
        pruning.compile(&query).expect("compile").sql,
        "SELECT T1.QTY AS T1_QTY FROM ORDER_LINES T1"
    );
}
