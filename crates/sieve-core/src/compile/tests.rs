use super::*;
use crate::{
    error::{Error, ErrorClass},
    query::{Constraint, Query},
    test_support::models,
};
use time::{Date, Month, OffsetDateTime, Time};

fn compiler() -> Compiler {
    Compiler::new(models(), CompileConfig::default(), crate::DEFAULT_LIMIT)
}

fn compile(entity: &str, text: &str) -> CompiledQuery {
    compiler()
        .compile_text(entity, text)
        .expect("query should compile")
}

fn compile_err(entity: &str, text: &str) -> CompileError {
    compiler()
        .compile_text(entity, text)
        .expect_err("query should be rejected")
}

fn at(year: i32, month: Month, day: u8, hour: u8, minute: u8, second: u8) -> OffsetDateTime {
    Date::from_calendar_date(year, month, day)
        .and_then(|date| date.with_hms(hour, minute, second))
        .expect("valid calendar date")
        .assume_utc()
}

fn compare(column: &str, op: CompareOp, param: &str) -> CompiledPredicate {
    CompiledPredicate::Compare {
        column: column.to_string(),
        op,
        param: param.to_string(),
    }
}

// ----------------------------------------------------------------------
// Predicates
// ----------------------------------------------------------------------

#[test]
fn and_with_nested_or_and_ordering() {
    let compiled = compile(
        "Customer",
        r#"age >= 18 AND (status = "active" OR status = "pending") ORDER BY name DESC"#,
    );

    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::And(vec![
            compare("mobj.age", CompareOp::Ge, "v0"),
            CompiledPredicate::Or(vec![
                compare("mobj.status", CompareOp::Eq, "v1"),
                compare("mobj.status", CompareOp::Eq, "v2"),
            ]),
        ]))
    );
    assert_eq!(compiled.bindings.get("v0"), Some(&Value::Int(18)));
    assert_eq!(
        compiled.bindings.get("v1"),
        Some(&Value::Enum("active".to_string()))
    );
    assert_eq!(
        compiled.ordering,
        vec![CompiledOrder {
            column: "mobj.name".to_string(),
            direction: OrderDirection::Desc,
        }]
    );
    assert_eq!(
        compiled.to_query_text(),
        "SELECT DISTINCT mobj, mobj.name FROM Customer mobj WHERE mobj.age >= :v0 AND \
         (mobj.status = :v1 OR mobj.status = :v2) ORDER BY mobj.name DESC"
    );
}

#[test]
fn collection_path_shares_one_join() {
    let compiled = compile("Order", "items.sku = 'A1' OR items.sku = 'B2'");

    assert_eq!(compiled.joins.len(), 1);
    assert_eq!(compiled.joins[0].alias, "j0");
    assert_eq!(compiled.joins[0].path(), "mobj.items");
    assert_eq!(
        compiled.to_query_text(),
        "SELECT DISTINCT mobj FROM Order mobj LEFT OUTER JOIN mobj.items j0 \
         WHERE (j0.sku = :v0 OR j0.sku = :v1)"
    );
}

#[test]
fn alias_reuses_join_of_expanded_path() {
    let compiled = compile("Order", "sku = x AND items.quantity > 2");

    assert_eq!(compiled.joins.len(), 1);
    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::And(vec![
            compare("j0.sku", CompareOp::Eq, "v0"),
            compare("j0.quantity", CompareOp::Gt, "v1"),
        ]))
    );
}

#[test]
fn join_labels_allocate_separate_joins() {
    let compiled = compile("Order", "items[a].sku = x AND items[b].sku = y");

    let aliases: Vec<_> = compiled.joins.iter().map(|j| j.alias.as_str()).collect();
    assert_eq!(aliases, ["j0", "j1"]);
}

#[test]
fn to_one_relation_is_dereferenced() {
    let compiled = compile("Order", "customer.name = Ada AND customer = 7");

    assert!(compiled.joins.is_empty());
    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::And(vec![
            compare("mobj.customer.name", CompareOp::Eq, "v0"),
            compare("mobj.customer.id", CompareOp::Eq, "v1"),
        ]))
    );
    assert_eq!(compiled.bindings.get("v1"), Some(&Value::Int(7)));
}

#[test]
fn reserved_word_relation_is_a_field() {
    let compiled = compile("Item", "order = 5 AND order.name = x ORDER BY order.total DESC");

    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::And(vec![
            compare("mobj.order.id", CompareOp::Eq, "v0"),
            compare("mobj.order.name", CompareOp::Eq, "v1"),
        ]))
    );
    assert_eq!(compiled.bindings.get("v0"), Some(&Value::Int(5)));
    assert_eq!(compiled.ordering[0].column, "mobj.order.total");
}

#[test]
fn collection_size_compares_as_int() {
    let compiled = compile("Order", "items:size > 2");

    assert_eq!(
        compiled.predicate,
        Some(compare("SIZE(mobj.items)", CompareOp::Gt, "v0"))
    );
    assert_eq!(compiled.bindings.get("v0"), Some(&Value::Int(2)));
}

#[test]
fn string_functions_become_like_patterns() {
    let compiled = compile("Order", "name CONTAINS ada AND name NOT STARTS bob");

    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::And(vec![
            CompiledPredicate::Like {
                column: "mobj.name".to_string(),
                param: "v0".to_string(),
                negated: false,
            },
            CompiledPredicate::Like {
                column: "mobj.name".to_string(),
                param: "v1".to_string(),
                negated: true,
            },
        ]))
    );
    assert_eq!(
        compiled.bindings.get("v0"),
        Some(&Value::Text("%ada%".to_string()))
    );
    assert_eq!(
        compiled.bindings.get("v1"),
        Some(&Value::Text("bob%".to_string()))
    );
}

#[test]
fn range_compiles_to_between_or_one_sided_compare() {
    let compiled = compile("Order", "total BETWEEN 1 AND 5");
    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::Between {
            column: "mobj.total".to_string(),
            low: "v0".to_string(),
            high: "v1".to_string(),
        })
    );
    assert_eq!(compiled.bindings.get("v1"), Some(&Value::Float(5.0)));

    let upper = Query::new().add(Constraint::range("total", "", "5"));
    let compiled = compiler().compile("Order", &upper).unwrap();
    assert_eq!(
        compiled.predicate,
        Some(compare("mobj.total", CompareOp::Le, "v0"))
    );

    let empty = Query::new().add(Constraint::range("total", "", ""));
    let err = compiler().compile("Order", &empty).unwrap_err();
    assert!(matches!(err, CompileError::EmptyRange { .. }));
}

#[test]
fn single_value_in_list_keeps_membership_form() {
    let compiled = compile("Order", "id IN (1)");

    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::InList {
            column: "mobj.id".to_string(),
            param: "v0".to_string(),
            negated: false,
        })
    );
    assert_eq!(
        compiled.bindings.get("v0"),
        Some(&Value::List(vec![Value::Int(1)]))
    );
}

#[test]
fn not_in_binds_typed_list() {
    let compiled = compile("Order", "status NOT IN (OPEN, closed)");

    assert_eq!(
        compiled.bindings.get("v0"),
        Some(&Value::List(vec![
            Value::Enum("open".to_string()),
            Value::Enum("closed".to_string()),
        ]))
    );
    assert!(compiled.to_query_text().ends_with("WHERE mobj.status NOT IN (:v0)"));
}

#[test]
fn negated_or_group_compiles_to_not_or() {
    let compiled = compile("Order", "NOT (name = a OR name = b)");

    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::not(CompiledPredicate::Or(vec![
            compare("mobj.name", CompareOp::Eq, "v0"),
            compare("mobj.name", CompareOp::Eq, "v1"),
        ])))
    );
    assert!(
        compiled
            .to_query_text()
            .ends_with("WHERE NOT (mobj.name = :v0 OR mobj.name = :v1)")
    );
}

#[test]
fn negated_and_group_distributes() {
    let compiled = compile("Order", "NOT (name = a AND total = 2)");

    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::Or(vec![
            compare("mobj.name", CompareOp::Ne, "v0"),
            compare("mobj.total", CompareOp::Ne, "v1"),
        ]))
    );
}

#[test]
fn null_tests_bind_nothing() {
    let compiled = compile("Order", "reference IS NULL AND placed IS NOT NULL");

    assert!(compiled.bindings.is_empty());
    assert!(
        compiled
            .to_query_text()
            .ends_with("WHERE mobj.reference IS NULL AND mobj.placed IS NOT NULL")
    );
}

#[test]
fn field_refs_compare_columns() {
    let compiled = compile("Order", "total GTREF id");

    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::CompareColumns {
            left: "mobj.total".to_string(),
            op: CompareOp::Gt,
            right: "mobj.id".to_string(),
        })
    );
    assert!(compiled.bindings.is_empty());

    let err = compile_err("Order", "name EQREF total");
    assert!(matches!(err, CompileError::IncompatibleFieldRef { .. }));
}

// ----------------------------------------------------------------------
// Literal typing
// ----------------------------------------------------------------------

#[test]
fn literals_are_typed_by_property() {
    let compiled = compile(
        "Order",
        "archived = yes AND status = SHIPPED AND placed > 2024-01-01T00:00:00Z AND id < max",
    );

    assert_eq!(compiled.bindings.get("v0"), Some(&Value::Bool(true)));
    assert_eq!(
        compiled.bindings.get("v1"),
        Some(&Value::Enum("shipped".to_string()))
    );
    assert!(matches!(
        compiled.bindings.get("v2"),
        Some(Value::Timestamp(ts)) if ts.year() == 2024
    ));
    assert_eq!(compiled.bindings.get("v3"), Some(&Value::Int(i64::MAX)));
}

#[test]
fn timestamp_literals_accept_dates_and_anchors() {
    let compiled = compile("Order", "placed >= 2024-03 AND placed < today-P1D");

    assert!(matches!(
        compiled.bindings.get("v0"),
        Some(Value::Timestamp(ts)) if *ts == at(2024, Month::March, 1, 0, 0, 0)
    ));
    assert!(matches!(
        compiled.bindings.get("v1"),
        Some(Value::Timestamp(ts)) if ts.time() == Time::MIDNIGHT
    ));

    let err = compile_err("Order", "placed > someday");
    assert!(matches!(err, CompileError::InvalidLiteral { expected: "timestamp", .. }));
}

#[test]
fn ulid_literal_parses() {
    let compiled = compile("Order", "reference = 01ARZ3NDEKTSV4RRFFQ69G5FAV");

    assert!(matches!(compiled.bindings.get("v0"), Some(Value::Ulid(_))));
}

#[test]
fn bindings_serialize_as_plain_json() {
    let compiled = compile(
        "Order",
        "placed > 2024-01-01T00:00:00Z AND reference = 01ARZ3NDEKTSV4RRFFQ69G5FAV \
         AND status IN (open, closed)",
    );
    let json = serde_json::to_value(&compiled.bindings).unwrap();

    assert_eq!(
        json,
        serde_json::json!([
            { "name": "v0", "value": "2024-01-01T00:00:00Z" },
            { "name": "v1", "value": "01ARZ3NDEKTSV4RRFFQ69G5FAV" },
            { "name": "v2", "value": ["open", "closed"] },
        ])
    );
}

#[test]
fn invalid_literals_are_rejected() {
    let err = compile_err("Order", "total = abc");
    assert!(matches!(err, CompileError::InvalidLiteral { expected: "float", .. }));

    let err = compile_err("Order", "status = lost");
    let CompileError::UnknownEnumVariant { expected, .. } = err else {
        panic!("expected UnknownEnumVariant, got {err:?}");
    };
    assert_eq!(expected, ["open", "shipped", "closed"]);

    let err = compile_err("Order", "reference = nope");
    assert!(matches!(err, CompileError::InvalidLiteral { expected: "ulid", .. }));
}

#[test]
fn non_finite_floats_are_rejected() {
    let err = type_literal("total", "inf", &ValueType::Float).unwrap_err();
    assert!(matches!(err, CompileError::InvalidLiteral { .. }));
}

#[test]
fn ordering_and_text_match_need_capable_types() {
    let err = compile_err("Order", "archived > true");
    assert!(matches!(err, CompileError::UnsupportedOperator { .. }));
    assert_eq!(Error::from(err).class, ErrorClass::Unsupported);

    let err = compile_err("Order", "total CONTAINS 3");
    assert!(matches!(
        err,
        CompileError::UnsupportedOperator {
            value_type: "float",
            ..
        }
    ));
}

#[test]
fn unknown_paths_surface_resolution_errors() {
    let err = compile_err("Order", "colour = red");
    assert!(matches!(
        err,
        CompileError::Resolve(ResolveError::UnknownProperty { .. })
    ));
    assert_eq!(Error::from(err).class, ErrorClass::Resolution);

    let err = compile_err("Nope", "name = a");
    assert!(matches!(
        err,
        CompileError::Resolve(ResolveError::UnknownEntity { .. })
    ));
}

#[test]
fn empty_field_from_builder_is_rejected_at_resolution() {
    let query = Query::new().add(Constraint::eq("", "x"));
    let err = compiler().compile("Order", &query).unwrap_err();

    assert!(matches!(
        err,
        CompileError::Resolve(ResolveError::MalformedSegment {
            reason: "empty segment",
            ..
        })
    ));
    assert_eq!(Error::from(err).class, ErrorClass::Resolution);
}

#[test]
fn syntax_errors_pass_through() {
    let err = compile_err("Order", "name = a AND");
    assert!(matches!(err, CompileError::Syntax(_)));
    assert!(Error::from(err).is_syntax());
}

// ----------------------------------------------------------------------
// Timestamps
// ----------------------------------------------------------------------

// Wednesday
fn now() -> OffsetDateTime {
    at(2024, Month::March, 13, 10, 30, 0)
}

fn resolve(raw: &str) -> OffsetDateTime {
    resolve_timestamp(raw, now()).expect("timestamp should resolve")
}

#[test]
fn anchors_resolve_against_now() {
    assert_eq!(resolve("now"), now());
    assert_eq!(resolve("today"), at(2024, Month::March, 13, 0, 0, 0));
    assert_eq!(resolve("Tomorrow"), at(2024, Month::March, 14, 0, 0, 0));
    assert_eq!(resolve("yesterday"), at(2024, Month::March, 12, 0, 0, 0));
    assert_eq!(resolve("sow"), at(2024, Month::March, 11, 0, 0, 0));
    assert_eq!(resolve("som"), at(2024, Month::March, 1, 0, 0, 0));
    assert_eq!(resolve("soy"), at(2024, Month::January, 1, 0, 0, 0));
}

#[test]
fn anchors_shift_by_periods() {
    assert_eq!(resolve("today-P1D"), at(2024, Month::March, 12, 0, 0, 0));
    assert_eq!(resolve("now+PT6H"), at(2024, Month::March, 13, 16, 30, 0));
    assert_eq!(resolve("now P1D"), at(2024, Month::March, 14, 10, 30, 0));
    assert_eq!(resolve("som+P1M"), at(2024, Month::April, 1, 0, 0, 0));
    assert_eq!(resolve("soy-P1Y2W"), at(2022, Month::December, 18, 0, 0, 0));
    assert_eq!(resolve("now-pt30m"), at(2024, Month::March, 13, 10, 0, 0));
    assert_eq!(
        resolve("now+PT1.5S"),
        now() + time::Duration::milliseconds(1_500)
    );
}

#[test]
fn month_shifts_clamp_the_day() {
    let end_of_january = at(2024, Month::January, 31, 8, 0, 0);
    let period = Period::parse("P1M").unwrap();

    assert_eq!(
        period.add_to(end_of_january).unwrap(),
        at(2024, Month::February, 29, 8, 0, 0)
    );
    assert_eq!(
        period.negated().add_to(at(2024, Month::March, 31, 0, 0, 0)).unwrap(),
        at(2024, Month::February, 29, 0, 0, 0)
    );
}

#[test]
fn iso_text_of_every_precision_resolves() {
    assert_eq!(resolve("2024-01-01"), at(2024, Month::January, 1, 0, 0, 0));
    assert_eq!(resolve("2024"), at(2024, Month::January, 1, 0, 0, 0));
    assert_eq!(resolve("2024-03"), at(2024, Month::March, 1, 0, 0, 0));
    assert_eq!(
        resolve("2024-01-01T10:00:00"),
        at(2024, Month::January, 1, 10, 0, 0)
    );
    assert_eq!(
        resolve("2024-01-01T10:00:00+02:00"),
        at(2024, Month::January, 1, 8, 0, 0)
    );
}

#[test]
fn malformed_timestamps_are_rejected() {
    assert!(matches!(
        resolve_timestamp("now*P1D", now()),
        Err(TimestampError::AnchorOperator { anchor: Anchor::Now, found: '*' })
    ));

    for (raw, reason) in [
        ("today-1D", "must start with 'P'"),
        ("today-P", "no fields"),
        ("today-P1D1Y", "unknown or out-of-order designator"),
        ("today-P1.5D", "only seconds may be fractional"),
        ("today-PT", "no time fields after 'T'"),
        ("today-P1", "expected a designator after each number"),
        ("today-P1DT1HT1M", "'T' given twice"),
    ] {
        let err = resolve_timestamp(raw, now()).unwrap_err();
        assert!(
            matches!(&err, TimestampError::Period { reason: r, .. } if *r == reason),
            "{raw}: {err:?}"
        );
    }

    assert!(matches!(
        resolve_timestamp("2024-13-01", now()),
        Err(TimestampError::Format(_))
    ));
}

// ----------------------------------------------------------------------
// Subclass filter
// ----------------------------------------------------------------------

#[test]
fn subclass_filter_scopes_to_common_ancestor() {
    let query = Query::new().subclass(["dog", "cat"]);
    let compiled = compiler().compile("Animal", &query).unwrap();

    assert_eq!(compiled.entity, "Animal");
    assert_eq!(
        compiled.predicate,
        Some(CompiledPredicate::TypeIn {
            alias: "mobj".to_string(),
            param: "v0".to_string(),
        })
    );
    assert_eq!(
        compiled.bindings.get("v0"),
        Some(&Value::List(vec![
            Value::Text("cat".to_string()),
            Value::Text("dog".to_string()),
        ]))
    );
}

#[test]
fn subclasses_within_one_branch_scope_to_that_branch() {
    let query = Query::new().subclass(["dog", "puppy"]);
    let compiled = compiler().compile("Animal", &query).unwrap();

    assert_eq!(compiled.entity, "Dog");
    assert_eq!(compiled.predicate, None);
}

#[test]
fn single_subclass_scopes_to_that_class_without_type_filter() {
    let compiled = compiler()
        .compile("Animal", &Query::new().subclass(["dog"]))
        .unwrap();

    assert_eq!(compiled.entity, "Dog");
    assert_eq!(compiled.predicate, None);
    assert!(compiled.bindings.is_empty());
    assert_eq!(
        compiled.to_query_text(),
        "SELECT DISTINCT mobj FROM Dog mobj"
    );
}

#[test]
fn subclass_scope_keeps_constraints_on_the_ancestor() {
    let query = Query::new()
        .subclass(["dog"])
        .add(Constraint::eq("breed", "collie"));
    let compiled = compiler().compile("Animal", &query).unwrap();

    assert_eq!(compiled.entity, "Dog");
    assert_eq!(
        compiled.to_query_text(),
        "SELECT DISTINCT mobj FROM Dog mobj WHERE mobj.breed = :v0"
    );
}

#[test]
fn single_subclass_named_on_itself_adds_no_predicate() {
    let compiled = compiler()
        .compile("Dog", &Query::new().subclass(["puppy"]))
        .unwrap();
    assert_eq!(compiled.entity, "Puppy");
    assert_eq!(compiled.predicate, None);

    let compiled = compiler()
        .compile("Dog", &Query::new().subclass(["dog"]))
        .unwrap();
    assert_eq!(compiled.entity, "Dog");
    assert_eq!(compiled.predicate, None);
}

#[test]
fn subclasses_sharing_only_root_filter_by_type() {
    let query = Query::new().subclass(["puppy", "cat"]);
    let compiled = compiler().compile("Animal", &query).unwrap();

    assert_eq!(compiled.entity, "Animal");
    assert_eq!(
        compiled.bindings.get("v0"),
        Some(&Value::List(vec![
            Value::Text("cat".to_string()),
            Value::Text("puppy".to_string()),
        ]))
    );
    assert_eq!(
        compiled.to_query_text(),
        "SELECT DISTINCT mobj FROM Animal mobj WHERE TYPE(mobj) IN (:v0)"
    );
}

#[test]
fn unknown_discriminator_lists_valid_values() {
    let query = Query::new().subclass(["bird"]);
    let err = compiler().compile("Animal", &query).unwrap_err();

    let CompileError::UnknownDiscriminator { expected, .. } = err else {
        panic!("expected UnknownDiscriminator, got {err:?}");
    };
    assert_eq!(expected, ["cat", "dog", "puppy"]);
}

// ----------------------------------------------------------------------
// Pagination, projection, hints
// ----------------------------------------------------------------------

#[test]
fn pagination_uses_configured_default() {
    let compiled = compiler().compile("Order", &Query::new()).unwrap();

    assert_eq!(
        compiled.pagination,
        Pagination {
            offset: None,
            limit: PageLimit::Rows(crate::DEFAULT_LIMIT),
        }
    );

    let query = Query::new().offset(20).limit(10).unwrap();
    let compiled = compiler().compile("Order", &query).unwrap();
    assert_eq!(compiled.pagination.offset, Some(20));
    assert_eq!(compiled.pagination.limit, PageLimit::Rows(10));
}

#[test]
fn zero_row_limit_still_computes_size() {
    let query = Query::new()
        .limit(crate::LIMIT_RETURN_ZERO)
        .unwrap()
        .compute_size(true)
        .add(Constraint::eq("name", "a"));
    let compiled = compiler().compile("Order", &query).unwrap();

    assert!(compiled.is_zero_rows());
    let size = compiled.size_query().expect("size query requested");
    assert_eq!(size.projection, Projection::Count);
    assert_eq!(size.pagination, Pagination::UNBOUNDED);
    assert_eq!(
        size.to_query_text(),
        "SELECT COUNT(DISTINCT mobj.id) FROM Order mobj WHERE mobj.name = :v0"
    );
}

#[test]
fn count_projection_drops_ordering_and_paging() {
    let compiled = compile("Order", "SELECT count ORDER BY name");

    assert!(compiled.ordering.is_empty());
    assert_eq!(compiled.pagination, Pagination::UNBOUNDED);
    assert_eq!(compiled.size_query(), None);
}

#[test]
fn id_projection_selects_order_columns() {
    let compiled = compile("Order", "SELECT id ORDER BY name");
    assert_eq!(
        compiled.to_query_text(),
        "SELECT DISTINCT mobj.id, mobj.name FROM Order mobj ORDER BY mobj.name ASC"
    );

    let options = CompileConfig {
        order_by_without_select: true,
        ..CompileConfig::default()
    };
    let compiled = Compiler::new(models(), options, crate::DEFAULT_LIMIT)
        .compile_text("Order", "SELECT id ORDER BY name")
        .unwrap();
    assert_eq!(
        compiled.to_query_text(),
        "SELECT DISTINCT mobj.id FROM Order mobj ORDER BY mobj.name ASC"
    );
}

#[test]
fn fetch_hints_resolve_to_relation_paths() {
    let query = Query::new()
        .dbfetch(["customer", "items.parts"])
        .expand(["items", "-customer"]);
    let compiled = compiler().compile("Order", &query).unwrap();

    assert_eq!(compiled.fetch_relations, ["mobj.customer", "j0.parts"]);
    assert_eq!(compiled.expand, ["items", "-customer"]);
    assert_eq!(compiled.joins.len(), 1);
}

#[test]
fn configured_prefixes_name_aliases_and_params() {
    let options = CompileConfig {
        root_alias: "root".to_string(),
        join_alias_prefix: "x".to_string(),
        param_prefix: "p".to_string(),
        order_by_without_select: false,
    };
    let compiled = Compiler::new(models(), options, crate::DEFAULT_LIMIT)
        .compile_text("Order", "items.sku = a")
        .unwrap();

    assert_eq!(
        compiled.to_query_text(),
        "SELECT DISTINCT root FROM Order root LEFT OUTER JOIN root.items x0 WHERE x0.sku = :p0"
    );
}

#[test]
fn each_compilation_starts_fresh() {
    let compiler = compiler();
    let first = compiler.compile_text("Order", "items.sku = a").unwrap();
    let second = compiler.compile_text("Order", "items.sku = b").unwrap();

    assert_eq!(first.joins, second.joins);
    assert_eq!(second.bindings.len(), 1);
    assert_eq!(second.bindings[0].name, "v0");
}
