use crate::query::{
    Constraint, EncodeError, FlatCodec, FunctionKind, Group, GroupOp, Line, Operand, Query,
    QueryError,
};

#[test]
fn construction_checks_operand_shape() {
    assert_eq!(
        Constraint::new("a", FunctionKind::Eq, Operand::None),
        Err(QueryError::OperandMismatch {
            field: "a".to_string(),
            function: FunctionKind::Eq,
            expected: crate::query::Arity::Unary,
        })
    );
    assert_eq!(
        Constraint::new("", FunctionKind::IsNull, Operand::None),
        Err(QueryError::EmptyField)
    );
    assert_eq!(
        Constraint::in_list("a", Vec::<String>::new()),
        Err(QueryError::EmptyList {
            field: "a".to_string()
        })
    );
    assert!(Constraint::field_ref("a", FunctionKind::Eq, "b").is_err());
    assert_eq!(
        Constraint::field_ref("a", FunctionKind::GeRef, "b").unwrap(),
        Constraint::ge_ref("a", "b")
    );
}

#[test]
fn infallible_builders_defer_the_empty_field_check() {
    assert_eq!(
        Constraint::new("", FunctionKind::Eq, Operand::Value("x".to_string())),
        Err(QueryError::EmptyField)
    );

    let query = Query::new().add(Constraint::eq("", "x"));
    assert_eq!(query.constraint_group().len(), 1);

    let codec = FlatCodec::default();
    assert!(matches!(
        codec.encode_simple(&query),
        Err(EncodeError::NotSimple { .. })
    ));
    assert_eq!(
        codec.encode(&query),
        Err(EncodeError::UnprintableField {
            field: String::new(),
        })
    );
}

#[test]
fn accessors_expose_operands() {
    let range = Constraint::range("a", "1", "2");
    assert_eq!(range.value(), Some("1"));
    assert_eq!(range.value2(), Some("2"));
    assert!(range.values().is_empty());

    let null = Constraint::is_null("a");
    assert_eq!(null.value(), None);
}

#[test]
fn every_function_but_range_inverts_both_ways() {
    for function in FunctionKind::ALL {
        match function.inverse() {
            Some(inverse) => assert_eq!(inverse.inverse(), Some(function), "{function:?}"),
            None => assert_eq!(function, FunctionKind::Range),
        }
    }
}

#[test]
fn negating_and_applies_de_morgan() {
    let line: Line = Group::and()
        .with(Constraint::eq("a", "1"))
        .with(Constraint::lt("b", "2"))
        .into();

    assert_eq!(
        line.negate(),
        Group::or()
            .with(Constraint::neq("a", "1"))
            .with(Constraint::ge("b", "2"))
            .into()
    );
}

#[test]
fn negating_or_yields_none_and_back() {
    let or: Line = Group::or()
        .with(Constraint::eq("a", "1"))
        .with(Constraint::eq("b", "2"))
        .into();

    let none = or.clone().negate();
    assert!(matches!(&none, Line::Group(g) if g.op() == GroupOp::None));
    assert_eq!(none.negate(), or);
}

#[test]
fn negating_range_wraps_in_none() {
    let range = Constraint::range("a", "1", "2");
    let negated = Line::from(range.clone()).negate();

    assert_eq!(
        negated,
        Group::new(GroupOp::None).with(range.clone()).into()
    );
    assert_eq!(negated.negate(), Line::Constraint(range));
}

#[test]
fn eq_any_builds_or_for_several_values() {
    assert_eq!(
        Group::eq_any("a", ["1"]),
        Line::Constraint(Constraint::eq("a", "1"))
    );
    assert_eq!(
        Group::eq_any("a", ["1", "2"]),
        Group::or()
            .with(Constraint::eq("a", "1"))
            .with(Constraint::eq("a", "2"))
            .into()
    );
}

#[test]
fn collapse_keeps_none_groups() {
    let single = Group::and().with(Constraint::eq("a", "1"));
    assert_eq!(single.collapse(), Line::Constraint(Constraint::eq("a", "1")));

    let none = Group::new(GroupOp::None).with(Constraint::eq("a", "1"));
    assert!(matches!(none.collapse(), Line::Group(_)));
}
