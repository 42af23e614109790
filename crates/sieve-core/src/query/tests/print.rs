use crate::query::{
    Constraint, EncodeError, Group, GroupOp, Line, OrderDirection, Projection, Query,
    print_constraint, print_line, quote_value,
};

#[test]
fn quoting_picks_first_absent_quote() {
    assert_eq!(quote_value("abc").unwrap(), "abc");
    assert_eq!(quote_value("-1.5").unwrap(), "-1.5");
    assert_eq!(quote_value("a b").unwrap(), "'a b'");
    assert_eq!(quote_value("O'Brien").unwrap(), "\"O'Brien\"");
    assert_eq!(quote_value("'\"").unwrap(), "`'\"`");
    assert_eq!(quote_value("").unwrap(), "''");
    assert_eq!(quote_value("--x").unwrap(), "'--x'");
    assert!(matches!(
        quote_value("'\"`"),
        Err(EncodeError::UnquotableValue { .. })
    ));
}

#[test]
fn operator_words_are_quoted_but_keywords_are_not() {
    assert_eq!(quote_value("in").unwrap(), "'in'");
    assert_eq!(quote_value("Between").unwrap(), "'Between'");
    assert_eq!(quote_value("contains").unwrap(), "'contains'");
    assert_eq!(quote_value("order").unwrap(), "order");
    assert_eq!(quote_value("and").unwrap(), "and");
}

#[test]
fn reserved_field_names_print_bare_and_unreadable_ones_fail() {
    assert_eq!(
        print_constraint(&Constraint::eq("order", "in")).unwrap(),
        "order = 'in'"
    );
    assert_eq!(
        print_constraint(&Constraint::eq("2nd", "x")),
        Err(EncodeError::UnprintableField {
            field: "2nd".to_string(),
        })
    );
}

#[test]
fn leading_clause_word_with_negated_operator_is_bracketed() {
    let query = Query::new()
        .add(Constraint::not_in("where", ["1"]).unwrap())
        .add(Constraint::not_in("select", ["2"]).unwrap());

    let text = query.constraints_text().unwrap();
    assert_eq!(text, "(where NOT IN (1)) AND select NOT IN (2)");
    assert_eq!(
        Query::parse(&text).unwrap().constraint_group(),
        query.constraint_group()
    );

    let full = query.to_query_text().unwrap();
    assert_eq!(
        Query::parse(&full).unwrap().constraint_group(),
        query.constraint_group()
    );
}

#[test]
fn constraints_print_canonical_operators() {
    let cases = [
        (Constraint::eq("a", "1"), "a = 1"),
        (Constraint::neq("a", "x y"), "a != 'x y'"),
        (Constraint::is_not_null("a"), "a IS NOT NULL"),
        (Constraint::range("a", "1", "2"), "a BETWEEN 1 AND 2"),
        (Constraint::in_list("a", ["1", "b c"]).unwrap(), "a IN (1, 'b c')"),
        (Constraint::not_in("a", ["1"]).unwrap(), "a NOT IN (1)"),
        (Constraint::starts_with("a", "x"), "a STARTS x"),
        (Constraint::neq_ref("a", "b.c"), "a NEQREF b.c"),
    ];

    for (constraint, expected) in cases {
        assert_eq!(print_constraint(&constraint).unwrap(), expected);
    }
}

#[test]
fn groups_print_with_brackets_and_none_as_not() {
    let group: Line = Group::and()
        .with(Constraint::eq("a", "1"))
        .with(
            Group::new(GroupOp::None)
                .with(Constraint::eq("b", "1"))
                .with(Constraint::eq("c", "1")),
        )
        .into();

    assert_eq!(
        print_line(&group).unwrap(),
        "(a = 1 AND NOT(b = 1 OR c = 1))"
    );
}

#[test]
fn full_query_text() {
    let query = Query::new()
        .add(Constraint::eq("a", "1"))
        .add(Constraint::gt("b", "2"))
        .projection(Projection::Count)
        .expand(["items", "-customer"])
        .order("a", OrderDirection::Desc)
        .unwrap()
        .order_asc("b")
        .unwrap();

    assert_eq!(query.constraints_text().unwrap(), "a = 1 AND b > 2");
    assert_eq!(
        query.to_query_text().unwrap(),
        "SELECT\n\tcount\nEXPAND\n\titems, not:customer\nWHERE\n\ta = 1 AND b > 2\nORDER BY a DESC,\n\tb ASC"
    );

    let reparsed = Query::parse(&query.to_query_text().unwrap()).unwrap();
    assert_eq!(reparsed.projection_mode(), Projection::Count);
    assert_eq!(reparsed.expansions(), ["items", "-customer"]);
    assert_eq!(reparsed.orderings(), query.orderings());
    assert_eq!(reparsed.constraint_group(), query.constraint_group());
}
