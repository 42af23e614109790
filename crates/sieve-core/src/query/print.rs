use crate::query::{
    ast::{Constraint, Group, GroupOp, Line, Operand},
    codec::EncodeError,
    intent::{Projection, Query},
    lexer::is_word_char,
    parser::{is_clause_word, is_comparison_word},
};

const QUOTES: [char; 3] = ['\'', '"', '`'];

/// Render a literal so the tokenizer reads it back as one token.
///
/// Numbers and bare words print as-is; anything else, including words that
/// read as operators, is wrapped in the first quote character it does not
/// contain.
pub fn quote_value(value: &str) -> Result<String, EncodeError> {
    if is_bare(value) && !is_comparison_word(value) {
        return Ok(value.to_string());
    }

    QUOTES
        .into_iter()
        .find(|quote| !value.contains(*quote))
        .map(|quote| format!("{quote}{value}{quote}"))
        .ok_or_else(|| EncodeError::UnquotableValue {
            value: value.to_string(),
        })
}

// Numbers (including signs and decimals) are already bare words.
fn is_bare(value: &str) -> bool {
    !value.is_empty() && !value.starts_with("--") && value.chars().all(is_word_char)
}

/// Print a single constraint.
pub fn print_constraint(constraint: &Constraint) -> Result<String, EncodeError> {
    let mut out = String::new();
    write_constraint(&mut out, constraint)?;

    Ok(out)
}

/// Print a constraint or group.
pub fn print_line(line: &Line) -> Result<String, EncodeError> {
    let mut out = String::new();
    write_line(&mut out, line)?;

    Ok(out)
}

/// Print the children of an implicit top-level AND without outer brackets.
pub fn print_top_level(group: &Group) -> Result<String, EncodeError> {
    let mut out = String::new();

    if group.op() != GroupOp::And {
        let line = Line::Group(group.clone());
        write_leading(&mut out, &line)?;
        return Ok(out);
    }

    for (i, line) in group.children().iter().enumerate() {
        if i == 0 {
            write_leading(&mut out, line)?;
        } else {
            out.push_str(" AND ");
            write_line(&mut out, line)?;
        }
    }

    Ok(out)
}

// `where NOT IN (..)` at the very start reads as a WHERE clause; brackets
// keep it a field expression.
fn write_leading(out: &mut String, line: &Line) -> Result<(), EncodeError> {
    if opens_with_clause_word(line) {
        out.push('(');
        write_line(out, line)?;
        out.push(')');
        Ok(())
    } else {
        write_line(out, line)
    }
}

fn opens_with_clause_word(line: &Line) -> bool {
    match line {
        Line::Constraint(constraint) => {
            is_clause_word(constraint.field())
                && constraint.function().keyword().starts_with("NOT ")
        }
        Line::Group(group) => match group.children() {
            [only] if group.op() != GroupOp::None => opens_with_clause_word(only),
            _ => false,
        },
    }
}

fn write_line(out: &mut String, line: &Line) -> Result<(), EncodeError> {
    match line {
        Line::Constraint(constraint) => write_constraint(out, constraint),
        Line::Group(group) => write_group(out, group),
    }
}

fn write_group(out: &mut String, group: &Group) -> Result<(), EncodeError> {
    let children = group.children();

    if group.op() == GroupOp::None {
        out.push_str("NOT(");
        write_joined(out, children, " OR ")?;
        out.push(')');
        return Ok(());
    }

    match children {
        [] => out.push_str("()"),
        [only] => write_line(out, only)?,
        _ => {
            out.push('(');
            write_joined(out, children, &format!(" {} ", group.op().keyword()))?;
            out.push(')');
        }
    }

    Ok(())
}

fn write_joined(out: &mut String, lines: &[Line], separator: &str) -> Result<(), EncodeError> {
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        write_line(out, line)?;
    }

    Ok(())
}

// Field names print bare, so they must read back as a single word.
fn printable_field(field: &str) -> Result<&str, EncodeError> {
    let starts_like_field = field
        .chars()
        .next()
        .is_some_and(|ch| ch.is_alphabetic() || ch == '_');
    if starts_like_field && field.chars().all(is_word_char) {
        Ok(field)
    } else {
        Err(EncodeError::UnprintableField {
            field: field.to_string(),
        })
    }
}

fn write_constraint(out: &mut String, constraint: &Constraint) -> Result<(), EncodeError> {
    out.push_str(printable_field(constraint.field())?);
    out.push(' ');
    out.push_str(constraint.function().keyword());

    match constraint.operand() {
        Operand::None => {}
        Operand::Value(value) => {
            out.push(' ');
            out.push_str(&quote_value(value)?);
        }
        Operand::Range(low, high) => {
            out.push_str(&format!(" {} AND {}", quote_value(low)?, quote_value(high)?));
        }
        Operand::List(values) => {
            let quoted = values
                .iter()
                .map(|value| quote_value(value))
                .collect::<Result<Vec<_>, _>>()?;
            out.push_str(&format!(" ({})", quoted.join(", ")));
        }
    }

    Ok(())
}

impl Query {
    /// Constraints only, as accepted by the `q` flat-codec field.
    pub fn constraints_text(&self) -> Result<String, EncodeError> {
        print_top_level(self.constraint_group())
    }

    /// Full text form: SELECT, EXPAND, WHERE, and ORDER BY clauses.
    pub fn to_query_text(&self) -> Result<String, EncodeError> {
        let mut out = String::new();

        if self.projection_mode() != Projection::Entities {
            out.push_str(&format!("SELECT\n\t{}\n", self.projection_mode()));
        }

        if !self.expansions().is_empty() {
            let relations = self
                .expansions()
                .iter()
                .map(|relation| match relation.strip_prefix('-') {
                    Some(rest) => quote_value(&format!("not:{rest}")),
                    None => quote_value(relation),
                })
                .collect::<Result<Vec<_>, _>>()?;
            out.push_str(&format!("EXPAND\n\t{}\n", relations.join(", ")));
        }

        out.push_str("WHERE\n\t");
        out.push_str(&self.constraints_text()?);

        if !self.orderings().is_empty() {
            out.push_str("\nORDER BY ");
            for (i, ordering) in self.orderings().iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n\t");
                }
                out.push_str(&quote_value(&ordering.field)?);
                out.push(' ');
                out.push_str(ordering.direction.keyword());
            }
        }

        Ok(out)
    }
}
