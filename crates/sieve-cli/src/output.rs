use crate::{cli::Format, error::CliResult};
use serde::Serialize;
use sieve::{
    CompiledQuery, FlatMap, Query,
    core::{
        compile::PageLimit,
        model::EntityModel,
        query::{GroupOp, Line, print_constraint},
    },
};

fn json(value: &impl Serialize) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn query(query: &Query, format: Format) -> CliResult<String> {
    match format {
        Format::Text => Ok(query.to_query_text().map_err(sieve::Error::from)?),
        Format::Json => json(query),
    }
}

/// Indented constraint tree, one line per node.
pub fn tree(query: &Query, format: Format) -> CliResult<String> {
    if format == Format::Json {
        return json(query);
    }

    let mut lines = Vec::new();
    let root = query.constraint_group();
    lines.push(group_label(root.op()).to_string());
    for child in root.children() {
        tree_line(child, 1, &mut lines)?;
    }

    Ok(lines.join("\n"))
}

const fn group_label(op: GroupOp) -> &'static str {
    match op {
        GroupOp::And => "AND",
        GroupOp::Or => "OR",
        GroupOp::None => "NONE",
    }
}

fn tree_line(line: &Line, depth: usize, lines: &mut Vec<String>) -> CliResult<()> {
    let indent = "  ".repeat(depth);
    match line {
        Line::Constraint(constraint) => {
            let text = print_constraint(constraint).map_err(sieve::Error::from)?;
            lines.push(format!("{indent}{text}"));
        }
        Line::Group(group) => {
            lines.push(format!("{indent}{}", group_label(group.op())));
            for child in group.children() {
                tree_line(child, depth + 1, lines)?;
            }
        }
    }

    Ok(())
}

pub fn flat(map: &FlatMap, format: Format) -> CliResult<String> {
    if format == Format::Json {
        return json(map);
    }

    let lines: Vec<String> = map
        .iter()
        .flat_map(|(key, values)| values.iter().map(move |value| format!("{key}={value}")))
        .collect();

    Ok(lines.join("\n"))
}

pub fn compiled(compiled: &CompiledQuery, format: Format) -> CliResult<String> {
    if format == Format::Json {
        return json(compiled);
    }

    let mut lines = vec![compiled.to_query_text()];
    lines.extend(compiled.bindings.iter().map(|binding| format!("  {binding}")));

    let mut limit = match compiled.pagination.limit {
        PageLimit::Unbounded => "-- limit none".to_string(),
        PageLimit::Rows(rows) => format!("-- limit {rows}"),
        PageLimit::ZeroRows => "-- limit 0 (size only)".to_string(),
    };
    if let Some(offset) = compiled.pagination.offset {
        limit.push_str(&format!(", offset {offset}"));
    }
    lines.push(limit);
    if !compiled.fetch_relations.is_empty() {
        lines.push(format!("-- fetch {}", compiled.fetch_relations.join(", ")));
    }
    if let Some(size) = compiled.size_query() {
        lines.push(format!("-- size {size}"));
    }

    Ok(lines.join("\n"))
}

pub fn entity(model: &EntityModel, format: Format) -> CliResult<String> {
    if format == Format::Json {
        return json(model);
    }

    let mut lines = vec![if model.is_abstract {
        format!("{} (abstract)", model.name)
    } else {
        model.name.clone()
    }];
    lines.push(format!("  key: {}", model.primary_key));
    lines.push(format!("  discriminator: {}", model.discriminator));
    for (name, value_type) in &model.properties {
        lines.push(format!("  {name}: {}", value_type.label()));
    }
    for (name, relation) in &model.relations {
        let arity = if relation.is_collection() { "*" } else { "" };
        lines.push(format!("  {name} -> {}{arity}", relation.target));
    }
    for (name, path) in &model.aliases {
        lines.push(format!("  {name} = {path}"));
    }
    if !model.subclasses.is_empty() {
        lines.push(format!("  subclasses: {}", model.subclasses.join(", ")));
    }

    Ok(lines.join("\n"))
}
