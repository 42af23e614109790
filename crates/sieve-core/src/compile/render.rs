use crate::{
    compile::{CompiledPredicate, CompiledQuery},
    query::Projection,
};
use std::fmt;

impl CompiledQuery {
    /// Parameterized query text, e.g.
    /// `SELECT DISTINCT mobj FROM Order mobj LEFT OUTER JOIN mobj.items j0 WHERE j0.sku = :v0`.
    #[must_use]
    pub fn to_query_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = &self.root_alias;
        f.write_str("SELECT ")?;

        match self.projection {
            Projection::Count => {
                write!(f, "COUNT(DISTINCT {alias}.{})", self.primary_key)?;
            }
            Projection::Entities | Projection::Ids => {
                let selected = match self.projection {
                    Projection::Ids => format!("{alias}.{}", self.primary_key),
                    _ => alias.clone(),
                };
                write!(f, "DISTINCT {selected}")?;

                if !self.order_by_without_select {
                    for order in &self.ordering {
                        if order.column != selected {
                            write!(f, ", {}", order.column)?;
                        }
                    }
                }
            }
        }

        write!(f, " FROM {} {alias}", self.entity)?;
        for join in &self.joins {
            write!(f, " LEFT OUTER JOIN {} {}", join.path(), join.alias)?;
        }

        match &self.predicate {
            Some(CompiledPredicate::And(children)) => {
                f.write_str(" WHERE ")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" AND ")?;
                    }
                    write!(f, "{child}")?;
                }
            }
            Some(predicate) => write!(f, " WHERE {predicate}")?,
            None => {}
        }

        for (i, order) in self.ordering.iter().enumerate() {
            f.write_str(if i == 0 { " ORDER BY " } else { ", " })?;
            write!(f, "{} {}", order.column, order.direction.keyword())?;
        }

        Ok(())
    }
}
