use std::cmp::Ordering;

use chrono::DateTime;
use serde_json::Value;

use crate::Row;

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Compares the way the REST backend does: both sides as text.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column).is_some_and(|value| self.matches_value(value))
    }

    pub fn matches_value(&self, value: &Value) -> bool {
        value == &self.value || render_value(value) == render_value(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }

    /// Orders two rows by this column. Missing and null values sort as the
    /// largest value, matching the backend's NULLS LAST / NULLS FIRST defaults.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let ord = compare_values(a.get(&self.column), b.get(&self.column));
        if self.ascending {
            ord
        } else {
            ord.reverse()
        }
    }
}

/// A read against one table. An empty column list selects every column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Select {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn builder() -> SelectBuilder {
        SelectBuilder(Self::default())
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Keeps only the selected columns of `row`.
    pub fn project(&self, row: &Row) -> Row {
        if self.columns.is_empty() || self.columns.iter().any(|c| c == "*") {
            return row.clone();
        }
        self.columns
            .iter()
            .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
            .collect()
    }
}

pub struct SelectBuilder(Select);

impl SelectBuilder {
    pub fn column(mut self, column: &str) -> Self {
        self.0.columns.push(column.to_owned());
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.0.order = Some(Order::asc(column));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.0.order = Some(Order::desc(column));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.0.limit = Some(limit);
        self
    }

    pub fn build(self) -> Select {
        self.0
    }
}

/// Text form of a value as it appears in a query string.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_owned(),
        other => other.to_string(),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => render_value(x).cmp(&render_value(y)),
    }
}
