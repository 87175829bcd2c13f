use std::cmp::Ordering;

use serde_json::Value;

use crate::document::{Document, pointer};

/// A predicate over a document body.
///
/// Field paths are dot-separated (`"shipping.city"`, `"vendor_info.is_approved"`).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// The field equals `value`.
    Eq { path: String, value: Value },

    /// At least one element of the array at `array` has `field == value`.
    AnyElement {
        array: String,
        field: String,
        value: Value,
    },

    /// Every element of the array at `array` has `field == value`.
    AllElements {
        array: String,
        field: String,
        value: Value,
    },

    /// Case-insensitive substring match on a string field.
    Contains { path: String, needle: String },

    /// Integer field within the inclusive range.
    Range {
        path: String,
        min: Option<i64>,
        max: Option<i64>,
    },
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn any_element(
        array: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Filter::AnyElement {
            array: array.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn all_elements(
        array: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Filter::AllElements {
            array: array.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(path: impl Into<String>, needle: impl Into<String>) -> Self {
        Filter::Contains {
            path: path.into(),
            needle: needle.into(),
        }
    }

    pub fn range(path: impl Into<String>, min: Option<i64>, max: Option<i64>) -> Self {
        Filter::Range {
            path: path.into(),
            min,
            max,
        }
    }

    /// Evaluates the filter against a JSON body.
    pub fn matches(&self, body: &Value) -> bool {
        match self {
            Filter::Eq { path, value } => body.pointer(&pointer(path)) == Some(value),
            Filter::AnyElement {
                array,
                field,
                value,
            } => elements(body, array)
                .is_some_and(|mut items| items.any(|item| item.pointer(&pointer(field)) == Some(value))),
            Filter::AllElements {
                array,
                field,
                value,
            } => elements(body, array)
                .is_some_and(|mut items| items.all(|item| item.pointer(&pointer(field)) == Some(value))),
            Filter::Contains { path, needle } => body
                .pointer(&pointer(path))
                .and_then(Value::as_str)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            Filter::Range { path, min, max } => {
                match body.pointer(&pointer(path)).and_then(Value::as_i64) {
                    Some(n) => min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi),
                    None => false,
                }
            }
        }
    }
}

fn elements<'a>(body: &'a Value, array: &str) -> Option<impl Iterator<Item = &'a Value>> {
    body.pointer(&pointer(array))
        .and_then(Value::as_array)
        .map(|items| items.iter())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// What to order query results by.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Insertion timestamp.
    #[default]
    CreatedAt,
    /// A field inside the body.
    Field(String),
}

/// Builder for collection queries.
///
/// All filters must hold for a document to match.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query over every document in `collection`.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            sort: SortKey::default(),
            order: SortOrder::default(),
            limit: None,
            offset: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort = key;
        self.order = order;
        self
    }

    /// Orders results newest first.
    pub fn newest_first(self) -> Self {
        self.sort_by(SortKey::CreatedAt, SortOrder::Descending)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns a copy without paging, for counting matches.
    pub fn unpaged(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.collection == self.collection && self.filters.iter().all(|f| f.matches(&doc.body))
    }

    /// Orders two documents according to the query's sort key.
    pub(crate) fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = match &self.sort {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Field(path) => compare_values(a.field(path), b.field(path)),
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
