//! Document filters shared by every storage backend.
//!
//! A [`Filter`] is a conjunction of equality and membership conditions over
//! document fields. Dotted paths address fields of embedded documents, so
//! `order.id` matches the id of the order snapshot inside a history record.

use serde_json::Value;

/// A single condition on one document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
	/// The field equals the value.
	Eq { field: String, value: Value },
	/// The field equals one of the values.
	In { field: String, values: Vec<Value> },
}

impl Condition {
	/// Name of the field the condition applies to.
	pub fn field(&self) -> &str {
		match self {
			Condition::Eq { field, .. } | Condition::In { field, .. } => field,
		}
	}

	fn matches(&self, document: &Value) -> bool {
		let Some(actual) = lookup(document, self.field()) else {
			return false;
		};
		match self {
			Condition::Eq { value, .. } => actual == value,
			Condition::In { values, .. } => values.iter().any(|v| v == actual),
		}
	}
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
	conditions: Vec<Condition>,
}

impl Filter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a `field == value` condition.
	pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.conditions.push(Condition::Eq {
			field: field.into(),
			value: value.into(),
		});
		self
	}

	/// Adds a `field IN values` condition.
	pub fn any_of<V: Into<Value>>(
		mut self,
		field: impl Into<String>,
		values: impl IntoIterator<Item = V>,
	) -> Self {
		self.conditions.push(Condition::In {
			field: field.into(),
			values: values.into_iter().map(Into::into).collect(),
		});
		self
	}

	pub fn conditions(&self) -> &[Condition] {
		&self.conditions
	}

	/// Evaluates the filter against a JSON document.
	pub fn matches(&self, document: &Value) -> bool {
		self.conditions.iter().all(|c| c.matches(document))
	}
}

/// Resolves a dotted field path inside a document.
fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
	path.split('.').try_fold(document, |value, key| value.get(key))
}
