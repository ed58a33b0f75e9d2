//! Document identifiers.
//!
//! Every entity in the system is keyed by a 12-byte object id rendered as 24
//! lowercase hex characters. Identifiers coming from callers are parsed here so
//! that a malformed value is rejected before any storage call is made.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string is not a valid object id.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid object id '{0}': expected 24 hex characters")]
pub struct InvalidObjectId(pub String);

/// A 12-byte document identifier.
///
/// Ids generated in the same process sort in creation order, which the track
/// log relies on to break ties between entries written in the same second.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(bson::oid::ObjectId);

impl ObjectId {
	/// Generates a fresh identifier.
	pub fn new() -> Self {
		Self(bson::oid::ObjectId::new())
	}

	/// Parses a 24 character hex string.
	pub fn parse(value: &str) -> Result<Self, InvalidObjectId> {
		bson::oid::ObjectId::parse_str(value)
			.map(Self)
			.map_err(|_| InvalidObjectId(value.to_string()))
	}

	/// Returns the lowercase hex representation.
	pub fn to_hex(&self) -> String {
		self.0.to_hex()
	}

	/// Returns the raw bytes.
	pub fn bytes(&self) -> [u8; 12] {
		self.0.bytes()
	}
}

impl Default for ObjectId {
	fn default() -> Self {
		Self::new()
	}
}

impl Ord for ObjectId {
	fn cmp(&self, other: &Self) -> Ordering {
		self.bytes().cmp(&other.bytes())
	}
}

impl PartialOrd for ObjectId {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl fmt::Display for ObjectId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl fmt::Debug for ObjectId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ObjectId({})", self.to_hex())
	}
}

impl FromStr for ObjectId {
	type Err = InvalidObjectId;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl Serialize for ObjectId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> Deserialize<'de> for ObjectId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = String::deserialize(deserializer)?;
		Self::parse(&value).map_err(de::Error::custom)
	}
}

impl From<ObjectId> for serde_json::Value {
	fn from(id: ObjectId) -> Self {
		serde_json::Value::String(id.to_hex())
	}
}
