//! Validated field types and serde helpers for BSON-aware field encodings.

use std::{fmt, ops::Deref, str::FromStr};

use bson::{Bson, Document, doc, oid::ObjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A string that is guaranteed to hold a valid ObjectId.
///
/// Deserializes from either a BSON ObjectId or its hex string and always
/// serializes as a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdStr {
    hex: String,
    oid: ObjectId,
}

impl ObjectIdStr {
    /// Validates `value` as an ObjectId hex string
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let hex = value.into();
        match ObjectId::parse_str(&hex) {
            Ok(oid) => Ok(Self { hex, oid }),
            Err(_) => Err(ValidationError::InvalidObjectId(hex)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hex
    }

    pub fn into_string(self) -> String {
        self.hex
    }

    /// The ObjectId this string represents
    pub fn object_id(&self) -> ObjectId {
        self.oid
    }
}

impl From<ObjectId> for ObjectIdStr {
    fn from(oid: ObjectId) -> Self {
        Self { hex: oid.to_hex(), oid }
    }
}

impl From<ObjectIdStr> for ObjectId {
    fn from(value: ObjectIdStr) -> Self {
        value.oid
    }
}

impl From<ObjectIdStr> for Bson {
    fn from(value: ObjectIdStr) -> Self {
        Bson::String(value.hex)
    }
}

impl TryFrom<String> for ObjectIdStr {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl FromStr for ObjectIdStr {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Deref for ObjectIdStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.hex
    }
}

impl AsRef<str> for ObjectIdStr {
    fn as_ref(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ObjectIdStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

impl Serialize for ObjectIdStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawObjectId {
    Native(ObjectId),
    Text(String),
}

impl<'de> Deserialize<'de> for ObjectIdStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawObjectId::deserialize(deserializer)? {
            RawObjectId::Native(oid) => Ok(oid.into()),
            RawObjectId::Text(text) => Self::parse(text).map_err(serde::de::Error::custom),
        }
    }
}

/// An optionally bounded datetime interval, usable as a query filter.
///
/// Deserializes from `[gte, lte]` or `{"gte": .., "lte": ..}`; either bound
/// may be null. Bounds that cross are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawDateTimeRange")]
pub struct DateTimeRange {
    pub gte: Option<DateTime<Utc>>,
    pub lte: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDateTimeRange {
    Pair(Option<DateTime<Utc>>, Option<DateTime<Utc>>),
    Bounds {
        #[serde(default)]
        gte: Option<DateTime<Utc>>,
        #[serde(default)]
        lte: Option<DateTime<Utc>>,
    },
}

impl TryFrom<RawDateTimeRange> for DateTimeRange {
    type Error = ValidationError;

    fn try_from(value: RawDateTimeRange) -> Result<Self, Self::Error> {
        match value {
            RawDateTimeRange::Pair(gte, lte) | RawDateTimeRange::Bounds { gte, lte } => {
                Self::new(gte, lte)
            }
        }
    }
}

impl DateTimeRange {
    pub fn new(
        gte: Option<DateTime<Utc>>,
        lte: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        if let (Some(lower), Some(upper)) = (gte, lte) {
            if lower > upper {
                return Err(ValidationError::DatetimeBorderCrossing);
            }
        }
        Ok(Self { gte, lte })
    }

    pub fn contains(&self, value: &DateTime<Utc>) -> bool {
        self.gte.is_none_or(|lower| *value >= lower) && self.lte.is_none_or(|upper| *value <= upper)
    }

    /// Renders the range as a MongoDB comparison document, omitting open bounds
    pub fn to_filter(&self) -> Document {
        let mut filter = doc! {};
        if let Some(lower) = self.gte {
            filter.insert("$gte", bson::DateTime::from_chrono(lower));
        }
        if let Some(upper) = self.lte {
            filter.insert("$lte", bson::DateTime::from_chrono(upper));
        }
        filter
    }
}

/// Stores a `chrono::DateTime<Utc>` as a BSON datetime.
///
/// Decoding also accepts RFC 3339 strings. Use with
/// `#[serde(with = "mantle::types::datetime")]`.
pub mod datetime {
    use super::*;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        bson::DateTime::from_chrono(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        from_bson(Bson::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }

    pub(super) fn from_bson(value: Bson) -> Result<DateTime<Utc>, String> {
        match value {
            Bson::DateTime(datetime) => Ok(datetime.to_chrono()),
            Bson::String(text) => DateTime::parse_from_rfc3339(&text)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|e| format!("invalid datetime {text:?}: {e}")),
            other => Err(format!("expected a datetime, got {other}")),
        }
    }

    /// `Option<DateTime<Utc>>` variant; null decodes to `None`.
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.map(bson::DateTime::from_chrono).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<Bson>::deserialize(deserializer)? {
                None | Some(Bson::Null) => Ok(None),
                Some(value) => from_bson(value).map(Some).map_err(serde::de::Error::custom),
            }
        }
    }
}

/// Stores a `rust_decimal::Decimal` as BSON Decimal128.
///
/// Decoding also accepts strings, integers and doubles. Use with
/// `#[serde(with = "mantle::types::decimal")]`.
pub mod decimal {
    use bson::Decimal128;
    use rust_decimal::Decimal;

    use super::*;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        to_decimal128(value)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        from_bson(Bson::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }

    pub fn to_decimal128(value: &Decimal) -> Result<Decimal128, String> {
        Decimal128::from_str(&value.to_string()).map_err(|e| format!("{value} is not representable as Decimal128: {e}"))
    }

    pub(super) fn from_bson(value: Bson) -> Result<Decimal, String> {
        let parse = |text: &str| {
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|e| format!("invalid decimal {text:?}: {e}"))
        };
        match value {
            Bson::Decimal128(decimal) => parse(&decimal.to_string()),
            Bson::String(text) => parse(&text),
            Bson::Int32(number) => Ok(Decimal::from(number)),
            Bson::Int64(number) => Ok(Decimal::from(number)),
            Bson::Double(number) => {
                Decimal::try_from(number).map_err(|e| format!("invalid decimal {number}: {e}"))
            }
            other => Err(format!("expected a decimal, got {other}")),
        }
    }

    /// `Option<Decimal>` variant; null decodes to `None`.
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Decimal>, D::Error> {
            match Option::<Bson>::deserialize(deserializer)? {
                None | Some(Bson::Null) => Ok(None),
                Some(value) => from_bson(value).map(Some).map_err(serde::de::Error::custom),
            }
        }
    }
}
