use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::DomainError;

/// Backend ids come back either as numbers or as opaque strings; records
/// created while offline always get a numeric millisecond timestamp.
///
/// Equality goes through the display form, so `Numeric(5)` and `Text("5")`
/// name the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Numeric(n), Self::Text(t)) | (Self::Text(t), Self::Numeric(n)) => {
                n.to_string() == *t
            }
        }
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Numeric(id) => id.to_string().hash(state),
            Self::Text(id) => id.hash(state),
        }
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::EmptyId);
        }
        Ok(raw
            .parse::<i64>()
            .map(Self::Numeric)
            .unwrap_or_else(|_| Self::Text(raw.to_string())))
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Numeric(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pendiente,
    Proceso,
    Hecho,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pendiente, Status::Proceso, Status::Hecho];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Proceso => "proceso",
            Self::Hecho => "hecho",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| DomainError::UnknownStatus(raw.to_string()))
    }
}

/// The two people who share the tool. Each one has an independent task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    #[default]
    Sergio,
    Isaac,
}

impl Owner {
    pub const ALL: [Owner; 2] = [Owner::Sergio, Owner::Isaac];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sergio => "sergio",
            Self::Isaac => "isaac",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sergio => "Sergio",
            Self::Isaac => "Isaac",
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Owner {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|owner| owner.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| DomainError::UnknownOwner(raw.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub name: String,
}

impl User {
    /// The task partition this user works in, if the username names one.
    pub fn owner(&self) -> Option<Owner> {
        self.username.parse().ok()
    }
}

/// A sales lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    pub title: String,
    pub owner: Owner,
    #[serde(default)]
    pub status: Status,
}

/// Prices arrive as JSON numbers or, from NUMERIC columns, as decimal strings.
fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPrice {
        Number(f64),
        Text(String),
    }

    match RawPrice::deserialize(deserializer)? {
        RawPrice::Number(value) => Ok(value),
        RawPrice::Text(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(0.0);
            }
            raw.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| de::Error::custom(format!("invalid price '{raw}'")))
        }
    }
}
