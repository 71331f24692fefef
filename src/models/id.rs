//! Identifier newtypes for the stored records.
//!
//! Every record is keyed by a random UUID so that both the SQLite store and
//! the remote document store can generate keys without coordinating.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random ID.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0.to_string()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                Uuid::parse_str(text)
                    .map(Self)
                    .map_err(|error| FromSqlError::Other(Box::new(error)))
            }
        }
    };
}

record_id!(
    /// Identifies a [User](crate::models::User).
    UserId
);

record_id!(
    /// Identifies an [Expense](crate::models::Expense).
    ExpenseId
);

record_id!(
    /// Identifies a [SavingsGoal](crate::models::SavingsGoal).
    SavingsGoalId
);

#[cfg(test)]
mod tests {
    use super::{ExpenseId, UserId};

    #[test]
    fn parses_own_display_output() {
        let id = UserId::new();

        let parsed: UserId = id.to_string().parse().unwrap();

        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_integer_ids() {
        assert!("42".parse::<ExpenseId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = UserId::new();

        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, format!("\"{id}\""));
    }
}
