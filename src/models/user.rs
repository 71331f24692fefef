use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    models::{PasswordHash, UserId},
};

/// A person with an account in the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Unique identifier generated when the user is created.
    pub id: UserId,
    /// Unique name used to log in.
    pub username: String,
    /// Unique contact address.
    pub email: String,
    /// The bcrypt hash of the user's password.
    pub password_hash: PasswordHash,
    /// Admins can view and manage every user's records.
    pub is_admin: bool,
    /// The user's monthly income, never negative.
    pub monthly_income: f64,
    /// When the user was created (UTC).
    pub created_at: OffsetDateTime,
}

/// The fields needed to create a [User].
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: PasswordHash,
    pub is_admin: bool,
    pub monthly_income: f64,
}

impl NewUser {
    /// Validate and normalise the user fields.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyField] for a blank username or email,
    /// [Error::InvalidEmail] for an address without an "@", and
    /// [Error::InvalidIncome] for a negative or non-finite income.
    pub fn new(
        username: &str,
        email: &str,
        password_hash: PasswordHash,
        monthly_income: f64,
    ) -> Result<Self, Error> {
        Ok(Self {
            username: validate_username(username)?,
            email: validate_email(email)?,
            password_hash,
            is_admin: false,
            monthly_income: validate_income(monthly_income)?,
        })
    }

    /// Set the admin flag.
    pub fn admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

/// The parts of a [User] that are safe to show to other people or export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub monthly_income: f64,
    pub created_at: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            monthly_income: user.monthly_income,
            created_at: crate::datetime::format_utc_timestamp(user.created_at),
        }
    }
}

pub fn validate_username(raw: &str) -> Result<String, Error> {
    let username = raw.trim();

    if username.is_empty() {
        return Err(Error::EmptyField("Username"));
    }

    Ok(username.to_owned())
}

pub fn validate_email(raw: &str) -> Result<String, Error> {
    let email = raw.trim();

    if email.is_empty() {
        return Err(Error::EmptyField("Email"));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_owned()),
        _ => Err(Error::InvalidEmail(email.to_owned())),
    }
}

pub fn validate_income(income: f64) -> Result<f64, Error> {
    if income.is_finite() && income >= 0.0 {
        Ok(income)
    } else {
        Err(Error::InvalidIncome)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, models::PasswordHash};

    use super::NewUser;

    #[test]
    fn new_user_trims_fields() {
        let user = NewUser::new(
            "  asha ",
            " asha@example.com ",
            PasswordHash::new_unchecked("hash"),
            50_000.0,
        )
        .unwrap();

        assert_eq!(user.username, "asha");
        assert_eq!(user.email, "asha@example.com");
        assert!(!user.is_admin);
    }

    #[test]
    fn new_user_rejects_blank_username() {
        let result = NewUser::new("  ", "a@b.c", PasswordHash::new_unchecked("hash"), 0.0);

        assert_eq!(result, Err(Error::EmptyField("Username")));
    }

    #[test]
    fn new_user_rejects_email_without_at() {
        let result = NewUser::new("asha", "asha.example.com", PasswordHash::new_unchecked("h"), 0.0);

        assert_eq!(
            result,
            Err(Error::InvalidEmail("asha.example.com".to_owned()))
        );
    }

    #[test]
    fn new_user_rejects_negative_income() {
        let result = NewUser::new("asha", "a@b.c", PasswordHash::new_unchecked("hash"), -1.0);

        assert_eq!(result, Err(Error::InvalidIncome));
    }
}
