//! Decides which records the logged-in user may see and change.
//!
//! Admins can see and change everything. Everybody else is limited to their
//! own expenses and savings goals.

use crate::{
    Error,
    models::{Expense, ExpenseId, User, UserId},
    store::Store,
};

/// The user that sent the request, placed in the request extensions by the
/// auth middleware.
///
/// Route handlers can use the function argument
/// `Extension(current_user): Extension<CurrentUser>` to receive it.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser(pub User);

/// The set of owners whose records a user may access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Every user's records.
    All,
    /// Only the records owned by this user.
    Owner(UserId),
}

impl AccessScope {
    /// The owner condition for an expense query, `None` meaning all owners.
    pub fn owner_filter(self) -> Option<UserId> {
        match self {
            AccessScope::All => None,
            AccessScope::Owner(user_id) => Some(user_id),
        }
    }
}

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin
    }

    pub fn scope(&self) -> AccessScope {
        if self.is_admin() {
            AccessScope::All
        } else {
            AccessScope::Owner(self.id())
        }
    }

    /// Check that the user may access records owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::Forbidden] unless the user is an admin or the owner.
    pub fn authorize(&self, owner_id: UserId) -> Result<(), Error> {
        if self.is_admin() || self.id() == owner_id {
            Ok(())
        } else {
            tracing::warn!(
                "User {} tried to access a record owned by {owner_id}",
                self.id()
            );
            Err(Error::Forbidden)
        }
    }

    /// Check that the user is an admin.
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!("User {} tried to use an admin-only feature", self.id());
            Err(Error::NotAdmin)
        }
    }
}

/// Fetch an expense that `user` may read and change.
///
/// # Errors
///
/// Returns [Error::NotFound] if the expense does not exist and
/// [Error::Forbidden] if it belongs to someone else.
pub async fn load_authorized_expense(
    store: &dyn Store,
    user: &CurrentUser,
    expense_id: ExpenseId,
) -> Result<Expense, Error> {
    let expense = store
        .get_expense(expense_id)
        .await?
        .ok_or(Error::NotFound)?;

    user.authorize(expense.user_id)?;

    Ok(expense)
}
