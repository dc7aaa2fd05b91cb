//! Per user leave balances.
//!
//! Every read-then-write runs inside a sled transaction on the user's
//! record, so two reservations against the same user can never both pass a
//! stale sufficiency check. The `*_in` variants take an already open
//! transactional view so the workflow engine can commit a balance movement
//! together with the request it belongs to.
use super::error::{LeaveError, LeaveResult};
use super::store::{abort, read_user_tx, write_user_tx};
use super::types::{Balance, LeaveType};
use sled::Tree;
use sled::transaction::{ConflictableTransactionResult, TransactionalTree};

pub struct BalanceLedger {
    users: Tree,
}

impl BalanceLedger {
    pub fn new(users: Tree) -> Self {
        Self { users }
    }

    pub fn balance(&self, user_id: &str) -> LeaveResult<Balance> {
        let user = self
            .users
            .transaction(|users| read_user_tx(users, user_id))?;
        Ok(user.balance)
    }

    /// Take `days` from the user's `leave_type` balance, or fail without
    /// touching it. Returns the balance after the reservation.
    pub fn reserve(&self, user_id: &str, leave_type: LeaveType, days: u32) -> LeaveResult<Balance> {
        Ok(self
            .users
            .transaction(|users| reserve_in(users, user_id, leave_type, days))?)
    }

    /// Give `days` back to the user's `leave_type` balance.
    pub fn restore(&self, user_id: &str, leave_type: LeaveType, days: u32) -> LeaveResult<Balance> {
        Ok(self
            .users
            .transaction(|users| restore_in(users, user_id, leave_type, days))?)
    }
}

pub(crate) fn reserve_in(
    users: &TransactionalTree,
    user_id: &str,
    leave_type: LeaveType,
    days: u32,
) -> ConflictableTransactionResult<Balance, LeaveError> {
    let mut user = read_user_tx(users, user_id)?;
    let available = user.balance.available(leave_type);
    if available < days {
        return abort(LeaveError::InsufficientBalance {
            leave_type,
            requested: days,
            available,
        });
    }

    *user.balance.slot_mut(leave_type) = available - days;
    write_user_tx(users, &user)?;
    tracing::debug!(user_id, %leave_type, days, remaining = available - days, "Balance reserved");

    Ok(user.balance)
}

// no upper bound below u32::MAX, a restored balance may exceed the role default
pub(crate) fn restore_in(
    users: &TransactionalTree,
    user_id: &str,
    leave_type: LeaveType,
    days: u32,
) -> ConflictableTransactionResult<Balance, LeaveError> {
    let mut user = read_user_tx(users, user_id)?;
    let balance = user.balance.available(leave_type);
    let Some(restored) = balance.checked_add(days) else {
        return abort(LeaveError::BalanceOverflow {
            leave_type,
            balance,
            days,
        });
    };

    *user.balance.slot_mut(leave_type) = restored;
    write_user_tx(users, &user)?;
    tracing::debug!(user_id, %leave_type, days, remaining = restored, "Balance restored");

    Ok(user.balance)
}
