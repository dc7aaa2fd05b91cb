//! sled backed persistence for users, leave requests and role defaults.
//!
//! Each entity lives in its own tree keyed by id (role name for role
//! defaults) and is stored as CBOR. The `*_tx` helpers operate on the
//! transactional view of a tree so callers can group several writes into a
//! single atomic unit.
use super::error::{LeaveError, LeaveResult};
use super::policy::RoleDefault;
use super::request::{LeaveRequest, User};
use super::types::Role;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree,
};
use sled::{Db, Tree};
use std::sync::Arc;

const USERS: &str = "users";
const LEAVES: &str = "leaves";
const ROLE_DEFAULTS: &str = "role_defaults";

#[derive(Clone)]
pub struct LeaveStore {
    instance: Arc<Db>,
    users: Tree,
    leaves: Tree,
    role_defaults: Tree,
}

pub(crate) fn encode<T: minicbor::Encode<()>>(value: &T) -> LeaveResult<Vec<u8>> {
    minicbor::to_vec(value).map_err(|e| LeaveError::Encode(e.to_string()))
}

pub(crate) fn decode<T>(bytes: &[u8]) -> LeaveResult<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    Ok(minicbor::decode(bytes)?)
}

pub(crate) fn abort<T>(e: LeaveError) -> ConflictableTransactionResult<T, LeaveError> {
    Err(ConflictableTransactionError::Abort(e))
}

impl LeaveStore {
    pub fn new(instance: Arc<Db>) -> LeaveResult<Self> {
        let users = instance.open_tree(USERS)?;
        let leaves = instance.open_tree(LEAVES)?;
        let role_defaults = instance.open_tree(ROLE_DEFAULTS)?;

        Ok(Self {
            instance,
            users,
            leaves,
            role_defaults,
        })
    }

    pub fn users_tree(&self) -> &Tree {
        &self.users
    }

    pub fn leaves_tree(&self) -> &Tree {
        &self.leaves
    }

    pub fn user(&self, id: &str) -> LeaveResult<Option<User>> {
        self.users
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn insert_user(&self, user: &User) -> LeaveResult<()> {
        self.users.insert(user.id.as_bytes(), encode(user)?)?;
        Ok(())
    }

    pub fn users(&self) -> LeaveResult<Vec<User>> {
        self.users
            .iter()
            .values()
            .map(|bytes| decode(&bytes?))
            .collect()
    }

    pub fn request(&self, id: &str) -> LeaveResult<Option<LeaveRequest>> {
        self.leaves
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn requests(&self) -> LeaveResult<Vec<LeaveRequest>> {
        self.leaves
            .iter()
            .values()
            .map(|bytes| decode(&bytes?))
            .collect()
    }

    /// Insert or replace the default for `entry.role`.
    pub fn put_role_default(&self, entry: &RoleDefault) -> LeaveResult<()> {
        self.role_defaults
            .insert(entry.role.as_str().as_bytes(), encode(entry)?)?;
        Ok(())
    }

    pub fn role_default(&self, role: Role) -> LeaveResult<Option<RoleDefault>> {
        self.role_defaults
            .get(role.as_str().as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn flush(&self) -> LeaveResult<()> {
        self.instance.flush()?;
        Ok(())
    }
}

pub(crate) fn read_user_tx(
    users: &TransactionalTree,
    id: &str,
) -> ConflictableTransactionResult<User, LeaveError> {
    match users.get(id.as_bytes())? {
        Some(bytes) => decode(&bytes).or_else(abort),
        None => abort(LeaveError::UserNotFound(id.to_string())),
    }
}

pub(crate) fn write_user_tx(
    users: &TransactionalTree,
    user: &User,
) -> ConflictableTransactionResult<(), LeaveError> {
    let bytes = encode(user).or_else(abort)?;
    users.insert(user.id.as_bytes(), bytes)?;
    Ok(())
}

pub(crate) fn read_request_tx(
    leaves: &TransactionalTree,
    id: &str,
) -> ConflictableTransactionResult<LeaveRequest, LeaveError> {
    match leaves.get(id.as_bytes())? {
        Some(bytes) => decode(&bytes).or_else(abort),
        None => abort(LeaveError::NotFound(id.to_string())),
    }
}

pub(crate) fn write_request_tx(
    leaves: &TransactionalTree,
    request: &LeaveRequest,
) -> ConflictableTransactionResult<(), LeaveError> {
    let bytes = encode(request).or_else(abort)?;
    leaves.insert(request.id.as_bytes(), bytes)?;
    Ok(())
}
