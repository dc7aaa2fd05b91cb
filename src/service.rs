//! Service layer API for the leave workflow.
//!
//! `submit` and `decide` are the only state changing operations. Each runs as
//! one sled transaction spanning the `users` and `leaves` trees, so a request
//! and the balance movement it causes commit together or not at all.
use super::clock::{Clock, SystemClock};
use super::config::LeaveConfig;
use super::error::{LeaveError, LeaveResult};
use super::ledger::{BalanceLedger, reserve_in, restore_in};
use super::policy::RoleLeavePolicy;
use super::request::{Approval, LeaveRequest, User};
use super::router;
use super::store::{
    LeaveStore, abort, read_request_tx, read_user_tx, write_request_tx, write_user_tx,
};
use super::types::{Balance, Caller, Decision, Role, Stage, Status, TimeStamp};
use super::utils;
use super::validator::{LeaveApplication, RequestValidator};
use sled::Transactional;
use sled::transaction::TransactionResult;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LeaveService {
    store: LeaveStore,
    ledger: BalanceLedger,
    policy: RoleLeavePolicy,
    validator: RequestValidator,
    clock: Arc<dyn Clock>,
}

impl LeaveService {
    pub fn new(instance: Arc<sled::Db>, policy: RoleLeavePolicy) -> LeaveResult<Self> {
        Self::with_config(instance, policy, &LeaveConfig::default())
    }

    pub fn with_config(
        instance: Arc<sled::Db>,
        policy: RoleLeavePolicy,
        config: &LeaveConfig,
    ) -> LeaveResult<Self> {
        let store = LeaveStore::new(instance)?;
        let ledger = BalanceLedger::new(store.users_tree().clone());

        Ok(Self {
            store,
            ledger,
            policy,
            validator: RequestValidator::from_config(config),
            clock: Arc::new(SystemClock),
        })
    }

    /// Open (or create) the database at `config.db_path`.
    pub fn open(config: &LeaveConfig, policy: RoleLeavePolicy) -> LeaveResult<Self> {
        let instance = sled::open(&config.db_path)?;
        info!(path = %config.db_path.display(), "Opened leave database");
        Self::with_config(Arc::new(instance), policy, config)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Persist every role default of the policy, replacing older values.
    pub fn seed_role_defaults(&self) -> LeaveResult<usize> {
        let mut seeded = 0;
        for entry in self.policy.entries() {
            self.store.put_role_default(&entry)?;
            seeded += 1;
        }
        self.store.flush()?;
        info!(seeded, "Role leave defaults seeded");

        Ok(seeded)
    }

    /// Look up the persisted default allotment for a role by name.
    pub fn role_defaults(&self, role: &str) -> LeaveResult<Balance> {
        let role: Role = role.parse()?;
        self.store
            .role_default(role)?
            .map(|entry| entry.balance)
            .ok_or_else(|| LeaveError::UnknownRole(role.to_string()))
    }

    /// Create a user whose balance starts at the policy default for `role`.
    pub fn register_user(&self, name: &str, role: Role) -> LeaveResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LeaveError::Validation("user name must not be empty".into()));
        }
        let balance = self.policy.defaults_for(role)?;
        let id = utils::new_user_id().map_err(|e| LeaveError::Identifier(e.to_string()))?;

        let user = User {
            id,
            name: name.to_string(),
            role,
            balance,
        };
        self.store.insert_user(&user)?;
        info!(user_id = %user.id, %role, "User registered");

        Ok(user)
    }

    pub fn user(&self, id: &str) -> LeaveResult<User> {
        self.store
            .user(id)?
            .ok_or_else(|| LeaveError::UserNotFound(id.to_string()))
    }

    pub fn balance(&self, user_id: &str) -> LeaveResult<Balance> {
        self.ledger.balance(user_id)
    }

    /// All users with their balances. Restricted to Admin and HR.
    pub fn list_users(&self, caller: &Caller) -> LeaveResult<Vec<User>> {
        if !matches!(caller.role, Role::Admin | Role::Hr) {
            return Err(LeaveError::Forbidden {
                role: caller.role,
                action: "list users",
            });
        }
        self.store.users()
    }

    /// Reset every user's balance to the persisted default of their role.
    /// Users whose role has no persisted default are left alone.
    pub fn reset_balances(&self) -> LeaveResult<usize> {
        let mut reset = 0;
        for user in self.store.users()? {
            let Some(default) = self.store.role_default(user.role)? else {
                warn!(user_id = %user.id, role = %user.role, "No role default, balance not reset");
                continue;
            };
            self.store.users_tree().transaction(|users| {
                let mut current = read_user_tx(users, &user.id)?;
                current.balance = default.balance;
                write_user_tx(users, &current)
            })?;
            reset += 1;
        }
        info!(reset, "User leave balances reset to role defaults");

        Ok(reset)
    }

    /// Validate an application, reserve its days and store it as a pending request.
    pub fn submit(
        &self,
        caller: &Caller,
        application: LeaveApplication,
    ) -> LeaveResult<LeaveRequest> {
        let now = self.clock.now();
        let today = now.date_naive();
        let id = utils::new_leave_id().map_err(|e| LeaveError::Identifier(e.to_string()))?;
        let stage = router::entry_stage(caller.role, application.leave_type);

        // Balance check, reservation and insert commit as one unit
        let trees = (self.store.users_tree(), self.store.leaves_tree());
        let result: TransactionResult<LeaveRequest, LeaveError> =
            trees.transaction(|(users, leaves)| {
                // Validate against the balance as it is inside the transaction
                let requester = read_user_tx(users, &caller.id)?;
                let days = self
                    .validator
                    .validate(&application, &requester.balance, today)
                    .or_else(abort)?;
                reserve_in(users, &caller.id, application.leave_type, days)?;

                // Create the pending request at its entry stage
                let request = LeaveRequest {
                    id: id.clone(),
                    requester_id: caller.id.clone(),
                    requester_role: caller.role,
                    leave_type: application.leave_type,
                    start_date: application.start_date.into(),
                    end_date: application.end_date.into(),
                    reason: application.reason.trim().to_string(),
                    status: Status::Pending,
                    stage,
                    approvals: vec![],
                    created_at: TimeStamp::from(now),
                };
                // Save to DB
                write_request_tx(leaves, &request)?;

                Ok(request)
            });

        match result {
            Ok(request) => {
                info!(
                    request_id = %request.id,
                    requester = %caller.id,
                    leave_type = %request.leave_type,
                    days = request.days(),
                    stage = %request.stage,
                    "Leave request submitted"
                );
                Ok(request)
            }
            Err(e) => {
                let e = LeaveError::from(e);
                warn!(requester = %caller.id, error = %e, "Leave request refused");
                Err(e)
            }
        }
    }

    /// Record an approver's decision and move the request along the chain.
    ///
    /// The request is read, routed, then written back only if its stage,
    /// status and approval count are still what was read. A concurrent
    /// decision that got there first turns this one into a stage conflict.
    pub fn decide(
        &self,
        request_id: &str,
        caller: &Caller,
        decision: Decision,
    ) -> LeaveResult<LeaveRequest> {
        // Load from DB
        let snapshot = self.request(request_id)?;

        // Nobody decides on their own request, admins included
        if snapshot.requester_id == caller.id {
            warn!(request_id, approver = %caller.id, "Self approval refused");
            return Err(LeaveError::SelfApproval {
                request_id: request_id.to_string(),
            });
        }

        // Verify the approver may act at the current stage
        let transition = router::next_stage(
            snapshot.stage,
            caller.role,
            snapshot.requester_role,
            snapshot.leave_type,
            decision,
        )
        .inspect_err(|e| {
            warn!(request_id, approver = %caller.id, error = %e, "Decision refused")
        })?;

        let approval = Approval::new(
            caller.role,
            caller.id.clone(),
            decision,
            TimeStamp::from(self.clock.now()),
        );

        let trees = (self.store.users_tree(), self.store.leaves_tree());
        let result: TransactionResult<LeaveRequest, LeaveError> =
            trees.transaction(|(users, leaves)| {
                // Re-read and bail out if another decision landed first
                let mut current = read_request_tx(leaves, request_id)?;
                if !unchanged_since(&current, &snapshot) {
                    return abort(LeaveError::StageConflict {
                        stage: current.stage,
                        approver: caller.role,
                    });
                }

                // Add approval and move the stage
                current.record(approval.clone(), transition);

                // Rejection gives the reserved days back
                if transition.stage == Stage::Completed && transition.status == Status::Rejected {
                    restore_in(users, &current.requester_id, current.leave_type, current.days())?;
                }
                // Save back to DB
                write_request_tx(leaves, &current)?;

                Ok(current)
            });

        match result {
            Ok(request) => {
                info!(
                    request_id,
                    approver = %caller.id,
                    %decision,
                    stage = %request.stage,
                    status = %request.status,
                    "Leave decision recorded"
                );
                Ok(request)
            }
            Err(e) => {
                let e = LeaveError::from(e);
                warn!(request_id, approver = %caller.id, error = %e, "Leave decision lost");
                Err(e)
            }
        }
    }

    pub fn request(&self, id: &str) -> LeaveResult<LeaveRequest> {
        self.store
            .request(id)?
            .ok_or_else(|| LeaveError::NotFound(id.to_string()))
    }

    /// The caller's own requests, newest first.
    pub fn history(&self, caller: &Caller) -> LeaveResult<Vec<LeaveRequest>> {
        self.collect_newest_first(|request| request.requester_id == caller.id)
    }

    /// Every request the caller's role is allowed to see, newest first.
    pub fn visible_requests(&self, caller: &Caller) -> LeaveResult<Vec<LeaveRequest>> {
        self.collect_newest_first(|request| request.is_visible_to(caller))
    }

    /// Pending requests the caller may decide on right now.
    pub fn actionable_requests(&self, caller: &Caller) -> LeaveResult<Vec<LeaveRequest>> {
        self.collect_newest_first(|request| {
            request.is_pending()
                && request.requester_id != caller.id
                && router::approvers_at(request.stage, request.requester_role)
                    .contains(&caller.role)
        })
    }

    fn collect_newest_first<F>(&self, keep: F) -> LeaveResult<Vec<LeaveRequest>>
    where
        F: Fn(&LeaveRequest) -> bool,
    {
        let mut requests: Vec<LeaveRequest> = self
            .store
            .requests()?
            .into_iter()
            .filter(|request| keep(request))
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(count = requests.len(), "Leave requests listed");

        Ok(requests)
    }
}

// compare-and-swap guard for decide
fn unchanged_since(current: &LeaveRequest, snapshot: &LeaveRequest) -> bool {
    current.stage == snapshot.stage
        && current.status == snapshot.status
        && current.approvals.len() == snapshot.approvals.len()
}
