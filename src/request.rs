//! Leave request records, their approval trail and the users they belong to
use super::router::Transition;
use super::types::{
    Balance, CalendarDate, Caller, Decision, LeaveType, Role, Stage, Status, TimeStamp,
};
use chrono::{NaiveDate, Utc};

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct User {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub role: Role,
    #[n(3)]
    pub balance: Balance,
}

/// One decision on a request. Approvals are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct Approval {
    #[n(0)]
    pub approver_role: Role,
    #[n(1)]
    pub approver_id: String,
    #[n(2)]
    pub decision: Decision,
    #[n(3)]
    pub timestamp: TimeStamp<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct LeaveRequest {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7
    #[n(1)]
    pub requester_id: String,
    #[n(2)]
    pub requester_role: Role,
    #[n(3)]
    pub leave_type: LeaveType,
    #[n(4)]
    pub start_date: CalendarDate,
    #[n(5)]
    pub end_date: CalendarDate,
    #[n(6)]
    pub reason: String,
    #[n(7)]
    pub status: Status,
    #[n(8)]
    pub stage: Stage,
    #[n(9)]
    pub approvals: Vec<Approval>,
    #[n(10)]
    pub created_at: TimeStamp<Utc>,
}

/// Inclusive number of calendar days covered by `start..=end`.
pub fn span(start: NaiveDate, end: NaiveDate) -> u32 {
    u32::try_from((end - start).num_days() + 1).unwrap_or(0)
}

impl Approval {
    pub fn new(
        approver_role: Role,
        approver_id: String,
        decision: Decision,
        timestamp: TimeStamp<Utc>,
    ) -> Self {
        Self {
            approver_role,
            approver_id,
            decision,
            timestamp,
        }
    }
}

impl LeaveRequest {
    /// Days reserved at submission and restored on rejection.
    pub fn days(&self) -> u32 {
        span(self.start_date.as_naive(), self.end_date.as_naive())
    }

    pub fn is_completed(&self) -> bool {
        self.stage == Stage::Completed
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    /// Append a decision and move to the stage the router picked.
    pub(crate) fn record(&mut self, approval: Approval, transition: Transition) {
        self.approvals.push(approval);
        self.stage = transition.stage;
        self.status = transition.status;
    }

    /// Admin sees everything, HR sees all but other HR requests, Manager sees
    /// whatever waits at the Manager stage, and everyone sees their own.
    pub fn is_visible_to(&self, caller: &Caller) -> bool {
        if self.requester_id == caller.id {
            return true;
        }
        match caller.role {
            Role::Admin => true,
            Role::Hr => self.requester_role != Role::Hr,
            Role::Manager => self.stage == Stage::Manager,
            Role::Employee | Role::Intern => false,
        }
    }
}
