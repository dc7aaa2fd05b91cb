//! Stage routing for the approval chain.
//!
//! The legal moves are kept as a declarative table instead of nested
//! conditionals so they can be enumerated and tested without storage.
//! Rows are evaluated top to bottom and the first match wins.
use super::error::{LeaveError, LeaveResult};
use super::types::{Decision, LeaveType, Role, Stage, Status};

/// Where a request goes after a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub stage: Stage,
    pub status: Status,
}

// Condition a row places on the role of whoever asked for the leave
#[derive(Debug, Clone, Copy)]
enum Requester {
    NoneOf(&'static [Role]),
    Is(Role),
    IsNot(Role),
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Fixed(Status),
    FromDecision,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    stage: Stage,
    approver: Role,
    requester: Requester,
    decision: Option<Decision>, // None matches either decision
    next: Stage,
    status: Outcome,
}

const ROUTES: &[Route] = &[
    Route {
        stage: Stage::Manager,
        approver: Role::Manager,
        requester: Requester::NoneOf(&[Role::Manager, Role::Hr, Role::Admin]),
        decision: Some(Decision::Approved),
        next: Stage::Hr,
        status: Outcome::Fixed(Status::Pending),
    },
    Route {
        stage: Stage::Manager,
        approver: Role::Manager,
        requester: Requester::NoneOf(&[Role::Manager, Role::Hr, Role::Admin]),
        decision: Some(Decision::Rejected),
        next: Stage::Completed,
        status: Outcome::Fixed(Status::Rejected),
    },
    Route {
        stage: Stage::Hr,
        approver: Role::Hr,
        requester: Requester::IsNot(Role::Hr),
        decision: Some(Decision::Approved),
        next: Stage::Admin,
        status: Outcome::Fixed(Status::Pending),
    },
    Route {
        stage: Stage::Hr,
        approver: Role::Hr,
        requester: Requester::IsNot(Role::Hr),
        decision: Some(Decision::Rejected),
        next: Stage::Completed,
        status: Outcome::Fixed(Status::Rejected),
    },
    Route {
        stage: Stage::Hr,
        approver: Role::Admin,
        requester: Requester::Is(Role::Hr),
        decision: Some(Decision::Approved),
        next: Stage::Completed,
        status: Outcome::Fixed(Status::Approved),
    },
    Route {
        stage: Stage::Hr,
        approver: Role::Admin,
        requester: Requester::Is(Role::Hr),
        decision: Some(Decision::Rejected),
        next: Stage::Completed,
        status: Outcome::Fixed(Status::Rejected),
    },
    Route {
        stage: Stage::Admin,
        approver: Role::Admin,
        requester: Requester::IsNot(Role::Hr),
        decision: None,
        next: Stage::Completed,
        status: Outcome::FromDecision,
    },
];

impl Requester {
    fn admits(&self, role: Role) -> bool {
        match self {
            Requester::NoneOf(excluded) => !excluded.contains(&role),
            Requester::Is(expected) => role == *expected,
            Requester::IsNot(excluded) => role != *excluded,
        }
    }
}

impl Route {
    fn matches(&self, stage: Stage, approver: Role, requester: Role, decision: Decision) -> bool {
        self.stage == stage
            && self.approver == approver
            && self.requester.admits(requester)
            && self.decision.is_none_or(|d| d == decision)
    }

    fn transition(&self, decision: Decision) -> Transition {
        let status = match self.status {
            Outcome::Fixed(status) => status,
            Outcome::FromDecision => decision.into(),
        };
        Transition {
            stage: self.next,
            status,
        }
    }
}

/// Compute where a request moves when `approver_role` decides on it.
///
/// Fails with [`LeaveError::StageConflict`] when the approver may not act at
/// `current_stage` or the request is already completed. The leave type does
/// not affect routing once a request is in the chain, it only selects the
/// entry stage (see [`entry_stage`]).
pub fn next_stage(
    current_stage: Stage,
    approver_role: Role,
    requester_role: Role,
    _leave_type: LeaveType,
    decision: Decision,
) -> LeaveResult<Transition> {
    let conflict = LeaveError::StageConflict {
        stage: current_stage,
        approver: approver_role,
    };
    if current_stage == Stage::Completed {
        return Err(conflict);
    }

    ROUTES
        .iter()
        .find(|route| route.matches(current_stage, approver_role, requester_role, decision))
        .map(|route| route.transition(decision))
        .ok_or(conflict)
}

/// The stage a freshly submitted request starts at.
pub fn entry_stage(requester_role: Role, leave_type: LeaveType) -> Stage {
    match requester_role {
        Role::Admin => Stage::Admin,
        Role::Hr | Role::Manager => Stage::Hr,
        Role::Employee | Role::Intern => match leave_type {
            LeaveType::Normal => Stage::Manager,
            LeaveType::Sick | LeaveType::Emergency => Stage::Hr,
        },
    }
}

/// Roles allowed to decide at `stage` for a request raised by `requester_role`.
pub fn approvers_at(stage: Stage, requester_role: Role) -> Vec<Role> {
    let mut roles: Vec<Role> = ROUTES
        .iter()
        .filter(|route| route.stage == stage && route.requester.admits(requester_role))
        .map(|route| route.approver)
        .collect();
    roles.dedup();
    roles
}
