use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use leave_approval::{
    LeaveError, LeaveService,
    clock::FixedClock,
    config::LeaveConfig,
    policy::{RoleDefault, RoleLeavePolicy},
    request::User,
    types::{Balance, Caller, Decision, LeaveType, Role, Stage, Status},
    validator::LeaveApplication,
};
use sled::open;
use std::sync::Arc;

use tempfile::{TempDir, tempdir}; // Use for test db cleanup.

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn in_days(days: u64) -> NaiveDate {
    now().date_naive().checked_add_days(Days::new(days)).unwrap()
}

// Sled locks its directory, so every test gets its own database under a temp dir.
fn service_with(name: &str, policy: RoleLeavePolicy) -> anyhow::Result<(TempDir, LeaveService)> {
    let temp_dir = tempdir()?;
    let db = Arc::new(open(temp_dir.path().join(name))?);
    let service = LeaveService::new(db, policy)?.with_clock(FixedClock(now()));
    Ok((temp_dir, service))
}

fn service(name: &str) -> anyhow::Result<(TempDir, LeaveService)> {
    service_with(name, RoleLeavePolicy::standard())
}

fn caller(user: &User) -> Caller {
    Caller::new(user.id.clone(), user.role)
}

fn normal_leave(start: u64, end: u64) -> LeaveApplication {
    LeaveApplication::new(LeaveType::Normal, in_days(start), in_days(end), "family wedding")
}

#[test]
fn scenario_a_employee_submits_normal_leave() -> anyhow::Result<()> {
    let (_dir, service) = service("scenario_a.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;
    assert_eq!(employee.balance.normal, 12);

    let request = service.submit(&caller(&employee), normal_leave(10, 12))?;

    assert_eq!(request.stage, Stage::Manager);
    assert_eq!(request.status, Status::Pending);
    assert!(request.approvals.is_empty());
    assert_eq!(request.days(), 3);
    assert_eq!(service.balance(&employee.id)?.normal, 9);
    assert_eq!(service.request(&request.id)?, request);

    Ok(())
}

#[test]
fn scenario_b_normal_leave_needs_notice() -> anyhow::Result<()> {
    let (_dir, service) = service("scenario_b.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;

    let err = service
        .submit(&caller(&employee), normal_leave(1, 1))
        .unwrap_err();

    assert!(matches!(err, LeaveError::AdvanceNotice { .. }));
    assert_eq!(service.balance(&employee.id)?.normal, 12);
    assert!(service.history(&caller(&employee))?.is_empty());

    Ok(())
}

#[test]
fn scenario_c_and_d_manager_approves_then_hr_rejects() -> anyhow::Result<()> {
    let (_dir, service) = service("scenario_cd.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;
    let manager = service.register_user("Bram", Role::Manager)?;
    let hr = service.register_user("Chidi", Role::Hr)?;

    let request = service.submit(&caller(&employee), normal_leave(10, 12))?;

    let request = service.decide(&request.id, &caller(&manager), Decision::Approved)?;
    assert_eq!(request.stage, Stage::Hr);
    assert_eq!(request.status, Status::Pending);
    assert_eq!(request.approvals.len(), 1);
    assert_eq!(request.approvals[0].approver_role, Role::Manager);
    assert_eq!(request.approvals[0].approver_id, manager.id);
    assert_eq!(service.balance(&employee.id)?.normal, 9);

    let request = service.decide(&request.id, &caller(&hr), Decision::Rejected)?;
    assert_eq!(request.stage, Stage::Completed);
    assert_eq!(request.status, Status::Rejected);
    assert_eq!(request.approvals.len(), 2);
    assert_eq!(request.approvals[1].decision, Decision::Rejected);
    assert_eq!(service.balance(&employee.id)?.normal, 12);

    Ok(())
}

#[test]
fn scenario_e_hr_sick_leave_approved_by_admin() -> anyhow::Result<()> {
    let (_dir, service) = service("scenario_e.db")?;
    let hr = service.register_user("Chidi", Role::Hr)?;
    let admin = service.register_user("Dana", Role::Admin)?;
    assert_eq!(hr.balance.sick, 8);

    let sick = LeaveApplication::new(LeaveType::Sick, in_days(0), in_days(1), "fever");
    let request = service.submit(&caller(&hr), sick)?;
    assert_eq!(request.stage, Stage::Hr);
    assert_eq!(service.balance(&hr.id)?.sick, 6);

    let request = service.decide(&request.id, &caller(&admin), Decision::Approved)?;
    assert_eq!(request.stage, Stage::Completed);
    assert_eq!(request.status, Status::Approved);
    assert_eq!(request.approvals[0].approver_role, Role::Admin);
    assert_eq!(service.balance(&hr.id)?.sick, 6);

    Ok(())
}

#[test]
fn scenario_f_manager_cannot_act_at_hr_stage() -> anyhow::Result<()> {
    let (_dir, service) = service("scenario_f.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;
    let manager = service.register_user("Bram", Role::Manager)?;
    let other_manager = service.register_user("Eve", Role::Manager)?;

    let request = service.submit(&caller(&employee), normal_leave(10, 12))?;
    let request = service.decide(&request.id, &caller(&manager), Decision::Approved)?;

    let err = service
        .decide(&request.id, &caller(&other_manager), Decision::Approved)
        .unwrap_err();
    assert!(matches!(
        err,
        LeaveError::StageConflict {
            stage: Stage::Hr,
            approver: Role::Manager
        }
    ));
    assert_eq!(service.request(&request.id)?.approvals.len(), 1);

    Ok(())
}

#[test]
fn full_chain_approval_consumes_reservation() -> anyhow::Result<()> {
    let (_dir, service) = service("full_chain.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;
    let manager = service.register_user("Bram", Role::Manager)?;
    let hr = service.register_user("Chidi", Role::Hr)?;
    let admin = service.register_user("Dana", Role::Admin)?;

    let request = service.submit(&caller(&employee), normal_leave(14, 18))?;
    let request = service.decide(&request.id, &caller(&manager), Decision::Approved)?;
    let request = service.decide(&request.id, &caller(&hr), Decision::Approved)?;
    assert_eq!(request.stage, Stage::Admin);
    let request = service.decide(&request.id, &caller(&admin), Decision::Approved)?;

    assert_eq!(request.stage, Stage::Completed);
    assert_eq!(request.status, Status::Approved);
    let roles: Vec<Role> = request.approvals.iter().map(|a| a.approver_role).collect();
    assert_eq!(roles, vec![Role::Manager, Role::Hr, Role::Admin]);
    assert_eq!(service.balance(&employee.id)?.normal, 7);

    Ok(())
}

#[test]
fn admin_rejection_restores_balance() -> anyhow::Result<()> {
    let (_dir, service) = service("admin_reject.db")?;
    let manager = service.register_user("Bram", Role::Manager)?;
    let hr = service.register_user("Chidi", Role::Hr)?;
    let admin = service.register_user("Dana", Role::Admin)?;

    let emergency = LeaveApplication::new(LeaveType::Emergency, in_days(0), in_days(2), "flooded house");
    let request = service.submit(&caller(&manager), emergency)?;
    assert_eq!(request.stage, Stage::Hr);
    assert_eq!(service.balance(&manager.id)?.emergency, 1);

    service.decide(&request.id, &caller(&hr), Decision::Approved)?;
    let request = service.decide(&request.id, &caller(&admin), Decision::Rejected)?;

    assert_eq!(request.status, Status::Rejected);
    assert_eq!(service.balance(&manager.id)?.emergency, 4);

    Ok(())
}

#[test]
fn intern_sick_leave_skips_manager() -> anyhow::Result<()> {
    let (_dir, service) = service("intern_sick.db")?;
    let intern = service.register_user("Femi", Role::Intern)?;
    let manager = service.register_user("Bram", Role::Manager)?;

    let sick = LeaveApplication::new(LeaveType::Sick, in_days(0), in_days(0), "migraine");
    let request = service.submit(&caller(&intern), sick)?;

    assert_eq!(request.stage, Stage::Hr);
    assert!(matches!(
        service.decide(&request.id, &caller(&manager), Decision::Approved),
        Err(LeaveError::StageConflict { .. })
    ));

    Ok(())
}

#[test]
fn self_approval_is_refused_even_for_admins() -> anyhow::Result<()> {
    let policy = RoleLeavePolicy::from_entries(
        Role::ALL
            .into_iter()
            .map(|role| RoleDefault {
                role,
                balance: Balance::new(5, 5, 5),
            }),
    )?;
    let (_dir, service) = service_with("self_approval.db", policy)?;
    let admin = service.register_user("Dana", Role::Admin)?;
    let other_admin = service.register_user("Gus", Role::Admin)?;
    let hr = service.register_user("Chidi", Role::Hr)?;

    let request = service.submit(&caller(&admin), normal_leave(7, 8))?;
    assert_eq!(request.stage, Stage::Admin);

    let err = service
        .decide(&request.id, &caller(&admin), Decision::Approved)
        .unwrap_err();
    assert!(matches!(err, LeaveError::SelfApproval { .. }));
    assert!(service.request(&request.id)?.approvals.is_empty());

    let request = service.decide(&request.id, &caller(&other_admin), Decision::Approved)?;
    assert_eq!(request.status, Status::Approved);

    let sick = LeaveApplication::new(LeaveType::Sick, in_days(0), in_days(0), "dentist");
    let hr_request = service.submit(&caller(&hr), sick)?;
    let err = service
        .decide(&hr_request.id, &caller(&hr), Decision::Rejected)
        .unwrap_err();
    assert!(matches!(err, LeaveError::SelfApproval { .. }));

    Ok(())
}

#[test]
fn completed_requests_accept_no_further_decisions() -> anyhow::Result<()> {
    let (_dir, service) = service("completed.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;
    let manager = service.register_user("Bram", Role::Manager)?;
    let admin = service.register_user("Dana", Role::Admin)?;

    let request = service.submit(&caller(&employee), normal_leave(10, 10))?;
    let request = service.decide(&request.id, &caller(&manager), Decision::Rejected)?;
    assert!(request.is_completed());
    assert_eq!(service.balance(&employee.id)?.normal, 12);

    for approver in [&manager, &admin] {
        let err = service
            .decide(&request.id, &caller(approver), Decision::Approved)
            .unwrap_err();
        assert!(matches!(
            err,
            LeaveError::StageConflict {
                stage: Stage::Completed,
                ..
            }
        ));
    }
    assert_eq!(service.request(&request.id)?.approvals.len(), 1);
    // the restoration happened exactly once
    assert_eq!(service.balance(&employee.id)?.normal, 12);

    Ok(())
}

#[test]
fn submissions_are_validated_in_order() -> anyhow::Result<()> {
    let (_dir, service) = service("validation.db")?;
    let intern = service.register_user("Femi", Role::Intern)?;
    let intern = caller(&intern);

    let backwards = LeaveApplication::new(LeaveType::Normal, in_days(12), in_days(10), "trip");
    assert!(matches!(
        service.submit(&intern, backwards),
        Err(LeaveError::InvalidRange { .. })
    ));

    let no_reason = LeaveApplication::new(LeaveType::Sick, in_days(0), in_days(0), "");
    assert!(matches!(
        service.submit(&intern, no_reason),
        Err(LeaveError::Validation(_))
    ));

    let too_long = LeaveApplication::new(LeaveType::Emergency, in_days(0), in_days(4), "storm");
    let err = service.submit(&intern, too_long).unwrap_err();
    assert_eq!(err.shortfall(), Some(3));

    assert_eq!(service.balance(&intern.id)?, Balance::new(6, 3, 2));

    Ok(())
}

#[test]
fn pending_reservations_limit_later_submissions() -> anyhow::Result<()> {
    let (_dir, service) = service("over_commit.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;
    let employee = caller(&employee);

    service.submit(&employee, normal_leave(10, 19))?;
    let err = service.submit(&employee, normal_leave(30, 32)).unwrap_err();

    assert!(matches!(
        err,
        LeaveError::InsufficientBalance {
            leave_type: LeaveType::Normal,
            requested: 3,
            available: 2
        }
    ));

    Ok(())
}

#[test]
fn unknown_request_and_user_are_not_found() -> anyhow::Result<()> {
    let (_dir, service) = service("not_found.db")?;
    let manager = service.register_user("Bram", Role::Manager)?;

    assert!(matches!(
        service.decide("leave_missing", &caller(&manager), Decision::Approved),
        Err(LeaveError::NotFound(_))
    ));

    let stranger = Caller::new("user_stranger", Role::Employee);
    assert!(matches!(
        service.submit(&stranger, normal_leave(10, 10)),
        Err(LeaveError::UserNotFound(_))
    ));

    Ok(())
}

#[test]
fn role_defaults_are_seeded_and_used_for_resets() -> anyhow::Result<()> {
    let (_dir, service) = service("role_defaults.db")?;

    assert!(matches!(
        service.role_defaults("HR"),
        Err(LeaveError::UnknownRole(_))
    ));
    assert_eq!(service.seed_role_defaults()?, 5);
    assert_eq!(service.seed_role_defaults()?, 5);
    assert_eq!(service.role_defaults("HR")?, Balance::new(10, 8, 5));
    assert!(matches!(
        service.role_defaults("Contractor"),
        Err(LeaveError::UnknownRole(name)) if name == "Contractor"
    ));

    let employee = service.register_user("Asha", Role::Employee)?;
    service.submit(&caller(&employee), normal_leave(10, 12))?;
    assert_eq!(service.balance(&employee.id)?.normal, 9);

    assert_eq!(service.reset_balances()?, 1);
    assert_eq!(service.balance(&employee.id)?, Balance::new(12, 6, 3));

    Ok(())
}

#[test]
fn user_listing_is_limited_to_admin_and_hr() -> anyhow::Result<()> {
    let (_dir, service) = service("list_users.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;
    let hr = service.register_user("Chidi", Role::Hr)?;

    assert_eq!(service.list_users(&caller(&hr))?.len(), 2);
    assert!(matches!(
        service.list_users(&caller(&employee)),
        Err(LeaveError::Forbidden {
            role: Role::Employee,
            ..
        })
    ));
    assert_eq!(service.user(&employee.id)?, employee);
    assert!(matches!(
        service.register_user("   ", Role::Intern),
        Err(LeaveError::Validation(_))
    ));

    Ok(())
}

#[test]
fn read_operations_follow_role_visibility() -> anyhow::Result<()> {
    let (_dir, service) = service("visibility.db")?;
    let employee = service.register_user("Asha", Role::Employee)?;
    let manager = service.register_user("Bram", Role::Manager)?;
    let hr = service.register_user("Chidi", Role::Hr)?;
    let other_hr = service.register_user("Hana", Role::Hr)?;
    let admin = service.register_user("Dana", Role::Admin)?;

    let employee_request = service.submit(&caller(&employee), normal_leave(10, 10))?;
    let hr_request = service.submit(
        &caller(&hr),
        LeaveApplication::new(LeaveType::Sick, in_days(0), in_days(0), "checkup"),
    )?;

    assert_eq!(service.visible_requests(&caller(&admin))?.len(), 2);
    assert_eq!(service.visible_requests(&caller(&other_hr))?, vec![employee_request.clone()]);
    assert_eq!(service.visible_requests(&caller(&manager))?, vec![employee_request.clone()]);
    assert_eq!(service.visible_requests(&caller(&hr))?.len(), 2);
    assert_eq!(service.history(&caller(&employee))?, vec![employee_request.clone()]);

    assert_eq!(service.actionable_requests(&caller(&manager))?, vec![employee_request]);
    assert_eq!(service.actionable_requests(&caller(&admin))?, vec![hr_request]);
    assert!(service.actionable_requests(&caller(&hr))?.is_empty());

    Ok(())
}

#[test]
fn history_is_newest_first() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(open(temp_dir.path().join("history.db"))?);
    let early = LeaveService::new(Arc::clone(&db), RoleLeavePolicy::standard())?
        .with_clock(FixedClock(now()));
    let late = LeaveService::new(db, RoleLeavePolicy::standard())?
        .with_clock(FixedClock(now() + chrono::Duration::hours(2)));

    let employee = early.register_user("Asha", Role::Employee)?;
    let first = early.submit(&caller(&employee), normal_leave(10, 10))?;
    let second = late.submit(&caller(&employee), normal_leave(20, 20))?;

    let history = early.history(&caller(&employee))?;
    assert_eq!(history, vec![second, first]);

    Ok(())
}

#[test]
fn opened_service_applies_configured_notice() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let config = LeaveConfig {
        db_path: temp_dir.path().join("configured.db"),
        advance_notice_days: 14,
        ..LeaveConfig::default()
    };
    let service =
        LeaveService::open(&config, RoleLeavePolicy::standard())?.with_clock(FixedClock(now()));
    let employee = service.register_user("Asha", Role::Employee)?;

    // enough notice under the default of 7, not under 14
    let err = service
        .submit(&caller(&employee), normal_leave(10, 10))
        .unwrap_err();
    assert!(matches!(err, LeaveError::AdvanceNotice { .. }));
    assert_eq!(service.balance(&employee.id)?.normal, 12);

    let request = service.submit(&caller(&employee), normal_leave(14, 15))?;
    assert_eq!(request.days(), 2);
    assert_eq!(service.balance(&employee.id)?.normal, 10);

    Ok(())
}

#[test]
fn rejection_that_would_overflow_a_balance_is_refused() -> anyhow::Result<()> {
    let policy = RoleLeavePolicy::from_entries(Role::ALL.into_iter().map(|role| RoleDefault {
        role,
        balance: Balance::new(u32::MAX, 5, 5),
    }))?;
    let (_dir, service) = service_with("restore_overflow.db", policy)?;
    service.seed_role_defaults()?;
    let employee = service.register_user("Asha", Role::Employee)?;
    let manager = service.register_user("Bram", Role::Manager)?;

    let request = service.submit(&caller(&employee), normal_leave(10, 12))?;
    assert_eq!(service.balance(&employee.id)?.normal, u32::MAX - 3);
    service.reset_balances()?;

    let err = service
        .decide(&request.id, &caller(&manager), Decision::Rejected)
        .unwrap_err();
    assert!(matches!(err, LeaveError::BalanceOverflow { days: 3, .. }));

    // nothing was committed
    let stored = service.request(&request.id)?;
    assert_eq!(stored.stage, Stage::Manager);
    assert!(stored.approvals.is_empty());
    assert_eq!(service.balance(&employee.id)?.normal, u32::MAX);

    Ok(())
}
