//! Admission checks a leave application must pass before it enters the chain
use super::config::LeaveConfig;
use super::error::{LeaveError, LeaveResult};
use super::request::span;
use super::types::{Balance, LeaveType};
use chrono::{Days, NaiveDate};

/// What a requester fills in. Caller identity travels separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveApplication {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestValidator {
    advance_notice_days: u32,
    min_reason_len: usize,
}

impl LeaveApplication {
    pub fn new(
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            leave_type,
            start_date,
            end_date,
            reason: reason.into(),
        }
    }
}

impl RequestValidator {
    pub fn new(advance_notice_days: u32, min_reason_len: usize) -> Self {
        Self {
            advance_notice_days,
            min_reason_len,
        }
    }

    pub fn from_config(config: &LeaveConfig) -> Self {
        Self::new(config.advance_notice_days, config.min_reason_len)
    }

    /// Runs every rule in order and stops at the first failure. On success
    /// returns the number of days the application spans.
    pub fn validate(
        &self,
        application: &LeaveApplication,
        balance: &Balance,
        today: NaiveDate,
    ) -> LeaveResult<u32> {
        let reason_len = application.reason.trim().chars().count();
        if reason_len < self.min_reason_len.max(1) {
            return Err(LeaveError::Validation(format!(
                "reason must be at least {} characters",
                self.min_reason_len.max(1)
            )));
        }

        if application.end_date < application.start_date {
            return Err(LeaveError::InvalidRange {
                start: application.start_date,
                end: application.end_date,
            });
        }

        if application.leave_type == LeaveType::Normal {
            let earliest = today
                .checked_add_days(Days::new(self.advance_notice_days.into()))
                .unwrap_or(NaiveDate::MAX);
            if application.start_date < earliest {
                return Err(LeaveError::AdvanceNotice {
                    start: application.start_date,
                    earliest,
                });
            }
        }

        let days = span(application.start_date, application.end_date);
        let available = balance.available(application.leave_type);
        if available < days {
            return Err(LeaveError::InsufficientBalance {
                leave_type: application.leave_type,
                requested: days,
                available,
            });
        }

        Ok(days)
    }
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::from_config(&LeaveConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2026, 3, 2)
    }

    #[test]
    fn accepts_normal_leave_with_enough_notice() {
        let application =
            LeaveApplication::new(LeaveType::Normal, date(2026, 3, 12), date(2026, 3, 14), "trip");

        let days = RequestValidator::default()
            .validate(&application, &Balance::new(12, 6, 3), today())
            .unwrap();
        assert_eq!(days, 3);
    }

    #[test]
    fn notice_boundary_is_exactly_seven_days() {
        let validator = RequestValidator::default();
        let balance = Balance::new(12, 6, 3);

        let on_boundary =
            LeaveApplication::new(LeaveType::Normal, date(2026, 3, 9), date(2026, 3, 9), "trip");
        assert!(validator.validate(&on_boundary, &balance, today()).is_ok());

        let one_short =
            LeaveApplication::new(LeaveType::Normal, date(2026, 3, 8), date(2026, 3, 8), "trip");
        let err = validator.validate(&one_short, &balance, today()).unwrap_err();
        assert!(matches!(
            err,
            LeaveError::AdvanceNotice { earliest, .. } if earliest == date(2026, 3, 9)
        ));
    }

    #[test]
    fn sick_and_emergency_need_no_notice() {
        let validator = RequestValidator::default();
        let balance = Balance::new(0, 6, 3);

        for kind in [LeaveType::Sick, LeaveType::Emergency] {
            let application = LeaveApplication::new(kind, today(), today(), "flu");
            assert_eq!(validator.validate(&application, &balance, today()).unwrap(), 1);
        }
    }

    #[test]
    fn range_is_checked_before_notice() {
        let application =
            LeaveApplication::new(LeaveType::Normal, date(2026, 3, 3), date(2026, 3, 1), "trip");

        let err = RequestValidator::default()
            .validate(&application, &Balance::new(12, 6, 3), today())
            .unwrap_err();
        assert!(matches!(err, LeaveError::InvalidRange { .. }));
    }

    #[test]
    fn short_reason_is_invalid() {
        let application =
            LeaveApplication::new(LeaveType::Sick, today(), today(), "  a  ");

        let err = RequestValidator::default()
            .validate(&application, &Balance::new(12, 6, 3), today())
            .unwrap_err();
        assert!(matches!(err, LeaveError::Validation(_)));
    }

    #[test]
    fn insufficient_balance_names_type_and_shortfall() {
        let application =
            LeaveApplication::new(LeaveType::Emergency, today(), date(2026, 3, 6), "storm damage");

        let err = RequestValidator::default()
            .validate(&application, &Balance::new(12, 6, 3), today())
            .unwrap_err();
        assert!(matches!(
            err,
            LeaveError::InsufficientBalance {
                leave_type: LeaveType::Emergency,
                requested: 5,
                available: 3
            }
        ));
        assert_eq!(err.shortfall(), Some(2));
    }
}
