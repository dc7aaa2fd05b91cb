//! Core vocabulary of the leave workflow: roles, leave types, stages and timestamps
use super::error::LeaveError;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Role {
    #[n(0)]
    Admin,
    #[n(1)]
    Hr,
    #[n(2)]
    Manager,
    #[n(3)]
    Employee,
    #[n(4)]
    Intern,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LeaveType {
    #[n(0)]
    Normal,
    #[n(1)]
    Sick,
    #[n(2)]
    Emergency,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Decision {
    #[n(0)]
    Approved,
    #[n(1)]
    Rejected,
}

// Declaration order is the approval chain order, stages only ever move forward.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    #[n(0)]
    Manager,
    #[n(1)]
    Hr,
    #[n(2)]
    Admin,
    #[n(3)]
    Completed,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Status {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
}

/// Per leave type day counts, used both for role defaults and user balances.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Balance {
    #[n(0)]
    pub normal: u32,
    #[n(1)]
    pub sick: u32,
    #[n(2)]
    pub emergency: u32,
}

/// Identity of whoever invokes an operation, as supplied by the external authenticator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

// Day granularity date, stored as days since the common era
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarDate(NaiveDate);

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Hr,
        Role::Manager,
        Role::Employee,
        Role::Intern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Hr => "HR",
            Role::Manager => "Manager",
            Role::Employee => "Employee",
            Role::Intern => "Intern",
        }
    }
}

impl LeaveType {
    pub const ALL: [LeaveType; 3] = [LeaveType::Normal, LeaveType::Sick, LeaveType::Emergency];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Normal => "Normal",
            LeaveType::Sick => "Sick",
            LeaveType::Emergency => "Emergency",
        }
    }
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
        }
    }
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Manager => "Manager",
            Stage::Hr => "HR",
            Stage::Admin => "Admin",
            Stage::Completed => "Completed",
        }
    }
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Approved => "Approved",
            Status::Rejected => "Rejected",
        }
    }
}

impl From<Decision> for Status {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => Status::Approved,
            Decision::Rejected => Status::Rejected,
        }
    }
}

impl Balance {
    pub fn new(normal: u32, sick: u32, emergency: u32) -> Self {
        Self {
            normal,
            sick,
            emergency,
        }
    }
    pub fn available(&self, leave_type: LeaveType) -> u32 {
        match leave_type {
            LeaveType::Normal => self.normal,
            LeaveType::Sick => self.sick,
            LeaveType::Emergency => self.emergency,
        }
    }
    pub(crate) fn slot_mut(&mut self, leave_type: LeaveType) -> &mut u32 {
        match leave_type {
            LeaveType::Normal => &mut self.normal,
            LeaveType::Sick => &mut self.sick,
            LeaveType::Emergency => &mut self.emergency,
        }
    }
}

impl Caller {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

impl TimeStamp<Utc> {
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(TimeStamp)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl CalendarDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(CalendarDate)
    }
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

// Utc has no Ord, so timestamps order by instant
impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(value: NaiveDate) -> Self {
        CalendarDate(value)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Role, LeaveType, Decision, Stage, Status);

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Role {
    type Err = LeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| LeaveError::UnknownRole(s.to_string()))
    }
}

impl FromStr for LeaveType {
    type Err = LeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaveType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LeaveError::Validation(format!("unknown leave type '{s}'")))
    }
}

impl FromStr for Decision {
    type Err = LeaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approved" => Ok(Decision::Approved),
            "Rejected" => Ok(Decision::Rejected),
            other => Err(LeaveError::Validation(format!(
                "decision must be 'Approved' or 'Rejected', got '{other}'"
            ))),
        }
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

impl<C> minicbor::Encode<C> for CalendarDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(self.0.num_days_from_ce())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for CalendarDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days)
            .map(CalendarDate)
            .ok_or(minicbor::decode::Error::message(
                "failed to convert day number to a calendar date",
            ))
    }
}
