use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DB_PATH: &str = "leave_approval.db";
pub const DEFAULT_ADVANCE_NOTICE_DAYS: u32 = 7;
pub const DEFAULT_MIN_REASON_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveConfig {
    pub db_path: PathBuf,
    // calendar days between today and the start of a Normal leave
    pub advance_notice_days: u32,
    pub min_reason_len: usize,
}

impl Default for LeaveConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            advance_notice_days: DEFAULT_ADVANCE_NOTICE_DAYS,
            min_reason_len: DEFAULT_MIN_REASON_LEN,
        }
    }
}

impl LeaveConfig {
    /// Read `LEAVE_DB_PATH`, `LEAVE_ADVANCE_NOTICE_DAYS` and `LEAVE_MIN_REASON_LEN`,
    /// loading a `.env` file first when one exists. Unset variables keep their defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            db_path: lookup("LEAVE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            advance_notice_days: parse_var(&lookup, "LEAVE_ADVANCE_NOTICE_DAYS")?
                .unwrap_or(defaults.advance_notice_days),
            min_reason_len: parse_var(&lookup, "LEAVE_MIN_REASON_LEN")?
                .unwrap_or(defaults.min_reason_len),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'"))
        })
        .transpose()
}
