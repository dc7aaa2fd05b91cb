//! Identifier generation for users and leave requests

use bech32::Bech32m;
use uuid7::uuid7;

pub const USER_HRP: &str = "user_";
pub const LEAVE_HRP: &str = "leave_";

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub fn new_user_id() -> anyhow::Result<String> {
    new_uuid_to_bech32(USER_HRP)
}

pub fn new_leave_id() -> anyhow::Result<String> {
    new_uuid_to_bech32(LEAVE_HRP)
}
