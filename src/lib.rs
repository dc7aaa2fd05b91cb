pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod request;
pub mod router;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;
pub mod validator;

pub use error::{LeaveError, LeaveErrorKind, LeaveResult};
pub use service::LeaveService;
