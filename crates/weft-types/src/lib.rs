//! Core types for weft.
//!
//! This crate provides the leaf types shared by every weft crate:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-types  : CallSite, TypeTag, Value, Fault    ◄── HERE  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weft-advice : Pointcut, Registry, Chain, Dispatcher        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weft-cli    : config loading, tracing setup, commands      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use weft_types::{CallSite, Fault, Value};
//!
//! let site = CallSite::parse("demo.dao.AccountDao.addAccount(Account, bool)").unwrap();
//! assert_eq!(site.short_signature(), "AccountDao.addAccount(..)");
//!
//! let arg = Value::new(true);
//! assert_eq!(arg.get::<bool>(), Some(true));
//!
//! let fault = Fault::new("IO", "disk unavailable");
//! assert_eq!(fault.to_string(), "IO: disk unavailable");
//! ```

mod call_site;
mod error;
mod fault;
mod value;

pub use call_site::{split_arguments, split_signature, CallSite, ParseCallSiteError, TypeTag};
pub use error::{
    assert_error_code, assert_error_codes, check_error_code, CodeViolation, ErrorCode,
    ERROR_NAMESPACES,
};
pub use fault::Fault;
pub use value::{Payload, Value};
