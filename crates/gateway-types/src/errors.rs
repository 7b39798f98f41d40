//! Stable error codes handed to external callers.
//!
//! The numeric values are part of the callback contract and must never be
//! renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum ErrorCode {
	UnknownError = 0,
	/// Malformed SCIP address.
	AddressParse = 1,
	/// The chain endpoint could not be reached.
	NodeUnreachable = 2,
	/// The chain rejected the operation.
	InvalidTransaction = 3,
	/// The chain family lacks the capability.
	UnsupportedOperation = 4,
	/// No adapter is configured for the requested chain id.
	ChainIdNotFound = 5,
	/// A monitor's deadline elapsed before the requested confidence.
	Timeout = 6,
	/// Arguments do not match the declared function signature.
	InvalidParameters = 7,
	/// Explicit cancellation. Never delivered to external callers.
	ManuallyUnsubscribed = 8,
}

impl ErrorCode {
	pub fn code(self) -> i32 {
		self as i32
	}
}

impl From<ErrorCode> for i32 {
	fn from(code: ErrorCode) -> Self {
		code.code()
	}
}

impl TryFrom<i32> for ErrorCode {
	type Error = String;

	fn try_from(value: i32) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(ErrorCode::UnknownError),
			1 => Ok(ErrorCode::AddressParse),
			2 => Ok(ErrorCode::NodeUnreachable),
			3 => Ok(ErrorCode::InvalidTransaction),
			4 => Ok(ErrorCode::UnsupportedOperation),
			5 => Ok(ErrorCode::ChainIdNotFound),
			6 => Ok(ErrorCode::Timeout),
			7 => Ok(ErrorCode::InvalidParameters),
			8 => Ok(ErrorCode::ManuallyUnsubscribed),
			other => Err(format!("Unknown error code {}", other)),
		}
	}
}

impl fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}({})", self, self.code())
	}
}
