//! SCIP addressing grammar.
//!
//! A SCIP address identifies a chain, a contract path on that chain, a
//! function (or event) name, its typed parameters and its return type:
//!
//! ```text
//! scip://sawtooth2/seth/0xfa3622e1/set?key=uint&value=uint:void
//!        ^^^^^^^^^------------------------------------------- chain id
//!                  ^^^^^^^^^^^^^^^--------------------------- path segments
//!                                  ^^^----------------------- function name
//!                                      ^^^^^^^^^^^^^^^^^^^--- parameters (name=type, ordered)
//!                                                          ^^^^ return type
//! ```
//!
//! Any well-formed URI scheme is accepted and written back unchanged; `scip`
//! is the conventional one. Parsing is purely syntactic. Whether the
//! function exists or the types agree with a deployed contract is decided by
//! the chain adapter.

use crate::Parameter;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Return type denoting a function without a return value.
pub const VOID: &str = "void";

/// Errors raised while parsing a SCIP address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
	#[error("Missing '://' separator in address '{0}'")]
	MissingSchemeSeparator(String),
	#[error("Invalid scheme '{scheme}' in address '{address}'")]
	InvalidScheme { address: String, scheme: String },
	#[error("Missing ':' before the return type in address '{0}'")]
	MissingReturnType(String),
	#[error("Missing '?' before the parameter list in address '{0}'")]
	MissingParameterList(String),
	#[error("Empty chain id in address '{0}'")]
	EmptyChainId(String),
	#[error("Empty function name in address '{0}'")]
	EmptyFunctionName(String),
	#[error("Empty path segment in address '{0}'")]
	EmptyPathSegment(String),
	#[error("Malformed parameter '{parameter}' in address '{address}'")]
	MalformedParameter { address: String, parameter: String },
}

/// A parsed SCIP address. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScipAddress {
	pub scheme: String,
	pub chain_id: String,
	pub path_segments: Vec<String>,
	pub function_name: String,
	/// Declared parameters in positional order; values are always `None`.
	pub parameter_types: Vec<Parameter>,
	pub return_type: String,
}

impl ScipAddress {
	/// Parses an address string.
	pub fn parse(input: &str) -> Result<Self, AddressParseError> {
		let (scheme, rest) = input
			.split_once("://")
			.ok_or_else(|| AddressParseError::MissingSchemeSeparator(input.to_string()))?;
		if !is_valid_scheme(scheme) {
			return Err(AddressParseError::InvalidScheme {
				address: input.to_string(),
				scheme: scheme.to_string(),
			});
		}

		let colon = last_unescaped_colon(rest)
			.ok_or_else(|| AddressParseError::MissingReturnType(input.to_string()))?;
		let (head, return_type) = (&rest[..colon], &rest[colon + 1..]);
		if return_type.is_empty() {
			return Err(AddressParseError::MissingReturnType(input.to_string()));
		}

		let (path, params) = head
			.split_once('?')
			.ok_or_else(|| AddressParseError::MissingParameterList(input.to_string()))?;

		let mut components: Vec<&str> = path.split('/').collect();
		let chain_id = components.remove(0);
		if chain_id.is_empty() {
			return Err(AddressParseError::EmptyChainId(input.to_string()));
		}
		let function_name = match components.pop() {
			Some(name) if !name.is_empty() => name,
			_ => return Err(AddressParseError::EmptyFunctionName(input.to_string())),
		};
		if components.iter().any(|segment| segment.is_empty()) {
			return Err(AddressParseError::EmptyPathSegment(input.to_string()));
		}

		let parameter_types = if params.is_empty() {
			Vec::new()
		} else {
			params
				.split('&')
				.map(|item| match item.rsplit_once('=') {
					Some((name, type_name)) if !name.is_empty() && !type_name.is_empty() => {
						Ok(Parameter::typed(name, type_name))
					},
					_ => Err(AddressParseError::MalformedParameter {
						address: input.to_string(),
						parameter: item.to_string(),
					}),
				})
				.collect::<Result<Vec<_>, _>>()?
		};

		Ok(Self {
			scheme: scheme.to_string(),
			chain_id: chain_id.to_string(),
			path_segments: components.into_iter().map(str::to_string).collect(),
			function_name: function_name.to_string(),
			parameter_types,
			return_type: return_type.to_string(),
		})
	}

	/// Path segments joined with `/`, empty for chain-level addresses.
	pub fn contract_path(&self) -> String {
		self.path_segments.join("/")
	}

	/// Returns true unless the return type is `void`.
	pub fn has_return_value(&self) -> bool {
		self.return_type != VOID
	}
}

/// URI scheme syntax: a letter followed by letters, digits, `+`, `-` or `.`.
fn is_valid_scheme(scheme: &str) -> bool {
	let mut chars = scheme.chars();
	chars.next().is_some_and(|c| c.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Finds the byte index of the last `:` not preceded by a backslash.
fn last_unescaped_colon(s: &str) -> Option<usize> {
	let bytes = s.as_bytes();
	(0..bytes.len())
		.rev()
		.find(|&i| bytes[i] == b':' && (i == 0 || bytes[i - 1] != b'\\'))
}

impl FromStr for ScipAddress {
	type Err = AddressParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for ScipAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}://{}", self.scheme, self.chain_id)?;
		for segment in &self.path_segments {
			write!(f, "/{}", segment)?;
		}
		write!(f, "/{}?", self.function_name)?;
		for (i, param) in self.parameter_types.iter().enumerate() {
			if i > 0 {
				write!(f, "&")?;
			}
			write!(f, "{}={}", param.name, param.type_name)?;
		}
		write!(f, ":{}", self.return_type)
	}
}

impl Serialize for ScipAddress {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for ScipAddress {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		ScipAddress::parse(&s).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_zero_parameter_address() {
		let address = ScipAddress::parse("scip://eth1/0xdf12ab/getOwner?:address").unwrap();

		assert_eq!(address.chain_id, "eth1");
		assert_eq!(address.path_segments, vec!["0xdf12ab".to_string()]);
		assert_eq!(address.function_name, "getOwner");
		assert!(address.parameter_types.is_empty());
		assert_eq!(address.return_type, "address");
		assert!(address.has_return_value());
	}

	#[test]
	fn test_multi_segment_address_with_parameters() {
		let address =
			ScipAddress::parse("scip://sawtooth2/seth/0xfa3622e1/set?key=uint&value=uint:void")
				.unwrap();

		assert_eq!(address.chain_id, "sawtooth2");
		assert_eq!(address.path_segments, vec!["seth", "0xfa3622e1"]);
		assert_eq!(address.contract_path(), "seth/0xfa3622e1");
		assert_eq!(address.function_name, "set");
		assert_eq!(
			address.parameter_types,
			vec![Parameter::typed("key", "uint"), Parameter::typed("value", "uint")]
		);
		assert_eq!(address.return_type, "void");
		assert!(!address.has_return_value());
	}

	#[test]
	fn test_any_scheme_routes_by_chain_id() {
		let address = ScipAddress::parse("http://eth1/c/f?:void").unwrap();
		assert_eq!(address.scheme, "http");
		assert_eq!(address.chain_id, "eth1");
		assert_eq!(address.to_string(), "http://eth1/c/f?:void");
		assert_ne!(address, ScipAddress::parse("scip://eth1/c/f?:void").unwrap());
	}

	#[test]
	fn test_chain_level_address_has_no_segments() {
		let address = ScipAddress::parse("scip://btc/transfer?to=address:void").unwrap();
		assert!(address.path_segments.is_empty());
		assert_eq!(address.contract_path(), "");
		assert_eq!(address.function_name, "transfer");
	}

	#[test]
	fn test_display_is_bit_exact() {
		for input in [
			"scip://eth1/0xDEADBEEF/getOwner?:address",
			"scip://sawtooth2/seth/0xfa3622e1/set?key=uint&value=uint:void",
			"scip://btc/transfer?to=address:void",
			"SCIP://eth1/c/f?:void",
			"chain+v2://eth1/c/f?:void",
		] {
			assert_eq!(ScipAddress::parse(input).unwrap().to_string(), input);
		}
	}

	#[test]
	fn test_return_type_uses_last_unescaped_colon() {
		let address = ScipAddress::parse("scip://eth1/c/f?a=map\\:int:tuple").unwrap();
		assert_eq!(address.parameter_types[0].type_name, "map\\:int");
		assert_eq!(address.return_type, "tuple");
	}

	#[test]
	fn test_malformed_addresses() {
		assert!(matches!(
			ScipAddress::parse("eth1/c/f?:void"),
			Err(AddressParseError::MissingSchemeSeparator(_))
		));
		assert!(matches!(
			ScipAddress::parse("://eth1/c/f?:void"),
			Err(AddressParseError::InvalidScheme { .. })
		));
		assert!(matches!(
			ScipAddress::parse("1scip://eth1/c/f?:void"),
			Err(AddressParseError::InvalidScheme { .. })
		));
		assert!(matches!(
			ScipAddress::parse("sc ip://eth1/c/f?:void"),
			Err(AddressParseError::InvalidScheme { .. })
		));
		assert!(matches!(
			ScipAddress::parse("scip://eth1/c/f?"),
			Err(AddressParseError::MissingReturnType(_))
		));
		assert!(matches!(
			ScipAddress::parse("scip:///c/f?:void"),
			Err(AddressParseError::EmptyChainId(_))
		));
		assert!(matches!(
			ScipAddress::parse("scip://eth1?:void"),
			Err(AddressParseError::EmptyFunctionName(_))
		));
		assert!(matches!(
			ScipAddress::parse("scip://eth1/c/?:void"),
			Err(AddressParseError::EmptyFunctionName(_))
		));
		assert!(matches!(
			ScipAddress::parse("scip://eth1//f?:void"),
			Err(AddressParseError::EmptyPathSegment(_))
		));
		assert!(matches!(
			ScipAddress::parse("scip://eth1/c/f?key:void"),
			Err(AddressParseError::MalformedParameter { .. })
		));
	}

	#[test]
	fn test_serde_as_string() {
		let input = "scip://eth1/0xDEADBEEF/getOwner?:address";
		let address = ScipAddress::parse(input).unwrap();
		let json = serde_json::to_string(&address).unwrap();
		assert_eq!(json, format!("\"{}\"", input));
		let back: ScipAddress = serde_json::from_str(&json).unwrap();
		assert_eq!(back, address);
	}
}
