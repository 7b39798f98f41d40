//! Schema validation for TOML configuration sections.
//!
//! Chain families describe their `settings` table with a [`Schema`]; the
//! builder validates every configured chain against its family's schema
//! before the adapter is constructed.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

impl ValidationError {
	fn mismatch(field: &str, expected: &str, value: &toml::Value) -> Self {
		ValidationError::TypeMismatch {
			field: field.to_string(),
			expected: expected.to_string(),
			actual: value.type_str().to_string(),
		}
	}

	fn invalid(field: &str, message: String) -> Self {
		ValidationError::InvalidValue {
			field: field.to_string(),
			message,
		}
	}

	/// Prefixes the field path with the enclosing table name.
	fn nested(self, parent: &str) -> Self {
		match self {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{}.{}", parent, f))
			},
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", parent, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", parent, field),
				expected,
				actual,
			},
			other => other,
		}
	}
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// Float with optional inclusive bounds. Integers are accepted as well.
	Float { min: Option<f64>, max: Option<f64> },
	Boolean,
	/// Array whose elements all share one type.
	Array(Box<FieldType>),
	/// Nested table with its own schema.
	Table(Schema),
}

/// Custom check run after the type check succeeds.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|msg| ValidationError::invalid(&self.name, msg))?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
///
/// Keys that appear in neither list are ignored.
#[derive(Debug, Default)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// The value must be a table. Every required field must be present, and
	/// every present field must have the declared type and pass its validator.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::mismatch("root", "table", config))?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn check_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(ValidationError::mismatch(field_name, "string", value));
			}
		},
		FieldType::Integer { min, max } => {
			let v = value
				.as_integer()
				.ok_or_else(|| ValidationError::mismatch(field_name, "integer", value))?;
			if let Some(min) = min.filter(|min| v < *min) {
				return Err(ValidationError::invalid(
					field_name,
					format!("Value {} is less than minimum {}", v, min),
				));
			}
			if let Some(max) = max.filter(|max| v > *max) {
				return Err(ValidationError::invalid(
					field_name,
					format!("Value {} is greater than maximum {}", v, max),
				));
			}
		},
		FieldType::Float { min, max } => {
			let v = value
				.as_float()
				.or_else(|| value.as_integer().map(|i| i as f64))
				.ok_or_else(|| ValidationError::mismatch(field_name, "float", value))?;
			if let Some(min) = min.filter(|min| v < *min) {
				return Err(ValidationError::invalid(
					field_name,
					format!("Value {} is less than minimum {}", v, min),
				));
			}
			if let Some(max) = max.filter(|max| v > *max) {
				return Err(ValidationError::invalid(
					field_name,
					format!("Value {} is greater than maximum {}", v, max),
				));
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(ValidationError::mismatch(field_name, "boolean", value));
			}
		},
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| ValidationError::mismatch(field_name, "array", value))?;
			for (i, item) in array.iter().enumerate() {
				check_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| e.nested(field_name))?;
		},
	}

	Ok(())
}

/// A configuration schema that can validate TOML values.
///
/// Every chain family exposes one for its `settings` table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn settings_schema() -> Schema {
		Schema::new(
			vec![Field::new(
				"block_interval_ms",
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			)],
			vec![
				Field::new(
					"ratio",
					FieldType::Float {
						min: Some(0.0),
						max: Some(1.0),
					},
				),
				Field::new(
					"limits",
					FieldType::Table(Schema::new(
						vec![Field::new("max", FieldType::Integer { min: None, max: None })],
						vec![],
					)),
				),
				Field::new("tags", FieldType::Array(Box::new(FieldType::String))).with_validator(
					|v| match v.as_array() {
						Some(a) if a.is_empty() => Err("must not be empty".to_string()),
						_ => Ok(()),
					},
				),
			],
		)
	}

	fn parse(s: &str) -> toml::Value {
		toml::from_str(s).unwrap()
	}

	#[test]
	fn test_valid_table() {
		let config = parse(
			r#"
			block_interval_ms = 100
			ratio = 1
			tags = ["a"]
			[limits]
			max = 5
			"#,
		);
		assert!(settings_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_and_mistyped_fields() {
		let err = settings_schema().validate(&parse("ratio = 0.5")).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "block_interval_ms"));

		let err = settings_schema()
			.validate(&parse("block_interval_ms = \"fast\""))
			.unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { .. }));
	}

	#[test]
	fn test_bounds_and_nested_paths() {
		let err = settings_schema()
			.validate(&parse("block_interval_ms = 1\nratio = 1.5"))
			.unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { field, .. } if field == "ratio"));

		let err = settings_schema()
			.validate(&parse("block_interval_ms = 1\n[limits]\nother = 1"))
			.unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "limits.max"));
	}

	#[test]
	fn test_custom_validator_runs() {
		let err = settings_schema()
			.validate(&parse("block_interval_ms = 1\ntags = []"))
			.unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { field, .. } if field == "tags"));
	}
}
