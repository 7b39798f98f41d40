//! Registration trait for chain family implementations.

/// Implemented by every chain family so it can be looked up by the name used
/// in the `family` key of a chain's configuration.
pub trait ImplementationRegistry {
	/// Family name as written in configuration, e.g. `"simulated"`.
	const NAME: &'static str;

	/// Factory type produced for this family.
	type Factory;

	fn factory() -> Self::Factory;
}
