//! Registry trait for self-registering implementations.
//!
//! Storage and inventory backends each expose a `Registry` struct that names
//! the backend as it appears in configuration and hands out its factory.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "memory" for `storage.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
