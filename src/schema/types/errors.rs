use thiserror::Error;

/// Errors raised while registering fields, steps or derived fields.
///
/// These are setup-time errors: a rejected registration leaves the registry
/// or graph exactly as it was, and an engine whose configuration produces one
/// of these is never constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A derived field would (directly or transitively) depend on itself
    #[error("Cyclic dependency while registering '{name}': {}", path.join(" -> "))]
    CyclicDependency { name: String, path: Vec<String> },

    /// A derived field references an input that is neither a field nor an earlier derivation
    #[error("Unknown dependency '{input}' referenced by derived field '{name}'")]
    UnknownDependency { name: String, input: String },

    /// A field with this name is already registered
    #[error("Field already registered: {name}")]
    DuplicateField { name: String },

    /// A derived field name collides with a schema field name
    #[error("Name conflict: '{name}' is already a schema field")]
    NameConflict { name: String },

    /// The field's pattern is not a valid regular expression
    #[error("Invalid pattern for field '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    /// A new schema version would make an optional field required again
    #[error("Field '{name}' cannot be tightened back to required at runtime")]
    TighteningNotAllowed { name: String },

    /// A step definition is empty or malformed
    #[error("Invalid step '{step}': {reason}")]
    InvalidStep { step: String, reason: String },

    /// A reference to a field that was never registered
    #[error("Unknown field: {name}")]
    UnknownField { name: String },

    /// A dynamic field group already has its maximum number of instances
    #[error("Dynamic group '{base}' is limited to {max} instances")]
    InstanceLimit { base: String, max: usize },

    /// A configured capability needs a collaborator that was not supplied
    #[error("Capability '{capability}' requires a {collaborator}")]
    MissingCollaborator {
        capability: String,
        collaborator: String,
    },
}

/// Result type alias for registration operations
pub type RegistrationResult<T> = Result<T, RegistrationError>;
