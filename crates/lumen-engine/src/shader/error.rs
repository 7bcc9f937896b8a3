use std::fmt;

/// Failure while validating, compiling or looking up a shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// The program was given an empty (or whitespace-only) name.
    EmptyName,
    /// WGSL text failed to parse.
    Parse { name: String, message: String },
    /// WGSL parsed but the module is not valid.
    Invalid { name: String, message: String },
    /// A required entry point is missing or declared for the wrong stage.
    MissingEntryPoint {
        name: String,
        entry: String,
        stage: &'static str,
    },
    /// The program's inputs or resources do not fit the pipeline it is built into.
    Interface { name: String, message: String },
    /// A program with this name is already registered.
    Duplicate(String),
    /// The GPU backend reported compilation errors.
    Compile { name: String, messages: Vec<String> },
    /// No program is registered under this name.
    Unknown(String),
}

impl ShaderError {
    /// Name of the program the error refers to, if any.
    pub fn program_name(&self) -> Option<&str> {
        match self {
            ShaderError::EmptyName => None,
            ShaderError::Parse { name, .. }
            | ShaderError::Invalid { name, .. }
            | ShaderError::MissingEntryPoint { name, .. }
            | ShaderError::Interface { name, .. }
            | ShaderError::Compile { name, .. } => Some(name),
            ShaderError::Duplicate(name) | ShaderError::Unknown(name) => Some(name),
        }
    }
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::EmptyName => write!(f, "shader program name is empty"),
            ShaderError::Parse { name, message } => {
                write!(f, "shader `{name}` failed to parse: {message}")
            }
            ShaderError::Invalid { name, message } => {
                write!(f, "shader `{name}` failed validation: {message}")
            }
            ShaderError::MissingEntryPoint { name, entry, stage } => {
                write!(f, "shader `{name}` has no {stage} entry point `{entry}`")
            }
            ShaderError::Interface { name, message } => {
                write!(f, "shader `{name}` does not fit the pipeline layout: {message}")
            }
            ShaderError::Duplicate(name) => {
                write!(f, "shader `{name}` is already registered")
            }
            ShaderError::Compile { name, messages } => {
                write!(f, "shader `{name}` failed to compile: {}", messages.join("; "))
            }
            ShaderError::Unknown(name) => write!(f, "unknown shader `{name}`"),
        }
    }
}

impl std::error::Error for ShaderError {}
