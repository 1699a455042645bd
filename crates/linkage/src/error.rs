use std::fmt;

#[derive(Debug)]
pub enum LinkageError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty stage list, duplicate prefix, etc.).
    ConfigValidation(String),
    /// A stage references a source that is not declared.
    UnknownSource(String),
    /// Primary and secondary key column counts differ for a strategy.
    KeyArity {
        stage: String,
        strategy: String,
        primary: usize,
        secondary: usize,
    },
    /// A merged column would overwrite a column already on the primary table.
    ColumnCollision { stage: String, column: String },
    /// A declared table was not supplied to the engine.
    MissingTable(String),
    /// CSV decode / encode error.
    Csv(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSource(source) => write!(f, "unknown source: {source}"),
            Self::KeyArity {
                stage,
                strategy,
                primary,
                secondary,
            } => write!(
                f,
                "stage '{stage}', strategy '{strategy}': primary key has {primary} column(s), secondary key has {secondary}"
            ),
            Self::ColumnCollision { stage, column } => {
                write!(f, "stage '{stage}': column '{column}' already exists on the primary table")
            }
            Self::MissingTable(name) => write!(f, "table '{name}' was not loaded"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for LinkageError {}
