use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure is local to a single call (one parse, one interning operation, one generation
/// request) and is reported synchronously. None of these errors are transient, so nothing in the
/// library retries.
///
/// # Error Categories
///
/// ## Class File Errors
/// - [`Error::Malformed`] - The class file bytes could not be parsed
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::InvalidSignature`] - A descriptor or generic signature violates the grammar
/// - [`Error::LimitExceeded`] - A class file limit (pool size, code length, ...) was hit
///
/// ## Resolution Errors
/// - [`Error::Resolution`] - A referenced interface could not be located
/// - [`Error::NotAnInterface`] - A type that must be an interface is not one
/// - [`Error::RecursionLimit`] - The interface graph is deeper than allowed
/// - [`Error::FileError`] - Filesystem I/O errors from a class source
///
/// ## Generation Errors
/// - [`Error::AmbiguousOverride`] - Two generic contracts cannot be reconciled
/// - [`Error::InvalidName`] - The requested class name is not a valid internal name
///
/// # Examples
///
/// ```rust,no_run
/// use classforge::{Error, ClassMetadataReader};
///
/// match ClassMetadataReader::parse(&[0xCA, 0xFE]) {
///     Ok(metadata) => println!("Parsed {}", metadata.name),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed class file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The class file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A referenced interface could not be located through the class source.
    ///
    /// The associated value is the internal name that failed to resolve.
    #[error("Failed to resolve type - {0}")]
    Resolution(String),

    /// A type that has to be an interface (the generation target or one of its ancestors)
    /// is a class.
    #[error("Type is not an interface - {0}")]
    NotAnInterface(String),

    /// Two unrelated super-interfaces declare the same erased method with generic contracts
    /// that cannot be reconciled.
    #[error("Ambiguous override of {name}{descriptor} between {first} and {second}")]
    AmbiguousOverride {
        /// Method name
        name: String,
        /// Erased method descriptor shared by both declarations
        descriptor: String,
        /// Interface whose declaration was visited first
        first: String,
        /// Interface whose declaration conflicts with the first one
        second: String,
    },

    /// A class name is not a valid internal name.
    #[error("Invalid class name - {0}")]
    InvalidName(String),

    /// A descriptor or generic signature could not be parsed.
    #[error("Invalid signature - {0}")]
    InvalidSignature(String),

    /// A hard limit of the class file format was exceeded while writing.
    #[error("Class file limit exceeded - {0}")]
    LimitExceeded(String),

    /// Recursion limit reached.
    ///
    /// The interface graph walk enforces a maximum depth; the associated value is that limit.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that occur while loading class files from disk.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
