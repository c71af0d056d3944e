use actix_web::HttpResponse;
use derive_more::Display;

/// Single uniform body for every terminal "gone" outcome. Keeping the
/// wording identical for never-existed, already-read and expired notes
/// denies an observer the ability to probe which one happened.
pub const NOT_FOUND_BODY: &str = "note not found";

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum ServiceError {
    #[display(fmt = "network failure: {}", _0)]
    Network(String),
    #[display(fmt = "note not found")]
    NotFound,
    #[display(fmt = "note already read")]
    AlreadyRead,
    #[display(fmt = "note expired")]
    Expired,
    #[display(fmt = "decryption failed")]
    Decryption,
    #[display(fmt = "encryption failed")]
    Cipher,
    #[display(fmt = "invalid input: {}", _0)]
    Validation(&'static str),
    #[display(fmt = "rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },
    #[display(fmt = "database error")]
    Database,
    #[display(fmt = "connection pool error")]
    Pool,
    #[display(fmt = "missing or malformed environment variable")]
    Environment,
    #[display(fmt = "unknown error: {}", _0)]
    Unknown(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Network(_)
                | ServiceError::RateLimited { .. }
                | ServiceError::Database
                | ServiceError::Pool
        )
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ServiceError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Short text suitable for direct display to an end user.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Network(_) => "Unable to connect to the server".to_string(),
            ServiceError::NotFound => "This note does not exist".to_string(),
            ServiceError::AlreadyRead => "This note has already been viewed".to_string(),
            ServiceError::Expired => "This note has expired".to_string(),
            ServiceError::Decryption => "Unable to decrypt this note".to_string(),
            ServiceError::Cipher => "Unable to encrypt this note".to_string(),
            ServiceError::Validation(msg) => (*msg).to_string(),
            ServiceError::RateLimited { .. } => "Too many requests".to_string(),
            _ => "An unexpected error occurred".to_string(),
        }
    }

    /// What the user can do about it.
    pub fn advice(&self) -> String {
        match self {
            ServiceError::Network(_) => {
                "Please check your internet connection and try again.".to_string()
            }
            ServiceError::NotFound => {
                "The link may be incorrect or the note may have already been deleted.".to_string()
            }
            ServiceError::AlreadyRead => {
                "Notes can only be read once. The sender needs to create a new note.".to_string()
            }
            ServiceError::Expired => {
                "Notes are deleted after their expiration time. The sender needs to create a new note."
                    .to_string()
            }
            ServiceError::Decryption => {
                "This note may have been encrypted with a different key. Make sure you are using the correct link."
                    .to_string()
            }
            ServiceError::Validation(_) => "Please check your input and try again.".to_string(),
            ServiceError::RateLimited { retry_after_secs } => {
                format!("Please wait {} seconds before trying again.", retry_after_secs)
            }
            _ => "Please try again. If the problem persists, contact support.".to_string(),
        }
    }
}

/// Best-effort classification of errors that arrive as bare text from a
/// transport we do not control. Typed `From` conversions are preferred
/// wherever the source is a library error; this is the adapter for
/// everything else.
pub fn classify(message: &str) -> ServiceError {
    let msg = message.to_lowercase();

    if msg.contains("network") || msg.contains("fetch") || msg.contains("connection") {
        return ServiceError::Network(message.to_string());
    }
    if msg.contains("already been read") || msg.contains("destroyed") {
        return ServiceError::AlreadyRead;
    }
    if msg.contains("expired") {
        return ServiceError::Expired;
    }
    if msg.contains("not found") || msg.contains("does not exist") || msg.contains("deleted") {
        return ServiceError::NotFound;
    }
    if msg.contains("decrypt") || msg.contains("encryption") {
        return ServiceError::Decryption;
    }
    if msg.contains("rate limit") || msg.contains("too many") {
        return ServiceError::RateLimited {
            retry_after_secs: 60,
        };
    }

    ServiceError::Unknown(message.to_string())
}

impl From<r2d2::Error> for ServiceError {
    fn from(_: r2d2::Error) -> ServiceError {
        ServiceError::Pool
    }
}

impl From<std::env::VarError> for ServiceError {
    fn from(_: std::env::VarError) -> ServiceError {
        ServiceError::Environment
    }
}

impl From<diesel::result::Error> for ServiceError {
    fn from(err: diesel::result::Error) -> ServiceError {
        match err {
            diesel::result::Error::NotFound => ServiceError::NotFound,
            _ => ServiceError::Database,
        }
    }
}

impl From<std::string::FromUtf8Error> for ServiceError {
    fn from(_: std::string::FromUtf8Error) -> ServiceError {
        ServiceError::Decryption
    }
}

impl actix_web::error::ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::NotFound | ServiceError::AlreadyRead | ServiceError::Expired => {
                HttpResponse::NotFound().body(NOT_FOUND_BODY)
            }
            ServiceError::Decryption => HttpResponse::Unauthorized().body("unable to decrypt note"),
            ServiceError::Cipher => {
                HttpResponse::InternalServerError().body("Server Error: encryption unavailable")
            }
            ServiceError::Validation(msg) => {
                HttpResponse::BadRequest().body(format!("Invalid Request: {}", msg))
            }
            ServiceError::RateLimited { retry_after_secs } => HttpResponse::TooManyRequests()
                .insert_header(("Retry-After", retry_after_secs.to_string()))
                .body("too many requests"),
            ServiceError::Network(_) => {
                HttpResponse::ServiceUnavailable().body("Server Error: upstream unreachable")
            }
            ServiceError::Database => {
                HttpResponse::InternalServerError().body("Library Error: Diesel Error.")
            }
            ServiceError::Pool => {
                HttpResponse::InternalServerError().body("Server Error: Pooling Error.")
            }
            ServiceError::Environment => HttpResponse::InternalServerError()
                .body("Server Error: Use of an uninitialized environment variable."),
            ServiceError::Unknown(_) => {
                HttpResponse::InternalServerError().body("Server Error: unknown failure")
            }
        }
    }
}
