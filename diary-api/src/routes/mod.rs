pub(crate) mod error;
pub(crate) mod verify;

pub(crate) use error::ApiError;
