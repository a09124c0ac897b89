mod error;
mod layer;

pub(crate) use layer::AuthLayer;

type AuthResult<T> = Result<T, error::AuthError>;
