//! Schema-driven JSON deserialization into caller types.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{ParserKind, ResponseParser};
use crate::domain::entities::{DEFAULT_PROTOCOL_CHARSET, RawResponse};
use crate::domain::errors::RequestError;

/// Deserializes the JSON body into `T`.
///
/// The field mapping comes from `T`'s `Deserialize` implementation, so shape
/// mismatches surface as `ParseError`.
pub struct TypedParser<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> TypedParser<T> {
    /// Creates a parser for `T`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for TypedParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for TypedParser<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedParser")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> ResponseParser for TypedParser<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn kind(&self) -> ParserKind {
        ParserKind::TypedObject
    }

    fn parse(&self, response: &RawResponse) -> Result<T, RequestError> {
        let text = response.text(DEFAULT_PROTOCOL_CHARSET)?;
        serde_json::from_str(&text).map_err(|e| {
            RequestError::parse_with(
                format!("cannot map JSON onto {}: {e}", std::any::type_name::<T>()),
                e,
            )
        })
    }
}
