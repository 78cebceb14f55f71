//! Authentication: the OpenID Connect adapter and the `/auth/*` routes.

pub mod provider;
pub mod routes;

pub use provider::{AuthError, IdentityProvider, KeycloakProvider};
