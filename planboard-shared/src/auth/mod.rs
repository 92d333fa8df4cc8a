/// Authentication and authorization
///
/// # Modules
///
/// - [`jwt`]: HS256 access token creation and validation
/// - [`middleware`]: Axum middleware turning a bearer token into an `AuthContext`
/// - [`authorization`]: existence, ownership and visibility checks

pub mod authorization;
pub mod jwt;
pub mod middleware;
