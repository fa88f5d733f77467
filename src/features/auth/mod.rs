//! Password login and bearer token authentication.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | POST | `/api/auth/login` | No | Exchange credentials for an access token |
//! | GET | `/api/auth/me` | Yes | Current account and profile |
//! | POST | `/api/auth/change-password` | Yes | Replace the caller's password |

mod jwt;

pub mod dtos;
pub mod guards;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod services;

pub use jwt::JwtService;
pub use services::AuthService;
