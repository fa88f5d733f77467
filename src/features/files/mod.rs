//! Folder-scoped file operations.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Grant | Description |
//! |--------|----------|-------|-------------|
//! | GET | `/api/browser/{path}` | read | List a folder |
//! | GET | `/api/download/{path}` | read (parent) | Stream a file |
//! | GET | `/api/preview/{path}` | read (parent) | File details |
//! | POST | `/api/upload` | write | Multipart batch upload |
//! | GET | `/api/upload/progress/{id}` | owner | Upload session progress |
//! | POST | `/api/delete` | admin (parent) | Delete a file or empty folder |
//! | GET | `/api/search` | any | Filename search over readable folders |
//! | POST | `/api/create-folder` | write | Create a sub-folder |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{PgUploadSessionRepository, UploadSessionRepository};
pub use routes::routes;
pub use services::FileService;
