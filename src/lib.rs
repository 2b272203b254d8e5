//! EduShare API
//!
//! REST backend for sharing, rating and requesting educational materials.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── error.rs       - Error taxonomy and HTTP mapping
//! ├── models/        - Users, materials, requests, badges
//! ├── database/      - Store traits with PostgreSQL and in-memory backends
//! │   ├── pool.rs      - Connection pool and schema
//! │   ├── users.rs     - User queries
//! │   ├── materials.rs - Material and rating queries
//! │   ├── requests.rs  - Request queries
//! │   └── memory.rs    - In-process store
//! ├── crypto/        - Credentials
//! │   ├── token.rs     - HS256 bearer tokens
//! │   └── password.rs  - Argon2id password hashes
//! ├── reputation/    - Ratings, averages, badges, contribution points
//! │   ├── rating.rs    - Per-user rating upsert and average
//! │   ├── thresholds.rs - Points and Expert promotion bar
//! │   └── manager.rs   - Rating orchestrator
//! ├── publishing.rs  - Material publish sequence
//! ├── uploads.rs     - Uploaded file storage
//! └── api/           - HTTP API endpoints
//!     ├── auth.rs      - Register, login
//!     ├── materials.rs - Materials, rating, downloads
//!     ├── users.rs     - Profiles
//!     ├── requests.rs  - Material requests
//!     └── middleware.rs - Auth, rate limiting, headers, logging
//! ```

pub mod api;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod models;
pub mod publishing;
pub mod reputation;
pub mod uploads;

// Re-export main types for convenience
pub use config::AppConfig;
pub use error::{AppError, AppResult};

pub use api::{AppState, HttpOptions, SecurityMiddlewareConfig, SecurityState, create_app};
pub use crypto::{PasswordHashing, TokenIssuer};
pub use database::{DatabasePool, MemoryStore, Store, StoreError};
pub use models::{Badge, BadgeSet, Material, MaterialRequest, RequestStatus, User};
pub use reputation::{ReputationManager, ReputationThresholds};
pub use uploads::UploadStore;
