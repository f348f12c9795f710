//! # modeler-apps
//!
//! Packaging, migration and deployment of app definitions for a BPMN/CMMN
//! modeling suite.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! service   → Transactional facade: export, import, publish
//!   ↓
//! deploy    → Deployable archive upload (multipart HTTP)
//!   ↓
//! archive   → App graph walk, portable/deployable export, portable import
//!   ↓
//! convert   → BPMN, CMMN, DMN and event-registry converters
//!   ↓
//! rewrite   → Id ↔ key reference rewriting, EditorJson typestate
//!   ↓
//! store     → ModelStore trait, in-memory store
//!   ↓
//! model     → Model records, app definition payload
//! ```

// ============================================================================
// MODULES (dependency order: model → store → rewrite → convert → archive → deploy → service)
// ============================================================================

/// Model records, relations, history and the app definition payload
pub mod model;

/// Model persistence: ModelStore trait and in-memory implementation
pub mod store;

/// Cross-model reference rewriting between id and key space
pub mod rewrite;

/// Native format converters: BPMN, CMMN, DMN, event registry
pub mod convert;

/// Portable and deployable app archives
pub mod archive;

/// Publishing deployable archives to a remote engine
pub mod deploy;

/// Transactional app definition operations
pub mod service;

/// Runtime configuration
pub mod config;

/// Errors surfaced by app definition operations
pub mod error;

// Re-export the public surface
pub use archive::{ExportArchiveBuilder, ImportArchivePipeline};
pub use config::{DeploymentConfig, ModelerConfig};
pub use convert::Converters;
pub use deploy::{DeploymentPublisher, DeploymentTransport, HttpDeploymentTransport};
pub use error::AppError;
pub use model::{AppDefinition, AppModelDefinition, Model, ModelRelation, ModelType, User};
pub use rewrite::{EditorJson, ReferenceKind, ReferenceRewriter};
pub use service::AppDefinitionService;
pub use store::{MemoryModelStore, ModelStore, StoreError};
