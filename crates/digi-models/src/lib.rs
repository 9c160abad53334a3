//! Shared data models for the Digi recruitment backend.
//!
//! This crate provides Serde-serializable types for:
//! - Applicant form fields and the three wizard steps
//! - Per-step validation rules
//! - Drafts, submitted applications and the lifecycle phase
//! - Session state driven by identity events
//! - Upload rules for CVs and profile photos
//! - Password strength rules

pub mod application;
pub mod fields;
pub mod password;
pub mod session;
pub mod step;
pub mod upload;
pub mod validation;

// Re-export common types
pub use application::{Application, ApplicationPhase, Draft, DraftPatch};
pub use fields::{ApplicantFields, Field};
pub use password::{check_password_strength, PasswordStrength};
pub use session::{AuthEvent, SessionState, SessionUser};
pub use step::FormStep;
pub use upload::{file_extension, UploadKind, UploadRejection};
pub use validation::{validate_step, StepValidation};
