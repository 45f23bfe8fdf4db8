//! Domain models and types for Quarry.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`CollectionId`], [`SubmissionId`], [`JobId`])
//! - **Domain models** ([`Collection`], [`Submission`], [`Attachment`])
//! - **Error types** ([`QuarryError`], [`SourceError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! ```rust
//! use quarry::domain::{CollectionId, SubmissionId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let collection_id = CollectionId::new("contact")?;
//! let sid = SubmissionId::new(42);
//! assert_eq!(sid.directory_name(), "submission-42");
//! # Ok(())
//! # }
//! ```
//!
//! # Builder Pattern
//!
//! ```rust
//! use quarry::domain::{CollectionId, SubmissionBuilder};
//! use chrono::Utc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let submission = SubmissionBuilder::new()
//!     .sid(1)
//!     .collection_id(CollectionId::new("contact")?)
//!     .created(Utc::now())
//!     .value("name", serde_json::json!("Ada"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod errors;
pub mod ids;
pub mod result;
pub mod submission;

pub use collection::{Collection, Element, ElementType, OptionItem, SubElement};
pub use errors::{QuarryError, SourceError};
pub use ids::{CollectionId, JobId, SubmissionId};
pub use result::Result;
pub use submission::{Attachment, Submission, SubmissionBuilder};
