//! `pixelforge-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the job status machine, the generation record, validation
//! bounds and pagination math.

pub mod error;
pub mod id;
pub mod job;
pub mod model;
pub mod page;
pub mod validate;

pub use error::{DomainError, DomainResult};
pub use id::{GenerationId, JobId};
pub use job::{Generation, Job, JobStatus, StatusUpdate, WorkUnit};
pub use model::ImageModel;
pub use page::{Page, PageRequest};
