//! Repository checkout, shrinkwrap builds, and build-context packaging.
//!
//! # Pipeline stages owned by this crate
//!
//! ```text
//! push event
//!   1. Workspace ── WorkspaceAllocator::allocate() → <root>/<repo>-<sha>-<pid>-<n>
//!   2. Fetch     ── git clone <clone_url> && git checkout <sha>
//!   3. Build     ── faas-cli build -f stack.yml --shrinkwrap → build/<fn>/
//!   4. Package   ── <fn>.tar per function, tagged <registry>/<image>:<tag>-<sha>
//! ```
//!
//! # Archive layout
//!
//! ```text
//! config          {"ref": "<image reference>"}
//! context/        contents of build/<fn>/, minus the transient context.tar
//! ```

pub mod fetch;
pub mod package;
pub mod runner;
pub mod shrinkwrap;
pub mod workspace;

pub use fetch::{FetchError, Fetcher};
pub use package::{PackageError, Packager, TarEntry, format_image_sha_tag};
pub use runner::{CommandRunner, RealRunner, RunnerError};
pub use shrinkwrap::{BuildError, BuildOrchestrator, context_dir};
pub use workspace::WorkspaceAllocator;
