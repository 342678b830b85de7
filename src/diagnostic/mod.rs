//! Diagnostic engine
//!
//! Runs `ping` and `traceroute` (or their Windows counterparts) as child
//! processes and streams their output as platform-independent events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DiagnosticRequest                         │
//! │  • target + count / maxHops                                  │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    command::build                            │
//! │  • Platform detection                                        │
//! │  • Native invocation with a pinned locale                    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    process::spawn                            │
//! │  • Line pumps for stdout / stderr                            │
//! │  • Supervision task, SIGTERM then force-kill                 │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Normalizer                                │
//! │  • Per-dialect recognizer tables                             │
//! │  • Hop tracking for traceroute                               │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StreamPublisher                           │
//! │  • Start → Output/Error* → Complete                          │
//! │  • Cancellation kills the process                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let (tx, mut rx) = mpsc::channel(100);
//! let cancel = CancellationToken::new();
//!
//! let run = DiagnosticRun::new(DiagnosticRequest::ping("example.com", Some(4)))
//!     .with_origin("Frankfurt");
//! tokio::spawn(run.execute(tx, cancel.clone()));
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{}", event.message());
//! }
//! ```

pub mod command;
pub mod normalize;
pub mod platform;
pub mod process;
pub mod publisher;
pub mod types;

pub use normalize::{normalize, Category, Normalizer};
pub use platform::{Platform, PlatformFamily};
pub use process::{ProcessExit, ProcessHandle};
pub use publisher::{DiagnosticRun, RunOutcome, StreamPublisher};
pub use types::{
    CommandSpec, DiagnosticEvent, DiagnosticRequest, ProbeParams, Tool, DEFAULT_MAX_HOPS,
    DEFAULT_PING_COUNT,
};
