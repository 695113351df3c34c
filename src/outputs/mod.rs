//! File output for one-shot `digest` runs.
//!
//! - [`json`]: writes a [`FeedsResponse`](crate::models::FeedsResponse) under a dated directory
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── afternoon.json
//!     └── evening.json
//! ```

pub mod json;
