//! Dose statistics over partial-volume structure masks.
//!
//! Aggregates a dose distribution inside a [`PartialVolumeMask`] into scalar
//! statistics and, optionally, functional dose-volume measures (Dx, Vx,
//! MOHx, MOCx, MaxOHx, MinOCx) stored per requested parameter.
//!
//! # Architecture
//!
//! ```text
//! PartialVolumeMask + DoseSampler
//!      │
//!      ▼
//! DoseStatisticsCalculator::calculate(config)
//!      │
//!      ├─► scalar pass: fraction-weighted mean / stddev / volume,
//!      │                unweighted extrema with all tied positions
//!      │
//!      └─► complex pass (optional): one FunctionalMeasureStore per measure,
//!                                   keyed by absolute dose or volume
//!      │
//!      ▼
//! DoseStatistics (immutable; exact, nearest and relative queries)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dose_statistics::{evaluate_structure, DoseGrid, StatisticsConfig};
//! use voxelizer::VoxelizerConfig;
//!
//! let dose = DoseGrid::new(grid, values)?;
//! let (_, stats) = evaluate_structure(
//!     &structure,
//!     &dose,
//!     &VoxelizerConfig::default(),
//!     &StatisticsConfig::complex(),
//! )?;
//! println!("D95 = {:.2} Gy", stats.dx_relative(0.95)?);
//! ```
//!
//! [`PartialVolumeMask`]: voxelizer::PartialVolumeMask

pub mod calculator;
pub mod config;
pub mod measure;
pub mod pipeline;
pub mod sampler;
pub mod statistics;

pub use calculator::DoseStatisticsCalculator;
pub use config::{StatisticsConfig, Threshold};
pub use measure::{FunctionalMeasureStore, MeasureValue};
pub use pipeline::evaluate_structure;
pub use sampler::{DoseGrid, DoseSampler};
pub use statistics::{DoseStatistics, DoseStatisticsBuilder, Measure};
