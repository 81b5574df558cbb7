//! Data layer: parsing, classification, and table emission.
//!
//! Architecture:
//! ```text
//!  albumData / trackData      artistData / genreData      trainItem / testItem
//!        │                           │                            │
//!        ▼                           ▼                            ▼
//!   ┌────────────────┐        ┌────────────┐              ┌──────────┐
//!   │ variable_width │        │  datasets  │  id lists    │ grouped  │ header+items
//!   └────────────────┘        └────────────┘              └──────────┘
//!        │                           │                            │
//!        │          ┌────────────────┴───────┐                    │
//!        └─────────▶│ classify (training)    │◀───────────────────┘
//!                   └────────────────────────┘
//!                              │
//!                              ▼
//!                        ┌──────────┐
//!                        │   emit   │  Table → csv / json / parquet
//!                        └──────────┘
//! ```
//!
//! `loader` reads emitted tables back; `compare` and `aggregate` work on them.

pub mod aggregate;
pub mod classify;
pub mod compare;
pub mod datasets;
pub mod emit;
pub mod grouped;
pub mod lines;
pub mod loader;
pub mod model;
pub mod scalar;
pub mod variable_width;
