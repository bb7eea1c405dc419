//! # geocell-types
//!
//! Core value types shared by the geocell covering-index engine:
//!
//! - **Bounding boxes**: `BoundingBox`, a longitude/latitude rectangle
//! - **Features**: `FeatureId`, `FeatureRecord`
//! - **Strategy selection**: `StrategyKind`, `LevelPolicy`
//!
//! All types are serializable with Serde and convert to and from the `geo`
//! crate's primitives.
//!
//! ## Examples
//!
//! ```rust
//! use geocell_types::bbox::BoundingBox;
//! use geocell_types::config::StrategyKind;
//!
//! let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
//! let b = BoundingBox::new(5.0, 5.0, 6.0, 6.0);
//! assert!(!a.intersects(&b));
//! assert!(StrategyKind::S2.resolutions().contains(&15));
//! ```

pub mod bbox;
pub mod config;
pub mod feature;
