//! Data-access and cleaning layer behind the food explorer dashboard.
//!
//! [`FoodApi`] loads a raw food table, cleans it once, and answers read-only
//! queries (projections, name and ingredient lookups, flow counts). The
//! [`views`] module shapes query results for the dashboard's charts.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod views;

pub use api::{Dataset, FoodApi};
pub use config::{DuplicateNamePolicy, LoadOptions, MissingPolicy};
pub use data::model::{FlowCount, Frame, IngredientSet, Value};
pub use error::{DatasetError, Result};
