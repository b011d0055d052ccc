//! Stream-processing adapters over the model registry
//!
//! Two operators bind a query to a registered model: [`UpdateOperator`]
//! trains it from labeled events and [`PredictOperator`] appends a label and
//! confidence to each event. Both resolve their model once at init, keyed by
//! `<model.name>.<app name>`.

mod event;
mod params;
mod predict;
mod update;

pub use event::{
    Attribute, AttributeType, AttributeValue, QueryArgument, QueryContext, StreamDefinition,
    StreamEvent,
};
pub use params::AttributeRef;
pub use predict::{PredictOperator, CONFIDENCE_ATTRIBUTE, PREDICTION_ATTRIBUTE};
pub use update::{UpdateOperator, LOSS_ATTRIBUTE};
