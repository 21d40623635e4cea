//! Core domain types: production series, anchor selection, decline curves.

mod anchor;
mod curve;
mod series;

pub use anchor::{AnchorKind, AnchorSelection};
pub use curve::{CurveField, CurveRecord, DeclineCurve, DeclineSegment, FitSummary};
pub use series::{
    months_between, parse_boundary_date, same_calendar_day, same_calendar_month, FluidType,
    ProductionSeries,
};
