pub mod constants;
mod days;
mod engine;
mod error;
mod fit;
mod model;
mod numeric;
mod position;
mod series;
mod snapshot;
mod types;
mod validation;

pub use days::{date_at_day, days_at_year_start, days_since_genesis, days_since_genesis_at};
pub use engine::{
    DrawdownSummary, run_accumulation, run_drawdown, simulate_accumulation, simulate_drawdown,
};
pub use error::{EngineError, FieldErrors, SIMULATION_ERROR_KEY, ValidationError};
pub use fit::r_squared;
pub use model::{ModelOutput, PriceModel, PriceProjector, median_price, model_output, support_price};
pub use numeric::format_percentage;
pub use position::{
    PositionMetric, PositionZone, assess_position, position_color, position_label,
    relative_position, support_deviation,
};
pub use series::{ModelSeriesPoint, SeriesCache, build_model_series, midnight_utc, series_horizon};
pub use snapshot::{MarketSnapshot, SnapshotOutcome, change_since_previous_close, market_snapshot};
pub use types::{
    AccumulationForm, AccumulationInputs, AccumulationRow, InitialHolding, InitialHoldingKind,
    PhaseLabel, PricePoint, SecondPhase, SimulationOutcome, WithdrawalForm, WithdrawalInputs,
    WithdrawalMode, WithdrawalPlan, WithdrawalRow,
};
pub use validation::{validate_accumulation, validate_withdrawal};
