mod compounding;
mod cost_basis;
mod error;
mod leveraged;
mod types;

pub use compounding::{aggregate, project_compounding, total_summary, yearly_summaries};
pub use cost_basis::{CostBasisLedger, accumulate_cost_basis, weighted_average_cost};
pub use error::{MAX_PROJECTION_MONTHS, ProjectionError};
pub use leveraged::project_leveraged_return;
pub use types::{
    AccountType, AggregatedProjection, CostLot, DividendPolicy, LeveragedMonth, LeveragedResult,
    LeveragedSimulationParameters, LotSnapshot, MonthlyRecord, OctoberSettlement, ProjectionView,
    SimulationParameters, TotalSummary, YearlySummary,
};
