//! Flight styling and row annotation rules.

pub mod context;
pub mod engine;
pub mod flight;
pub mod row;

pub use context::{Invalidate, RuleContext};
pub use engine::{
    FlightRule, FlightStyle, RowCanvas, RowRegion, RowRule, Rule, RuleEngine, RuleError,
    RuleRegistry,
};
pub use flight::{flight_key, CrewAdequacyRule, CrewStatusMap};
pub use row::{LongDutyRule, MetricsTable, OffDayEntitlementRule};

/// The bundled rules, in evaluation order.
pub fn default_registry(
    statuses: CrewStatusMap,
    metrics: MetricsTable,
    long_duty_hours: f64,
) -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry
        .register_flight(CrewAdequacyRule::new(statuses))
        .register_row(OffDayEntitlementRule::new(metrics))
        .register_row(LongDutyRule::new(long_duty_hours));
    registry
}
