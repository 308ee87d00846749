//! Clock-driven business simulation: activities, components, entities and the
//! time-based model that steps them.

pub mod activity;
pub mod clock;
pub mod component;
pub mod model;
pub mod time_interval;

pub use activity::{
    Activity, ActivitySchedule, ActivityState, AmountSource, BasicActivity, BasicLoanActivity,
    LoanAccounts,
};
pub use clock::Clock;
pub use component::{Component, ComponentChild, Entity};
pub use model::{EndCondition, RunSummary, TimeBasedModel};
pub use time_interval::{TimeInterval, TimeUnit};
