use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{clock::Clock, component::Entity};
use crate::errors::{ModelError, Result};

/// When a [`TimeBasedModel`] stops stepping the clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndCondition {
    /// Run periods `0..periods`.
    PeriodCount { periods: u32 },
    /// Run every period dated on or before `date`.
    EndDate { date: NaiveDate },
}

/// Outcome of [`TimeBasedModel::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub periods_run: u32,
    pub transactions_posted: usize,
    pub last_period: Option<NaiveDate>,
}

/// Top-level driver: steps a clock and runs each registered entity per period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeBasedModel {
    name: String,
    #[serde(default)]
    description: String,
    clock: Clock,
    end: EndCondition,
    #[serde(default)]
    entities: Vec<Entity>,
}

impl TimeBasedModel {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        clock: Clock,
        end: EndCondition,
    ) -> Result<Self> {
        let model = Self {
            name: name.into(),
            description: description.into(),
            clock,
            end,
            entities: Vec::new(),
        };
        model.validate_end()?;
        Ok(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn end(&self) -> EndCondition {
        self.end
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.name() == name)
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.name() == name)
    }

    /// Registers an entity; entities run in registration order.
    pub fn add_entity(&mut self, entity: Entity) -> Result<&mut Entity> {
        if self.entity(entity.name()).is_some() {
            return Err(ModelError::InvalidConfiguration(format!(
                "model `{}` already has an entity named `{}`",
                self.name,
                entity.name()
            )));
        }
        self.entities.push(entity);
        let idx = self.entities.len() - 1;
        Ok(&mut self.entities[idx])
    }

    /// Runs from the clock's current period until the end condition no longer
    /// holds. A model that has already reached its end posts nothing.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.validate_end()?;
        for entity in &mut self.entities {
            entity.prepare_to_run(&self.clock)?;
        }

        let mut summary = RunSummary {
            periods_run: 0,
            transactions_posted: 0,
            last_period: None,
        };
        while self.period_in_range() {
            let date = self.clock.get_date();
            for entity in &mut self.entities {
                summary.transactions_posted += entity.run(&self.clock)?;
            }
            debug!(
                model = %self.name,
                period = self.clock.period_ix(),
                %date,
                "period complete"
            );
            summary.periods_run += 1;
            summary.last_period = Some(date);
            self.clock.tick();
        }

        info!(
            model = %self.name,
            periods = summary.periods_run,
            transactions = summary.transactions_posted,
            "model run finished"
        );
        Ok(summary)
    }

    fn period_in_range(&self) -> bool {
        match self.end {
            EndCondition::PeriodCount { periods } => self.clock.period_ix() < periods,
            EndCondition::EndDate { date } => self.clock.get_date() <= date,
        }
    }

    fn validate_end(&self) -> Result<()> {
        match self.end {
            EndCondition::PeriodCount { periods: 0 } => Err(ModelError::InvalidConfiguration(
                "period count must be at least one".into(),
            )),
            EndCondition::EndDate { date } if date < self.clock.start() => {
                Err(ModelError::InvalidConfiguration(format!(
                    "end date {} is before clock start {}",
                    date,
                    self.clock.start()
                )))
            }
            EndCondition::EndDate { date } if !self.end_date_reachable(date) => {
                Err(ModelError::InvalidConfiguration(format!(
                    "end date {} lies beyond the last period clock `{}` can represent",
                    date,
                    self.clock.name()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Some period after `date` must exist, otherwise the run never stops.
    fn end_date_reachable(&self, date: NaiveDate) -> bool {
        match self.clock.last_period_on_or_before(date) {
            Some(last) if last < u32::MAX => self.clock.date_at(last + 1) > date,
            Some(_) => false,
            None => true,
        }
    }
}
