//! Organisational tree: entities own a general ledger and a tree of
//! components and activities that post into it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{activity::Activity, clock::Clock};
use crate::errors::{ModelError, Result};
use crate::ledger::{GeneralLedger, GeneralLedgerStructure};

/// A member of a component or entity, kept in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ComponentChild {
    Component(Component),
    Activity(Activity),
}

impl ComponentChild {
    pub fn name(&self) -> &str {
        match self {
            ComponentChild::Component(component) => component.name(),
            ComponentChild::Activity(activity) => activity.name(),
        }
    }

    fn prepare_to_run(&mut self, clock: &Clock) -> Result<()> {
        match self {
            ComponentChild::Component(component) => component.prepare_to_run(clock),
            ComponentChild::Activity(activity) => activity.prepare_to_run(clock),
        }
    }

    fn run(&self, clock: &Clock, gl: &mut GeneralLedger, parent_path: &str) -> Result<usize> {
        match self {
            ComponentChild::Component(component) => component.run(clock, gl, parent_path),
            ComponentChild::Activity(activity) => activity.run(clock, gl, parent_path),
        }
    }
}

/// Groups activities and sub-components, e.g. a department or a plant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Component {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    children: Vec<ComponentChild>,
}

impl Component {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn children(&self) -> &[ComponentChild] {
        &self.children
    }

    pub fn add_component(&mut self, component: Component) -> Result<&mut Component> {
        add_component_to(&mut self.children, &self.name, component)
    }

    pub fn add_activity(&mut self, activity: impl Into<Activity>) -> Result<()> {
        add_activity_to(&mut self.children, &self.name, activity.into())
    }

    pub fn prepare_to_run(&mut self, clock: &Clock) -> Result<()> {
        for child in &mut self.children {
            child.prepare_to_run(clock)?;
        }
        Ok(())
    }

    /// Runs children depth-first in insertion order.
    pub fn run(&self, clock: &Clock, gl: &mut GeneralLedger, parent_path: &str) -> Result<usize> {
        let path = format!("{}/{}", parent_path, self.name);
        run_children(&self.children, clock, gl, &path)
    }
}

/// A simulated business: owns its general ledger and organisational tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    name: String,
    #[serde(default)]
    description: String,
    gl: GeneralLedger,
    #[serde(default)]
    children: Vec<ComponentChild>,
}

impl Entity {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        structure: GeneralLedgerStructure,
    ) -> Self {
        let name = name.into();
        let gl = GeneralLedger::new(format!("{} GL", name), "", structure);
        Self {
            name,
            description: description.into(),
            gl,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn gl(&self) -> &GeneralLedger {
        &self.gl
    }

    pub fn structure(&self) -> &GeneralLedgerStructure {
        self.gl.structure()
    }

    pub fn structure_mut(&mut self) -> &mut GeneralLedgerStructure {
        self.gl.structure_mut()
    }

    pub fn children(&self) -> &[ComponentChild] {
        &self.children
    }

    pub fn add_component(&mut self, component: Component) -> Result<&mut Component> {
        add_component_to(&mut self.children, &self.name, component)
    }

    pub fn add_activity(&mut self, activity: impl Into<Activity>) -> Result<()> {
        add_activity_to(&mut self.children, &self.name, activity.into())
    }

    /// Finds a component by a slash-delimited path relative to the entity,
    /// e.g. `Sales/Retail`.
    pub fn component_mut(&mut self, path: &str) -> Result<&mut Component> {
        let mut segments = path.split('/').map(str::trim).filter(|s| !s.is_empty());
        let first = segments
            .next()
            .ok_or_else(|| ModelError::InvalidConfiguration("empty component path".into()))?;
        let mut current = find_component(&mut self.children, first)
            .ok_or_else(|| component_not_found(&self.name, path))?;
        for segment in segments {
            current = find_component(&mut current.children, segment)
                .ok_or_else(|| component_not_found(&self.name, path))?;
        }
        Ok(current)
    }

    pub fn get_balance(&self, account: &str, as_of: Option<NaiveDate>) -> Result<f64> {
        self.gl.get_balance(account, as_of)
    }

    pub fn prepare_to_run(&mut self, clock: &Clock) -> Result<()> {
        for child in &mut self.children {
            child.prepare_to_run(clock)?;
        }
        Ok(())
    }

    /// Runs every child for the clock's current period. Errors stop the walk
    /// immediately; postings made earlier in the period stay in the ledger.
    pub fn run(&mut self, clock: &Clock) -> Result<usize> {
        let posted = run_children(&self.children, clock, &mut self.gl, &self.name)?;
        tracing::debug!(
            entity = %self.name,
            period = clock.period_ix(),
            date = %clock.get_date(),
            posted,
            "entity period complete"
        );
        Ok(posted)
    }
}

fn run_children(
    children: &[ComponentChild],
    clock: &Clock,
    gl: &mut GeneralLedger,
    path: &str,
) -> Result<usize> {
    let mut posted = 0;
    for child in children {
        posted += child.run(clock, gl, path)?;
    }
    Ok(posted)
}

fn ensure_unique_name(children: &[ComponentChild], owner: &str, name: &str) -> Result<()> {
    if children.iter().any(|child| child.name() == name) {
        return Err(ModelError::InvalidConfiguration(format!(
            "`{}` already has a member named `{}`",
            owner, name
        )));
    }
    if name.contains('/') || name.trim().is_empty() {
        return Err(ModelError::InvalidConfiguration(format!(
            "invalid member name `{}`",
            name
        )));
    }
    Ok(())
}

fn add_component_to<'a>(
    children: &'a mut Vec<ComponentChild>,
    owner: &str,
    component: Component,
) -> Result<&'a mut Component> {
    ensure_unique_name(children, owner, component.name())?;
    children.push(ComponentChild::Component(component));
    match children.last_mut() {
        Some(ComponentChild::Component(added)) => Ok(added),
        _ => Err(ModelError::InvalidConfiguration(format!(
            "failed to add component to `{}`",
            owner
        ))),
    }
}

fn add_activity_to(children: &mut Vec<ComponentChild>, owner: &str, activity: Activity) -> Result<()> {
    ensure_unique_name(children, owner, activity.name())?;
    children.push(ComponentChild::Activity(activity));
    Ok(())
}

fn find_component<'a>(children: &'a mut [ComponentChild], name: &str) -> Option<&'a mut Component> {
    children.iter_mut().find_map(|child| match child {
        ComponentChild::Component(component) if component.name == name => Some(component),
        _ => None,
    })
}

fn component_not_found(entity: &str, path: &str) -> ModelError {
    ModelError::InvalidConfiguration(format!("component `{}` not found in `{}`", path, entity))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ledger::{AccountType, TransactionTemplate};
    use crate::simulation::activity::{ActivitySchedule, AmountSource, BasicActivity};
    use crate::simulation::time_interval::TimeInterval;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn structure() -> GeneralLedgerStructure {
        let mut structure = GeneralLedgerStructure::new("Chart", "");
        structure
            .add_account("Assets/Bank", "100", AccountType::Asset)
            .unwrap();
        structure
            .add_account("Revenue/Sales", "400", AccountType::Revenue)
            .unwrap();
        structure
            .add_account("Expenses/Wages", "600", AccountType::Expense)
            .unwrap();
        structure
    }

    fn activity(name: &str, dt: &str, cr: &str, amount: f64) -> BasicActivity {
        BasicActivity::new(
            name,
            "",
            ActivitySchedule::new(date(2024, 1, 1), date(2024, 12, 31), 1).unwrap(),
            Arc::new(TransactionTemplate::new(name, "", dt, cr)),
            AmountSource::fixed(amount),
        )
    }

    #[test]
    fn run_posts_in_construction_order() {
        let mut entity = Entity::new("Co", "", structure());
        entity
            .add_activity(activity("Wages", "Expenses/Wages", "Assets/Bank", 5.0))
            .unwrap();
        let sales = entity.add_component(Component::new("Sales", "")).unwrap();
        sales
            .add_activity(activity("Retail", "Assets/Bank", "Revenue/Sales", 20.0))
            .unwrap();
        sales
            .add_component(Component::new("Export", ""))
            .unwrap()
            .add_activity(activity("Overseas", "Assets/Bank", "Revenue/Sales", 30.0))
            .unwrap();
        entity
            .add_activity(activity("Bonus", "Expenses/Wages", "Assets/Bank", 1.0))
            .unwrap();

        let clock = Clock::new("c", date(2024, 1, 1), TimeInterval::monthly()).unwrap();
        entity.prepare_to_run(&clock).unwrap();
        assert_eq!(entity.run(&clock).unwrap(), 4);

        let sources: Vec<&str> = entity.gl().transactions().iter().map(|t| t.source()).collect();
        assert_eq!(
            sources,
            vec!["Co/Wages", "Co/Sales/Retail", "Co/Sales/Export/Overseas", "Co/Bonus"]
        );
        assert_eq!(entity.get_balance("Assets/Bank", None).unwrap(), 44.0);
    }

    #[test]
    fn duplicate_member_names_are_rejected() {
        let mut entity = Entity::new("Co", "", structure());
        entity.add_component(Component::new("Sales", "")).unwrap();
        assert!(matches!(
            entity.add_component(Component::new("Sales", "")),
            Err(ModelError::InvalidConfiguration(_))
        ));
        assert!(entity.add_component(Component::new("A/B", "")).is_err());
    }

    #[test]
    fn component_mut_walks_nested_paths() {
        let mut entity = Entity::new("Co", "", structure());
        entity
            .add_component(Component::new("Sales", ""))
            .unwrap()
            .add_component(Component::new("Retail", ""))
            .unwrap();
        let retail = entity.component_mut("Sales/Retail").unwrap();
        assert_eq!(retail.name(), "Retail");
        assert!(entity.component_mut("Sales/Wholesale").is_err());
    }

    #[test]
    fn run_stops_at_first_failure_without_rollback() {
        let mut entity = Entity::new("Co", "", structure());
        entity
            .add_activity(activity("Ok", "Assets/Bank", "Revenue/Sales", 5.0))
            .unwrap();
        entity
            .add_activity(activity("Broken", "Assets/Missing", "Revenue/Sales", 5.0))
            .unwrap();
        let clock = Clock::new("c", date(2024, 1, 1), TimeInterval::monthly()).unwrap();
        let err = entity.run(&clock).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTransaction(_)));
        assert_eq!(entity.gl().transaction_count(), 1);
    }
}
