//! Derived field registration and recomputation
//!
//! This module handles:
//! - Registration-time dependency checks (unknown inputs, cycles)
//! - Caching the topological order and the transitive dependents of every source
//! - Recomputing affected derived fields when an upstream value changes

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::schema::{FieldValue, RegistrationError, RegistrationResult, SchemaRegistry, ABSENT};
use crate::store::ValueStore;

/// Values handed to a compute function, in the declared input order.
pub struct Inputs<'a> {
    names: &'a [String],
    values: Vec<&'a FieldValue>,
}

impl<'a> Inputs<'a> {
    pub fn get(&self, name: &str) -> &'a FieldValue {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
            .unwrap_or(&ABSENT)
    }

    pub fn at(&self, index: usize) -> &'a FieldValue {
        self.values.get(index).copied().unwrap_or(&ABSENT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a FieldValue)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Pure computation over the current input values.
pub type ComputeFn = Arc<dyn Fn(&Inputs<'_>) -> FieldValue + Send + Sync>;

/// A named computation over fields or earlier derived fields.
#[derive(Clone)]
pub struct DerivedField {
    pub name: String,
    pub inputs: Vec<String>,
    compute: ComputeFn,
}

impl fmt::Debug for DerivedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedField")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .finish()
    }
}

impl DerivedField {
    pub fn new<F>(name: impl Into<String>, inputs: Vec<String>, compute: F) -> Self
    where
        F: Fn(&Inputs<'_>) -> FieldValue + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            inputs,
            compute: Arc::new(compute),
        }
    }

    pub fn compute(&self, inputs: &Inputs<'_>) -> FieldValue {
        (self.compute)(inputs)
    }
}

/// A recomputed derived value.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedUpdate {
    pub name: String,
    pub value: FieldValue,
}

#[derive(Debug, Default)]
pub struct DerivationGraph {
    nodes: IndexMap<String, DerivedField>,
    order: Vec<String>,
    dependents: HashMap<String, BTreeSet<String>>,
    values: HashMap<String, FieldValue>,
}

impl DerivationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a derived field.
    ///
    /// Every input must be a schema field or an already registered derived
    /// field. A registration that would introduce a cycle is rejected and the
    /// graph is left untouched.
    pub fn register(
        &mut self,
        field: DerivedField,
        schema: &SchemaRegistry,
    ) -> RegistrationResult<()> {
        if schema.contains(&field.name) {
            return Err(RegistrationError::NameConflict { name: field.name });
        }

        for input in &field.inputs {
            if *input == field.name {
                warn!("Rejected derived field '{}': depends on itself", field.name);
                return Err(RegistrationError::CyclicDependency {
                    name: field.name.clone(),
                    path: vec![field.name.clone(), field.name.clone()],
                });
            }
            if !schema.contains(input) && !self.nodes.contains_key(input) {
                warn!(
                    "Rejected derived field '{}': unknown input '{}'",
                    field.name, input
                );
                return Err(RegistrationError::UnknownDependency {
                    name: field.name.clone(),
                    input: input.clone(),
                });
            }
        }

        let mut candidate = self.nodes.clone();
        let name = field.name.clone();
        candidate.insert(name.clone(), field);

        let order = topological_order(&candidate).map_err(|path| {
            warn!("Rejected derived field '{}': cycle {:?}", name, path);
            RegistrationError::CyclicDependency {
                name: name.clone(),
                path,
            }
        })?;

        self.dependents = transitive_dependents(&candidate, &order);
        self.nodes = candidate;
        self.order = order;
        self.values.remove(&name);
        info!(
            "Registered derived field '{}' ({} derived fields total)",
            name,
            self.nodes.len()
        );
        Ok(())
    }

    /// Recompute every derived field affected by a change to `changed`.
    ///
    /// Results are staged and committed together, so no caller ever observes
    /// a half-updated graph.
    pub fn notify(&mut self, changed: &str, store: &ValueStore) -> Vec<DerivedUpdate> {
        let Some(affected) = self.dependents.get(changed) else {
            return Vec::new();
        };
        let targets: Vec<String> = self
            .order
            .iter()
            .filter(|name| affected.contains(*name))
            .cloned()
            .collect();
        debug!("Change to '{}' recomputes {:?}", changed, targets);
        self.recompute(&targets, store)
    }

    /// Recompute every derived field in dependency order.
    pub fn recompute_all(&mut self, store: &ValueStore) -> Vec<DerivedUpdate> {
        let targets = self.order.clone();
        self.recompute(&targets, store)
    }

    fn recompute(&mut self, targets: &[String], store: &ValueStore) -> Vec<DerivedUpdate> {
        let mut staged: HashMap<String, FieldValue> = HashMap::new();
        for name in targets {
            let Some(node) = self.nodes.get(name) else {
                continue;
            };
            let values: Vec<&FieldValue> = node
                .inputs
                .iter()
                .map(|input| {
                    if self.nodes.contains_key(input) {
                        staged
                            .get(input)
                            .or_else(|| self.values.get(input))
                            .unwrap_or(&ABSENT)
                    } else {
                        store.get(input)
                    }
                })
                .collect();
            let value = node.compute(&Inputs {
                names: &node.inputs,
                values,
            });
            staged.insert(name.clone(), value);
        }

        let updates = targets
            .iter()
            .filter_map(|name| {
                staged.get(name).map(|value| DerivedUpdate {
                    name: name.clone(),
                    value: value.clone(),
                })
            })
            .collect();
        self.values.extend(staged);
        updates
    }

    pub fn current_value(&self, name: &str) -> &FieldValue {
        self.values.get(name).unwrap_or(&ABSENT)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Cached evaluation order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Derived fields that transitively depend on `source`.
    pub fn dependents_of(&self, source: &str) -> Option<&BTreeSet<String>> {
        self.dependents.get(source)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget computed values; registrations are kept.
    pub fn clear_values(&mut self) {
        self.values.clear();
    }
}

/// Depth-first topological sort. On a cycle, returns the offending path.
fn topological_order(nodes: &IndexMap<String, DerivedField>) -> Result<Vec<String>, Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit(
        name: &str,
        nodes: &IndexMap<String, DerivedField>,
        marks: &mut HashMap<String, Mark>,
        stack: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<(), Vec<String>> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| n == name).unwrap_or(0);
                let mut path = stack[start..].to_vec();
                path.push(name.to_string());
                return Err(path);
            }
            None => {}
        }
        let Some(node) = nodes.get(name) else {
            // plain schema field
            return Ok(());
        };
        marks.insert(name.to_string(), Mark::Visiting);
        stack.push(name.to_string());
        for input in &node.inputs {
            visit(input, nodes, marks, stack, order)?;
        }
        stack.pop();
        marks.insert(name.to_string(), Mark::Done);
        order.push(name.to_string());
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut order = Vec::with_capacity(nodes.len());
    for name in nodes.keys() {
        let mut stack = Vec::new();
        visit(name, nodes, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

/// Map every source name to the set of derived fields that read it, directly or not.
fn transitive_dependents(
    nodes: &IndexMap<String, DerivedField>,
    order: &[String],
) -> HashMap<String, BTreeSet<String>> {
    let mut sources: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for name in order {
        let Some(node) = nodes.get(name) else {
            continue;
        };
        let mut own = BTreeSet::new();
        for input in &node.inputs {
            own.insert(input.clone());
            if let Some(upstream) = sources.get(input.as_str()) {
                own.extend(upstream.iter().cloned());
            }
        }
        sources.insert(name.as_str(), own);
    }

    let mut dependents: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (derived, upstream) in sources {
        for source in upstream {
            dependents
                .entry(source)
                .or_default()
                .insert(derived.to_string());
        }
    }
    dependents
}
