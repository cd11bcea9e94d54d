//! Operation registry
//!
//! Maps operation names to their static description: how many operands a
//! call takes, which named parameters it accepts, resource defaults, and the
//! functions that validate a call and compute its result type.
//!
//! The set of kinds is closed ([`OpKind`]) except for `Custom`, which callers
//! add with [`OperationRegistry::register`].

use crate::error::{CoreError, Result};
use crate::ir::{ErrorCorrection, OpKind};
use crate::types::{Literal, ValueType};
use std::collections::BTreeMap;

/// Attribute parameters every operation accepts
pub const COMMON_PARAMS: [&str; 5] = ["coherence", "thermal", "correction", "level", "code"];

/// How a named parameter is lowered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamRole {
    /// Becomes an input edge, appended after the positional operands
    Operand,
    /// Stays on the node as a literal
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub role: ParamRole,
    pub required: bool,
}

impl ParamSpec {
    pub fn operand(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: ParamRole::Operand,
            required: true,
        }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: ParamRole::Attribute,
            required: false,
        }
    }
}

/// Checks the literal attribute parameters of a call
pub type ValidateFn = fn(&BTreeMap<String, Literal>) -> std::result::Result<(), String>;

/// Computes the result type from the operand types
pub type ResultTypeFn = fn(&[ValueType]) -> std::result::Result<ValueType, String>;

/// Static description of one operation kind
#[derive(Debug, Clone)]
pub struct OpSpec {
    pub kind: OpKind,
    pub min_operands: usize,
    pub max_operands: usize,
    pub params: Vec<ParamSpec>,
    /// Never decomposed by the thermal pass
    pub atomic: bool,
    /// May appear as a bare statement
    pub side_effecting: bool,
    /// Inserted by passes only, not callable from source
    pub internal: bool,
    pub thermal_load: f64,
    pub coherence_cost: f64,
    pub default_correction: Option<ErrorCorrection>,
    pub validate: ValidateFn,
    pub result_type: ResultTypeFn,
}

impl OpSpec {
    /// Spec with defaults: one operand, same-typed result, unit costs
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            min_operands: 1,
            max_operands: 1,
            params: Vec::new(),
            atomic: false,
            side_effecting: false,
            internal: false,
            thermal_load: 1.0,
            coherence_cost: 1.0,
            default_correction: None,
            validate: accept_params,
            result_type: same_as_first,
        }
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn with_operands(mut self, min: usize, max: usize) -> Self {
        self.min_operands = min;
        self.max_operands = max.max(min);
        self
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_costs(mut self, thermal_load: f64, coherence_cost: f64) -> Self {
        self.thermal_load = thermal_load;
        self.coherence_cost = coherence_cost;
        self
    }

    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    pub fn side_effecting(mut self) -> Self {
        self.side_effecting = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn with_default_correction(mut self, correction: ErrorCorrection) -> Self {
        self.default_correction = Some(correction);
        self
    }

    pub fn with_validate(mut self, validate: ValidateFn) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_result_type(mut self, result_type: ResultTypeFn) -> Self {
        self.result_type = result_type;
        self
    }

    /// Named parameter spec, including the common attribute parameters
    pub fn param(&self, name: &str) -> Option<ParamSpec> {
        if let Some(spec) = self.params.iter().find(|p| p.name == name) {
            return Some(spec.clone());
        }
        COMMON_PARAMS
            .contains(&name)
            .then(|| ParamSpec::attribute(name))
    }

    /// Named operand parameters in declaration order
    pub fn operand_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.role == ParamRole::Operand)
    }

    pub fn accepts_operands(&self, count: usize) -> bool {
        (self.min_operands..=self.max_operands).contains(&count)
    }

    /// Validate attribute literals: the common parameters first, then the kind's own check
    pub fn check_params(&self, params: &BTreeMap<String, Literal>) -> std::result::Result<(), String> {
        check_common_params(params)?;
        (self.validate)(params)
    }

    pub fn result_type(&self, operands: &[ValueType]) -> std::result::Result<ValueType, String> {
        (self.result_type)(operands)
    }
}

/// Registry of known operation kinds
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    specs: BTreeMap<String, OpSpec>,
}

impl OperationRegistry {
    /// Empty registry with no kinds at all
    pub fn empty() -> Self {
        Self {
            specs: BTreeMap::new(),
        }
    }

    /// Register a kind; names must be unique
    pub fn register(&mut self, spec: OpSpec) -> Result<()> {
        let name = spec.name().to_string();
        if self.specs.contains_key(&name) {
            return Err(CoreError::DuplicateOperation(name));
        }
        log::debug!("Registered operation '{}'", name);
        self.specs.insert(name, spec);
        Ok(())
    }

    /// Builder-style [`OperationRegistry::register`]
    pub fn with(mut self, spec: OpSpec) -> Result<Self> {
        self.register(spec)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&OpSpec> {
        self.specs.get(name)
    }

    /// Spec for an operation kind, by its name
    pub fn spec_of(&self, kind: &OpKind) -> Option<&OpSpec> {
        self.specs.get(kind.name())
    }

    /// Spec callable from source text
    pub fn callable(&self, name: &str) -> Option<&OpSpec> {
        self.get(name).filter(|spec| !spec.internal)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn insert_builtin(&mut self, spec: OpSpec) {
        self.specs.insert(spec.name().to_string(), spec);
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.insert_builtin(
            OpSpec::new(OpKind::Interfere)
                .with_operands(2, 8)
                .with_costs(2.0, 1.5)
                .with_result_type(elementwise),
        );
        registry.insert_builtin(
            OpSpec::new(OpKind::Merge)
                .with_operands(2, 8)
                .with_costs(1.5, 1.0)
                .with_result_type(elementwise),
        );
        registry.insert_builtin(OpSpec::new(OpKind::Split).with_costs(1.0, 0.5));
        registry.insert_builtin(
            OpSpec::new(OpKind::PhaseShift)
                .with_param(ParamSpec::operand("phase"))
                .with_costs(0.5, 0.5)
                .with_result_type(phase_shifted),
        );
        registry.insert_builtin(
            OpSpec::new(OpKind::Fourier)
                .with_costs(4.0, 2.0)
                .with_result_type(non_scalar),
        );
        registry.insert_builtin(OpSpec::new(OpKind::Measure).atomic().with_costs(3.0, 1.0));
        registry.insert_builtin(
            OpSpec::new(OpKind::Correct)
                .atomic()
                .side_effecting()
                .with_costs(2.5, 0.5)
                .with_default_correction(ErrorCorrection::fault_tolerant(1)),
        );
        registry.insert_builtin(
            OpSpec::new(OpKind::Encode {
                code: String::new(),
                distance: 0,
            })
            .internal()
            .atomic()
            .with_operands(0, usize::MAX)
            .with_costs(1.0, 0.5)
            .with_result_type(elementwise),
        );
        registry.insert_builtin(
            OpSpec::new(OpKind::Decode {
                code: String::new(),
                distance: 0,
            })
            .internal()
            .atomic()
            .with_costs(1.0, 0.5),
        );
        registry.insert_builtin(
            OpSpec::new(OpKind::Join)
                .internal()
                .atomic()
                .with_operands(1, usize::MAX)
                .with_costs(0.5, 0.0)
                .with_result_type(elementwise),
        );
        registry
    }
}

// ----- validation and result-type functions -----

/// Accepts any attribute parameters
pub fn accept_params(_params: &BTreeMap<String, Literal>) -> std::result::Result<(), String> {
    Ok(())
}

/// Checks the attribute parameters shared by every operation
pub fn check_common_params(params: &BTreeMap<String, Literal>) -> std::result::Result<(), String> {
    for key in ["coherence", "thermal"] {
        if let Some(value) = params.get(key) {
            match value.as_number() {
                Some(n) if n.is_finite() && n >= 0.0 => {}
                _ => return Err(format!("'{key}' must be a non-negative number, got {value}")),
            }
        }
    }
    if let Some(value) = params.get("level") {
        if value.as_positive_integer().is_none() {
            return Err(format!("'level' must be a positive integer, got {value}"));
        }
    }
    if let Some(value) = params.get("code") {
        if value.as_text().is_none() {
            return Err(format!("'code' must be text, got {value}"));
        }
    }
    let correction = match params.get("correction") {
        Some(value) => Some(
            value
                .as_text()
                .ok_or_else(|| format!("'correction' must be text, got {value}"))?,
        ),
        None => None,
    };
    if let Some(name) = correction {
        let level = params.get("level").and_then(Literal::as_positive_integer);
        let code = params.get("code").and_then(Literal::as_text);
        ErrorCorrection::from_parts(name, level, code).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Result has the type of the first operand
pub fn same_as_first(operands: &[ValueType]) -> std::result::Result<ValueType, String> {
    operands
        .first()
        .cloned()
        .ok_or_else(|| "operation needs at least one operand".to_string())
}

/// Element-wise combination; scalars broadcast, other operands must agree
pub fn elementwise(operands: &[ValueType]) -> std::result::Result<ValueType, String> {
    let mut result: Option<&ValueType> = None;
    for ty in operands.iter().filter(|t| !t.is_scalar()) {
        match result {
            None => result = Some(ty),
            Some(expected) if expected == ty => {}
            Some(expected) => {
                return Err(format!("operand types {expected} and {ty} do not match"));
            }
        }
    }
    Ok(result.cloned().unwrap_or_else(ValueType::scalar))
}

fn phase_shifted(operands: &[ValueType]) -> std::result::Result<ValueType, String> {
    match operands {
        [value, phase] if phase.is_scalar() => Ok(value.clone()),
        [_, phase] => Err(format!("phase must be a scalar, got {phase}")),
        _ => Err(format!("phase_shift takes a value and a phase, got {} operand(s)", operands.len())),
    }
}

fn non_scalar(operands: &[ValueType]) -> std::result::Result<ValueType, String> {
    let ty = same_as_first(operands)?;
    if ty.is_scalar() {
        return Err("cannot transform a scalar".to_string());
    }
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Literal)]) -> BTreeMap<String, Literal> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_default_registry_contents() {
        let registry = OperationRegistry::default();
        assert!(registry.callable("interfere").is_some());
        assert!(registry.callable("encode").is_none());
        assert!(registry.get("encode").is_some());

        let correct = registry.get("correct").unwrap();
        assert!(correct.side_effecting);
        assert!(correct.atomic);
        assert_eq!(
            correct.default_correction,
            Some(ErrorCorrection::fault_tolerant(1))
        );

        assert!(registry.get("interfere").unwrap().accepts_operands(2));
        assert!(!registry.get("interfere").unwrap().accepts_operands(1));
    }

    #[test]
    fn test_spec_of_ignores_payload() {
        let registry = OperationRegistry::default();
        let kind = OpKind::Decode {
            code: "surface".into(),
            distance: 5,
        };
        assert!(registry.spec_of(&kind).unwrap().internal);
    }

    #[test]
    fn test_register_custom_rejects_duplicates() {
        let mut registry = OperationRegistry::default();
        registry
            .register(OpSpec::new(OpKind::Custom("teleport".into())).atomic())
            .unwrap();
        assert!(registry.callable("teleport").unwrap().atomic);

        let err = registry
            .register(OpSpec::new(OpKind::Custom("teleport".into())))
            .unwrap_err();
        assert_eq!(err, CoreError::DuplicateOperation("teleport".into()));
    }

    #[test]
    fn test_common_params_accepted_everywhere() {
        let registry = OperationRegistry::default();
        let split = registry.get("split").unwrap();
        assert_eq!(split.param("thermal").unwrap().role, ParamRole::Attribute);
        assert!(split.param("phase").is_none());

        let shift = registry.get("phase_shift").unwrap();
        assert_eq!(shift.param("phase").unwrap().role, ParamRole::Operand);
    }

    #[test]
    fn test_check_params() {
        let spec = OperationRegistry::default().get("merge").unwrap().clone();
        assert!(spec
            .check_params(&params(&[
                ("correction", Literal::Text("fault_tolerant".into())),
                ("level", Literal::Number(2.0)),
                ("code", Literal::Text("steane".into())),
            ]))
            .is_ok());
        assert!(spec
            .check_params(&params(&[("coherence", Literal::Number(-1.0))]))
            .is_err());
        assert!(spec
            .check_params(&params(&[("level", Literal::Number(1.5))]))
            .is_err());
        assert!(spec
            .check_params(&params(&[("correction", Literal::Text("maximal".into()))]))
            .is_err());
    }

    #[test]
    fn test_elementwise_broadcasts_scalars() {
        let wave = ValueType::wave(8);
        assert_eq!(
            elementwise(&[wave.clone(), ValueType::scalar()]).unwrap(),
            wave
        );
        assert_eq!(
            elementwise(&[ValueType::scalar(), ValueType::scalar()]).unwrap(),
            ValueType::scalar()
        );
        assert!(elementwise(&[wave, ValueType::wave(4)]).is_err());
    }

    #[test]
    fn test_phase_shift_requires_scalar_phase() {
        let registry = OperationRegistry::default();
        let shift = registry.get("phase_shift").unwrap();
        assert!(shift
            .result_type(&[ValueType::wave(4), ValueType::scalar()])
            .is_ok());
        assert!(shift
            .result_type(&[ValueType::wave(4), ValueType::wave(4)])
            .is_err());
    }
}
