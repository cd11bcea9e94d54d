//! Name and operation validation
//!
//! Runs over a syntactically valid [`Program`] and checks everything that
//! needs the operation registry or the full set of names: duplicate names,
//! undeclared identifiers, unknown operations and parameters, operand arity
//! and attribute literals.

use crate::error::ParseError;
use crate::parser::COHERENCE_BLOCK;
use qwave_core::ast::{Argument, ArgumentValue, Direction, OperationCall, Program, Statement};
use qwave_core::registry::{check_common_params, ParamRole, COMMON_PARAMS};
use qwave_core::{Literal, OpSpec, OperationRegistry};
use std::collections::{BTreeMap, HashSet};

pub struct Validator<'r> {
    registry: &'r OperationRegistry,
}

/// Names visible to statements
struct Scope {
    inputs: HashSet<String>,
    known: HashSet<String>,
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r OperationRegistry) -> Self {
        Self { registry }
    }

    /// Every problem found, in source order
    pub fn validate(&self, program: &Program) -> Vec<ParseError> {
        let mut errors = Vec::new();
        let scope = self.collect_names(program, &mut errors);
        let mut defaults = Vec::new();
        for statement in &program.statements {
            self.check_statement(statement, &scope, &mut defaults, &mut errors);
        }
        errors
    }

    fn collect_names(&self, program: &Program, errors: &mut Vec<ParseError>) -> Scope {
        let mut scope = Scope {
            inputs: HashSet::new(),
            known: HashSet::new(),
        };
        let mut outputs = HashSet::new();
        for declaration in &program.declarations {
            if !scope.known.insert(declaration.name.clone()) {
                errors.push(ParseError::DuplicateName {
                    name: declaration.name.clone(),
                    span: declaration.span,
                });
                continue;
            }
            match declaration.direction {
                Direction::Input => scope.inputs.insert(declaration.name.clone()),
                Direction::Output => outputs.insert(declaration.name.clone()),
            };
        }

        let mut assigned = HashSet::new();
        let mut pending: Vec<&Statement> = program.statements.iter().collect();
        pending.reverse();
        while let Some(statement) = pending.pop() {
            match statement {
                Statement::Assignment(assignment) => {
                    let target = &assignment.target;
                    if scope.inputs.contains(target) {
                        errors.push(ParseError::AssignToInput {
                            name: target.clone(),
                            span: assignment.span,
                        });
                    } else if !assigned.insert(target.clone())
                        || (!outputs.contains(target) && !scope.known.insert(target.clone()))
                    {
                        errors.push(ParseError::DuplicateName {
                            name: target.clone(),
                            span: assignment.span,
                        });
                    }
                }
                Statement::Block(block) => pending.extend(block.statements.iter().rev()),
                Statement::Call(_) => {}
            }
        }
        scope
    }

    fn check_statement(
        &self,
        statement: &Statement,
        scope: &Scope,
        defaults: &mut Vec<BTreeMap<String, Literal>>,
        errors: &mut Vec<ParseError>,
    ) {
        match statement {
            Statement::Assignment(assignment) => {
                self.check_call(&assignment.call, true, scope, defaults, errors)
            }
            Statement::Call(call) => self.check_call(call, false, scope, defaults, errors),
            Statement::Block(block) => {
                let mut params = BTreeMap::new();
                for parameter in &block.parameters {
                    if let Some(value) = block_parameter(parameter, errors) {
                        if let Some(name) = &parameter.name {
                            params.insert(name.clone(), value);
                        }
                    }
                }
                let mut effective = defaults.last().cloned().unwrap_or_default();
                effective.extend(params);
                if let Err(message) = check_common_params(&effective) {
                    errors.push(ParseError::InvalidArgument {
                        operation: COHERENCE_BLOCK.to_string(),
                        message,
                        span: block.span,
                    });
                }
                defaults.push(effective);
                for inner in &block.statements {
                    self.check_statement(inner, scope, defaults, errors);
                }
                defaults.pop();
            }
        }
    }

    fn check_call(
        &self,
        call: &OperationCall,
        bound: bool,
        scope: &Scope,
        defaults: &[BTreeMap<String, Literal>],
        errors: &mut Vec<ParseError>,
    ) {
        let Some(spec) = self.registry.callable(&call.operation) else {
            errors.push(ParseError::UnknownOperation {
                name: call.operation.clone(),
                span: call.span,
            });
            // Arguments can still reference undeclared names
            for argument in &call.arguments {
                check_reference(argument, scope, errors);
            }
            return;
        };

        let mut attributes = defaults.last().cloned().unwrap_or_default();
        let mut seen = HashSet::new();
        for argument in &call.arguments {
            let Some(name) = &argument.name else {
                if let ArgumentValue::Literal(Literal::Text(_)) = argument.value {
                    errors.push(invalid(
                        call,
                        argument,
                        "text literals are only allowed on attribute parameters",
                    ));
                }
                check_reference(argument, scope, errors);
                continue;
            };
            if !seen.insert(name.as_str()) {
                errors.push(ParseError::DuplicateParameter {
                    parameter: name.clone(),
                    span: argument.span,
                });
                continue;
            }
            let Some(param) = spec.param(name) else {
                errors.push(ParseError::UnknownParameter {
                    operation: call.operation.clone(),
                    parameter: name.clone(),
                    span: argument.span,
                });
                continue;
            };
            match (param.role, &argument.value) {
                (ParamRole::Attribute, ArgumentValue::Literal(value)) => {
                    attributes.insert(name.clone(), value.clone());
                }
                (ParamRole::Attribute, ArgumentValue::Identifier(_)) => {
                    errors.push(invalid(
                        call,
                        argument,
                        &format!("parameter '{name}' takes a literal"),
                    ));
                }
                (ParamRole::Operand, ArgumentValue::Literal(Literal::Text(_))) => {
                    errors.push(invalid(
                        call,
                        argument,
                        &format!("parameter '{name}' takes a value, not text"),
                    ));
                }
                (ParamRole::Operand, _) => check_reference(argument, scope, errors),
            }
        }

        let positional = call.positional_count();
        if !spec.accepts_operands(positional) {
            errors.push(ParseError::Arity {
                operation: call.operation.clone(),
                expected: describe_arity(spec),
                actual: positional,
                span: call.span,
            });
        }
        for param in spec.operand_params().filter(|p| p.required) {
            if call.parameter(&param.name).is_none() {
                errors.push(ParseError::InvalidArgument {
                    operation: call.operation.clone(),
                    message: format!("missing parameter '{}'", param.name),
                    span: call.span,
                });
            }
        }
        if let Err(message) = spec.check_params(&attributes) {
            errors.push(ParseError::InvalidArgument {
                operation: call.operation.clone(),
                message,
                span: call.span,
            });
        }
        if !bound && !spec.side_effecting {
            errors.push(ParseError::DiscardedResult {
                operation: call.operation.clone(),
                span: call.span,
            });
        }
    }
}

fn check_reference(argument: &Argument, scope: &Scope, errors: &mut Vec<ParseError>) {
    if let Some(name) = argument.identifier_name() {
        if !scope.known.contains(name) {
            errors.push(ParseError::UndeclaredIdentifier {
                name: name.to_string(),
                span: argument.span,
            });
        }
    }
}

/// Literal value of a block parameter, if it is a named common attribute
fn block_parameter(parameter: &Argument, errors: &mut Vec<ParseError>) -> Option<Literal> {
    let Some(name) = &parameter.name else {
        errors.push(ParseError::InvalidArgument {
            operation: COHERENCE_BLOCK.to_string(),
            message: "block parameters must be named".to_string(),
            span: parameter.span,
        });
        return None;
    };
    if !COMMON_PARAMS.contains(&name.as_str()) {
        errors.push(ParseError::UnknownParameter {
            operation: COHERENCE_BLOCK.to_string(),
            parameter: name.clone(),
            span: parameter.span,
        });
        return None;
    }
    match &parameter.value {
        ArgumentValue::Literal(value) => Some(value.clone()),
        ArgumentValue::Identifier(_) => {
            errors.push(ParseError::InvalidArgument {
                operation: COHERENCE_BLOCK.to_string(),
                message: format!("parameter '{name}' takes a literal"),
                span: parameter.span,
            });
            None
        }
    }
}

fn invalid(call: &OperationCall, argument: &Argument, message: &str) -> ParseError {
    ParseError::InvalidArgument {
        operation: call.operation.clone(),
        message: message.to_string(),
        span: argument.span,
    }
}

fn describe_arity(spec: &OpSpec) -> String {
    match (spec.min_operands, spec.max_operands) {
        (min, max) if min == max => min.to_string(),
        (min, usize::MAX) => format!("at least {min}"),
        (min, max) => format!("{min} to {max}"),
    }
}
