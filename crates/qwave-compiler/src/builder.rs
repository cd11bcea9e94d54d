//! IR builder
//!
//! Lowers a [`Program`] into an [`IrGraph`] in a single walk:
//! - one Input node per input declaration, in declaration order
//! - one Operation node per call, in statement order
//! - numeric literal operands hoisted into Constant nodes, shared by value and type
//!
//! Outputs are designations on the node assigned to the output name, not
//! separate nodes. A bare side-effecting call rebinds its first operand's
//! name (and any output designated through it) to the call's node.

use crate::error::CompileError;
use qwave_core::ast::{Argument, ArgumentValue, Declaration, OperationCall, Program, Statement};
use qwave_core::{
    Diagnostic, DiagnosticKind, Diagnostics, IrGraph, Literal, NodeId, OpSpec, OperationRegistry,
    ParamRole, Stage, StageFailed, ValueType,
};
use std::collections::{BTreeMap, HashMap, HashSet};

pub struct IrBuilder<'r> {
    registry: &'r OperationRegistry,
    graph: IrGraph,
    bindings: HashMap<String, NodeId>,
    constants: HashMap<(u64, ValueType), NodeId>,
    /// Names whose producing statement failed; uses are not reported again
    poisoned: HashSet<String>,
    /// Attribute defaults of the enclosing blocks, innermost last
    defaults: Vec<BTreeMap<String, Literal>>,
    errors: Vec<CompileError>,
}

impl<'r> IrBuilder<'r> {
    pub fn new(registry: &'r OperationRegistry) -> Self {
        Self {
            registry,
            graph: IrGraph::new("program"),
            bindings: HashMap::new(),
            constants: HashMap::new(),
            poisoned: HashSet::new(),
            defaults: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Name the resulting graph
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.graph.name = name.into();
        self
    }

    /// Build the graph for `program`, pushing problems to `diagnostics`
    pub fn build(
        mut self,
        program: &Program,
        diagnostics: &mut Diagnostics,
    ) -> Result<IrGraph, StageFailed> {
        for declaration in program.inputs() {
            let id = self
                .graph
                .add_input(declaration.name.clone(), declaration.ty.clone());
            self.bindings.insert(declaration.name.clone(), id);
        }
        let outputs: Vec<&Declaration> = program.outputs().collect();

        for statement in &program.statements {
            self.lower_statement(statement, &outputs);
        }

        for output in &outputs {
            if self.graph.output(&output.name).is_none() && !self.poisoned.contains(&output.name) {
                self.errors.push(CompileError::DanglingOutput {
                    name: output.name.clone(),
                    span: output.span,
                });
            }
        }

        diagnostics.extend(self.errors.iter().map(|e| e.to_diagnostic(Stage::Build)));
        diagnostics.check(Stage::Build)?;

        report_unused(&self.graph, diagnostics);
        tracing::debug!(
            "Built graph '{}': {} nodes, {} edges",
            self.graph.name,
            self.graph.node_count(),
            self.graph.edge_count()
        );
        Ok(self.graph)
    }

    fn lower_statement(&mut self, statement: &Statement, outputs: &[&Declaration]) {
        match statement {
            Statement::Assignment(assignment) => {
                let target = &assignment.target;
                match self.lower_call(&assignment.call) {
                    Ok(Some(id)) => {
                        if let Some(node) = self.graph.node_mut(id) {
                            node.name = Some(target.clone());
                        }
                        self.bindings.insert(target.clone(), id);
                        if let Some(output) = outputs.iter().find(|d| &d.name == target) {
                            self.designate(output, id);
                        }
                    }
                    Ok(None) => {
                        self.poisoned.insert(target.clone());
                    }
                    Err(err) => {
                        self.errors.push(err);
                        self.poisoned.insert(target.clone());
                    }
                }
            }
            Statement::Call(call) => {
                let rebinds = call
                    .positional()
                    .next()
                    .and_then(Argument::identifier_name)
                    .map(str::to_string);
                match self.lower_call(call) {
                    Ok(Some(id)) => {
                        if let Some(name) = rebinds {
                            self.bindings.insert(name.clone(), id);
                            if let Some(output) = outputs.iter().find(|d| d.name == name) {
                                if self.graph.output(&name).is_some() {
                                    self.designate(output, id);
                                }
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        self.errors.push(err);
                        if let Some(name) = rebinds {
                            self.poisoned.insert(name);
                        }
                    }
                }
            }
            Statement::Block(block) => {
                let mut effective = self.defaults.last().cloned().unwrap_or_default();
                for parameter in &block.parameters {
                    if let (Some(name), ArgumentValue::Literal(value)) =
                        (&parameter.name, &parameter.value)
                    {
                        effective.insert(name.clone(), value.clone());
                    }
                }
                self.defaults.push(effective);
                for inner in &block.statements {
                    self.lower_statement(inner, outputs);
                }
                self.defaults.pop();
            }
        }
    }

    fn designate(&mut self, output: &Declaration, id: NodeId) {
        let Some(node) = self.graph.node(id) else {
            return;
        };
        if node.ty != output.ty {
            self.errors.push(CompileError::TypeMismatch {
                message: format!(
                    "output '{}' is declared {} but assigned {}",
                    output.name, output.ty, node.ty
                ),
                span: output.span,
            });
            self.poisoned.insert(output.name.clone());
            return;
        }
        if let Err(err) = self.graph.designate_output(output.name.clone(), id) {
            self.errors.push(err.into());
        }
    }

    /// Lower one call; `Ok(None)` when an operand comes from a failed statement
    fn lower_call(&mut self, call: &OperationCall) -> Result<Option<NodeId>, CompileError> {
        let registry = self.registry;
        let spec = registry
            .callable(&call.operation)
            .ok_or_else(|| CompileError::UnknownOperation {
                name: call.operation.clone(),
                span: call.span,
            })?;

        let mut operands = Vec::new();
        for argument in call.positional() {
            match self.operand(argument)? {
                Some(id) => operands.push(id),
                None => return Ok(None),
            }
        }
        for param in spec.operand_params() {
            let Some(argument) = call.parameter(&param.name) else {
                continue;
            };
            match self.operand(argument)? {
                Some(id) => operands.push(id),
                None => return Ok(None),
            }
        }

        let ty = self.result_type(spec, call, &operands)?;
        let mut params = self.defaults.last().cloned().unwrap_or_default();
        for argument in call.named() {
            if let (Some(name), ArgumentValue::Literal(value)) = (&argument.name, &argument.value) {
                if spec.param(name).is_some_and(|p| p.role == ParamRole::Attribute) {
                    params.insert(name.clone(), value.clone());
                }
            }
        }

        let id = self.graph.add_operation(spec.kind.clone(), operands, ty)?;
        if let Some(node) = self.graph.node_mut(id) {
            node.params = params;
        }
        Ok(Some(id))
    }

    fn operand(&mut self, argument: &Argument) -> Result<Option<NodeId>, CompileError> {
        match &argument.value {
            ArgumentValue::Identifier(name) => {
                if let Some(id) = self.bindings.get(name) {
                    Ok(Some(*id))
                } else if self.poisoned.contains(name) {
                    Ok(None)
                } else {
                    Err(CompileError::UnresolvedReference {
                        name: name.clone(),
                        span: argument.span,
                    })
                }
            }
            ArgumentValue::Literal(Literal::Number(value)) => Ok(Some(self.constant(*value))),
            ArgumentValue::Literal(text) => Err(CompileError::TypeMismatch {
                message: format!("{text} cannot be used as an operand"),
                span: argument.span,
            }),
        }
    }

    fn constant(&mut self, value: f64) -> NodeId {
        let ty = ValueType::scalar();
        let key = (value.to_bits(), ty.clone());
        if let Some(id) = self.constants.get(&key) {
            return *id;
        }
        let id = self.graph.add_constant(value, ty);
        self.constants.insert(key, id);
        id
    }

    fn result_type(
        &self,
        spec: &OpSpec,
        call: &OperationCall,
        operands: &[NodeId],
    ) -> Result<ValueType, CompileError> {
        let types: Vec<ValueType> = operands
            .iter()
            .filter_map(|id| self.graph.node(*id))
            .map(|node| node.ty.clone())
            .collect();
        spec.result_type(&types)
            .map_err(|message| CompileError::TypeMismatch {
                message: format!("{}: {}", call.operation, message),
                span: call.span,
            })
    }
}

/// Warn about outputs with no input upstream and values no output uses
fn report_unused(graph: &IrGraph, diagnostics: &mut Diagnostics) {
    let mut live: HashSet<NodeId> = HashSet::new();
    for port in graph.outputs() {
        if !graph.depends_on_input(port.node) {
            diagnostics.push(
                Diagnostic::warning(
                    Stage::Build,
                    DiagnosticKind::UnusedOutput,
                    format!("output '{}' does not depend on any input", port.name),
                )
                .with_node(port.node),
            );
        }
        live.insert(port.node);
        live.extend(graph.ancestors(port.node));
    }
    for node in graph.nodes().filter(|n| n.is_operation() && !live.contains(&n.id)) {
        diagnostics.push(
            Diagnostic::warning(
                Stage::Build,
                DiagnosticKind::UnusedValue,
                format!("value '{}' does not reach any output", node.display_name()),
            )
            .with_node(node.id),
        );
    }
}

/// Build with the built-in operations
pub fn build(program: &Program, diagnostics: &mut Diagnostics) -> Result<IrGraph, StageFailed> {
    IrBuilder::new(&OperationRegistry::default()).build(program, diagnostics)
}
