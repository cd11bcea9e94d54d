//! Basic usage example for qwave-core
//!
//! Run with: cargo run --example basic_usage

use qwave_core::ast::{Argument, Assignment, Declaration, OperationCall, Program, Statement};
use qwave_core::ir::{Budget, ErrorCorrection, IrGraph, OpKind};
use qwave_core::{OperationRegistry, ValueType};

fn main() {
    println!("=== qwave Core Basic Usage Example ===\n");

    // Example 1: Value types
    println!("1. Value Types:");
    println!("   {}", ValueType::scalar());
    println!("   {}", ValueType::wave(8));
    println!("   {}\n", ValueType::field(4, 4));

    // Example 2: A program AST (y = interfere(a, b))
    println!("2. Program AST:");
    let program = Program::new(
        vec![
            Declaration::input("a", ValueType::wave(8)),
            Declaration::input("b", ValueType::wave(8)),
            Declaration::output("y", ValueType::wave(8)),
        ],
        vec![Statement::Assignment(Assignment::new(
            "y",
            OperationCall::new("interfere")
                .with_argument(Argument::identifier("a"))
                .with_argument(Argument::identifier("b")),
        ))],
    );
    program.walk(&mut |node| println!("   {}", node.label()));
    println!();

    // Example 3: The same program as an IR graph
    println!("3. IR Graph:");
    let mut graph = IrGraph::new("example");
    let a = graph.add_input("a", ValueType::wave(8));
    let b = graph.add_input("b", ValueType::wave(8));
    let y = graph
        .add_operation(OpKind::Interfere, vec![a, b], ValueType::wave(8))
        .expect("inputs exist");
    graph.designate_output("y", y).expect("node exists");
    println!("{}\n", graph);

    // Example 4: Attributes
    println!("4. Attributes:");
    if let Some(node) = graph.node_mut(y) {
        node.attrs.coherence = Budget::Bounded(4.0);
        node.attrs.correction = ErrorCorrection::fault_tolerant(2);
        println!(
            "   {} coherence={} correction={} distance={:?}\n",
            node.id,
            node.attrs.coherence,
            node.attrs.correction,
            node.attrs.correction.distance()
        );
    }

    // Example 5: Registry
    println!("5. Registered operations:");
    let registry = OperationRegistry::default();
    for name in registry.names() {
        println!("   {}", name);
    }
}
