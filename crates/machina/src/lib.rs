//! Machina - semantic analysis for the Machina workflow graph language.
//!
//! A parsed [`ast::Machine`] goes through expansion of dotted names, reference
//! linking, node type inference, attribute type checking, graph validation and
//! dependency inference. The result is an [`Analysis`] holding the rewritten
//! machine and every diagnostic the passes produced.

pub mod config;

mod error;

pub use machina_analyzer::{
    dependency, error as diagnostics, expand, graph, link, node_type, scope, template, types,
};
pub use machina_core::{ast, identifier, index};

pub use error::MachinaError;

use indexmap::IndexMap;
use log::{debug, info, trace};

use machina_analyzer::{
    dependency::{Dependency, DependencyAnalyzer},
    error::ValidationContext,
    expand::QualifiedNameExpander,
    graph::{GraphValidationResult, GraphValidator},
    link::Linker,
    node_type::{NodeType, NodeTypeChecker},
    scope::ScopeProvider,
    types::TypeChecker,
};
use machina_core::{ast::Machine, identifier::QualifiedName, index::MachineIndex};

use config::AnalyzerConfig;

/// Runs the analysis pipeline over parsed machines.
///
/// # Examples
///
/// ```rust
/// use machina::{MachineAnalyzer, ast::{Edge, Machine, Node}};
///
/// let machine = Machine::new("review")
///     .with_node(Node::new("start").with_type("init"))
///     .with_node(Node::new("done"))
///     .with_edge(Edge::between("start", "done"));
///
/// let analysis = MachineAnalyzer::default()
///     .analyze(machine)
///     .expect("lenient analysis never fails");
///
/// assert!(analysis.graph().valid);
/// assert!(!analysis.has_errors());
/// ```
#[derive(Debug, Default)]
pub struct MachineAnalyzer {
    config: AnalyzerConfig,
}

impl MachineAnalyzer {
    /// Create a new analyzer with the given configuration.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a machine.
    ///
    /// Expansion and linking rewrite the machine. Every later pass reads the
    /// rewritten machine and reports into one [`ValidationContext`].
    ///
    /// # Errors
    ///
    /// Returns [`MachinaError::Link`] when strict mode is in effect and an
    /// edge references a node that does not exist. Strict mode comes from
    /// the configuration when set, otherwise from the `@StrictMode`
    /// annotation.
    pub fn analyze(&self, machine: Machine) -> Result<Analysis, MachinaError> {
        let strict = self
            .config
            .strict_mode()
            .unwrap_or_else(|| machine.is_strict());
        info!(title:? = machine.title, strict; "Analyzing machine");

        let mut context = ValidationContext::new();

        let (machine, diagnostics) = QualifiedNameExpander::new(strict).expand(machine);
        diagnostics.into_iter().for_each(|e| context.add_error(e));
        debug!(nodes = machine.node_count(); "Qualified names expanded");

        let linked = Linker::new(strict)
            .with_auto_create_placeholders(self.config.auto_create_placeholders())
            .link(machine)?;
        linked
            .diagnostics
            .into_iter()
            .for_each(|e| context.add_error(e));
        debug!(placeholders = linked.placeholders.len(); "References linked");

        let machine = linked.machine;
        let (graph, dependencies, node_types) = {
            let index = MachineIndex::new(&machine);

            let scope = ScopeProvider::new(&index);
            debug!(aliases = scope.len(); "Scope built");

            let types = NodeTypeChecker::new(&index);

            if self.config.check_types() {
                TypeChecker::for_machine(&index).check_machine(&index, &mut context);
            }

            let graph = GraphValidator::new(&index, &types).validate(&mut context);

            let dependencies = if self.config.infer_dependencies() {
                let inferred = DependencyAnalyzer::new(&index)
                    .with_reserved(self.config.reserved_condition_identifiers().iter().cloned())
                    .analyze();
                inferred.detect_circular_dependencies(Some(&mut context));
                inferred.into_dependencies()
            } else {
                Vec::new()
            };

            (graph, dependencies, types.types())
        };

        info!(
            diagnostics = context.len(),
            errors = context.has_errors(),
            valid = graph.valid;
            "Analysis complete"
        );
        trace!(summary:% = context.summary(); "Diagnostic summary");

        Ok(Analysis {
            machine,
            context,
            graph,
            dependencies,
            node_types,
            placeholders: linked.placeholders,
            strict,
        })
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct Analysis {
    machine: Machine,
    context: ValidationContext,
    graph: GraphValidationResult,
    dependencies: Vec<Dependency>,
    node_types: IndexMap<QualifiedName, Option<NodeType>>,
    placeholders: Vec<QualifiedName>,
    strict: bool,
}

impl Analysis {
    /// The machine after expansion and linking.
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn into_machine(self) -> Machine {
        self.machine
    }

    /// Builds a fresh index over the analyzed machine.
    pub fn index(&self) -> MachineIndex<'_> {
        MachineIndex::new(&self.machine)
    }

    pub fn context(&self) -> &ValidationContext {
        &self.context
    }

    pub fn graph(&self) -> &GraphValidationResult {
        &self.graph
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Effective node types by qualified name, in document order.
    pub fn node_types(&self) -> &IndexMap<QualifiedName, Option<NodeType>> {
        &self.node_types
    }

    /// The effective type of one node, looked up by qualified name.
    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.node_types
            .get(&QualifiedName::new(name))
            .and_then(Option::as_ref)
    }

    /// Qualified names of the placeholder nodes the linker created.
    pub fn placeholders(&self) -> &[QualifiedName] {
        &self.placeholders
    }

    /// Whether strict mode was in effect.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Returns `true` if any diagnostic has ERROR severity.
    pub fn has_errors(&self) -> bool {
        self.context.has_errors()
    }
}
