//! The flow-definition element vocabulary.
//!
//! Every element the object model understands is a variant of
//! [`ElementKind`]. The enum doubles as the registration table used by
//! construction (which child tags a parent builds) and by the editing
//! layer (which children a parent accepts).

use std::fmt;

// ============================================================================
// ELEMENT KINDS
// ============================================================================

/// The kind of a flow model element.
///
/// Maps one-to-one onto the element tags of the flow language, except for
/// [`ElementKind::IfTransition`], which is a virtual element projected from
/// the `then` / `else` attributes of an `if` node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    // Flows
    Flow,
    InlineFlow,

    // States
    ActionState,
    ViewState,
    DecisionState,
    SubflowState,
    EndState,

    // Transitions
    Transition,
    If,
    IfTransition,
    GlobalTransitions,

    // Action containers
    EntryActions,
    ExitActions,
    RenderActions,
    StartActions,
    EndActions,
    OnEntry,
    OnExit,
    OnRender,
    OnStart,
    OnEnd,

    // Actions
    Action,
    BeanAction,
    EvaluateAction,
    Set,
    MethodArguments,
    Argument,
    MethodResult,
    EvaluationResult,

    // Mappers
    AttributeMapper,
    InputMapper,
    OutputMapper,
    InputAttribute,
    OutputAttribute,
    Mapping,

    // Misc
    Attribute,
    Var,
    Import,
    ExceptionHandler,
    Secured,
}

impl ElementKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [ElementKind] = &[
        Self::Flow,
        Self::InlineFlow,
        Self::ActionState,
        Self::ViewState,
        Self::DecisionState,
        Self::SubflowState,
        Self::EndState,
        Self::Transition,
        Self::If,
        Self::IfTransition,
        Self::GlobalTransitions,
        Self::EntryActions,
        Self::ExitActions,
        Self::RenderActions,
        Self::StartActions,
        Self::EndActions,
        Self::OnEntry,
        Self::OnExit,
        Self::OnRender,
        Self::OnStart,
        Self::OnEnd,
        Self::Action,
        Self::BeanAction,
        Self::EvaluateAction,
        Self::Set,
        Self::MethodArguments,
        Self::Argument,
        Self::MethodResult,
        Self::EvaluationResult,
        Self::AttributeMapper,
        Self::InputMapper,
        Self::OutputMapper,
        Self::InputAttribute,
        Self::OutputAttribute,
        Self::Mapping,
        Self::Attribute,
        Self::Var,
        Self::Import,
        Self::ExceptionHandler,
        Self::Secured,
    ];

    /// The element tag for this kind.
    ///
    /// `IfTransition` has no node of its own; its tag is never written.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::InlineFlow => "inline-flow",
            Self::ActionState => "action-state",
            Self::ViewState => "view-state",
            Self::DecisionState => "decision-state",
            Self::SubflowState => "subflow-state",
            Self::EndState => "end-state",
            Self::Transition => "transition",
            Self::If => "if",
            Self::IfTransition => "if-transition",
            Self::GlobalTransitions => "global-transitions",
            Self::EntryActions => "entry-actions",
            Self::ExitActions => "exit-actions",
            Self::RenderActions => "render-actions",
            Self::StartActions => "start-actions",
            Self::EndActions => "end-actions",
            Self::OnEntry => "on-entry",
            Self::OnExit => "on-exit",
            Self::OnRender => "on-render",
            Self::OnStart => "on-start",
            Self::OnEnd => "on-end",
            Self::Action => "action",
            Self::BeanAction => "bean-action",
            Self::EvaluateAction => "evaluate-action",
            Self::Set => "set",
            Self::MethodArguments => "method-arguments",
            Self::Argument => "argument",
            Self::MethodResult => "method-result",
            Self::EvaluationResult => "evaluation-result",
            Self::AttributeMapper => "attribute-mapper",
            Self::InputMapper => "input-mapper",
            Self::OutputMapper => "output-mapper",
            Self::InputAttribute => "input-attribute",
            Self::OutputAttribute => "output-attribute",
            Self::Mapping => "mapping",
            Self::Attribute => "attribute",
            Self::Var => "var",
            Self::Import => "import",
            Self::ExceptionHandler => "exception-handler",
            Self::Secured => "secured",
        }
    }

    /// Parse from an element tag.
    ///
    /// Namespace prefixes are stripped. Unknown tags (and the virtual
    /// `if-transition`) return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let local = tag.rsplit(':').next().unwrap_or(tag);
        let kind = match local {
            "flow" => Self::Flow,
            "inline-flow" => Self::InlineFlow,
            "action-state" => Self::ActionState,
            "view-state" => Self::ViewState,
            "decision-state" => Self::DecisionState,
            "subflow-state" => Self::SubflowState,
            "end-state" => Self::EndState,
            "transition" => Self::Transition,
            "if" => Self::If,
            "global-transitions" => Self::GlobalTransitions,
            "entry-actions" => Self::EntryActions,
            "exit-actions" => Self::ExitActions,
            "render-actions" => Self::RenderActions,
            "start-actions" => Self::StartActions,
            "end-actions" => Self::EndActions,
            "on-entry" => Self::OnEntry,
            "on-exit" => Self::OnExit,
            "on-render" => Self::OnRender,
            "on-start" => Self::OnStart,
            "on-end" => Self::OnEnd,
            "action" => Self::Action,
            "bean-action" => Self::BeanAction,
            "evaluate-action" => Self::EvaluateAction,
            "set" => Self::Set,
            "method-arguments" => Self::MethodArguments,
            "argument" => Self::Argument,
            "method-result" => Self::MethodResult,
            "evaluation-result" => Self::EvaluationResult,
            "attribute-mapper" => Self::AttributeMapper,
            "input-mapper" => Self::InputMapper,
            "output-mapper" => Self::OutputMapper,
            "input-attribute" => Self::InputAttribute,
            "output-attribute" => Self::OutputAttribute,
            "mapping" => Self::Mapping,
            "attribute" => Self::Attribute,
            "var" => Self::Var,
            "import" => Self::Import,
            "exception-handler" => Self::ExceptionHandler,
            "secured" => Self::Secured,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true for the five state variants.
    pub fn is_state(&self) -> bool {
        matches!(
            self,
            Self::ActionState
                | Self::ViewState
                | Self::DecisionState
                | Self::SubflowState
                | Self::EndState
        )
    }

    /// Returns true if elements of this kind own outbound transitions.
    ///
    /// The flow itself counts: its global transitions leave from it.
    pub fn is_transitionable_from(&self) -> bool {
        matches!(
            self,
            Self::ActionState
                | Self::ViewState
                | Self::DecisionState
                | Self::SubflowState
                | Self::Flow
        )
    }

    /// Returns true if elements of this kind can be a transition target.
    pub fn is_transitionable_to(&self) -> bool {
        self.is_state()
    }

    /// Returns true for both kinds of transition.
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition | Self::IfTransition)
    }

    /// Returns true for the four action leaf kinds.
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Self::Action | Self::BeanAction | Self::EvaluateAction | Self::Set
        )
    }

    /// Returns true for elements whose only job is to hold actions.
    pub fn is_action_container(&self) -> bool {
        matches!(
            self,
            Self::EntryActions
                | Self::ExitActions
                | Self::RenderActions
                | Self::StartActions
                | Self::EndActions
                | Self::OnEntry
                | Self::OnExit
                | Self::OnRender
                | Self::OnStart
                | Self::OnEnd
        )
    }

    /// Returns true for the attribute mapper family.
    pub fn is_mapper(&self) -> bool {
        matches!(
            self,
            Self::AttributeMapper | Self::InputMapper | Self::OutputMapper
        )
    }

    /// Returns true for kinds that have no node of their own.
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::IfTransition)
    }

    /// Returns true if elements of this kind carry a flow-unique `id`.
    pub fn has_state_id(&self) -> bool {
        self.is_state()
    }

    /// The slot this kind occupies inside its parent.
    pub fn slot(&self) -> Slot {
        match self {
            Self::Attribute => Slot::Attributes,
            Self::Secured => Slot::Secured,
            Self::Var => Slot::Vars,
            Self::InputMapper => Slot::InputMapper,
            Self::EntryActions | Self::OnEntry | Self::StartActions | Self::OnStart => {
                Slot::EntryActions
            }
            Self::Action | Self::BeanAction | Self::EvaluateAction | Self::Set => Slot::Actions,
            Self::RenderActions | Self::OnRender => Slot::RenderActions,
            Self::If => Slot::Ifs,
            Self::AttributeMapper => Slot::AttributeMapper,
            Self::ActionState
            | Self::ViewState
            | Self::DecisionState
            | Self::SubflowState
            | Self::EndState => Slot::States,
            Self::InputAttribute | Self::OutputAttribute | Self::Mapping => Slot::Mappings,
            Self::MethodArguments => Slot::Arguments,
            Self::Argument => Slot::Arguments,
            Self::MethodResult | Self::EvaluationResult => Slot::Results,
            Self::OutputMapper => Slot::OutputMapper,
            Self::ExitActions | Self::OnExit | Self::EndActions | Self::OnEnd => Slot::ExitActions,
            Self::ExceptionHandler => Slot::ExceptionHandlers,
            Self::Transition | Self::IfTransition => Slot::Transitions,
            Self::GlobalTransitions => Slot::GlobalTransitions,
            Self::Import => Slot::Imports,
            Self::InlineFlow => Slot::InlineFlows,
            Self::Flow => Slot::Body,
        }
    }

    /// The child kinds a parent of this kind constructs and accepts.
    pub fn child_kinds(&self) -> &'static [ElementKind] {
        use ElementKind::*;
        match self {
            Flow => &[
                Attribute,
                Secured,
                Var,
                InputMapper,
                StartActions,
                OnStart,
                Set,
                ActionState,
                ViewState,
                DecisionState,
                SubflowState,
                EndState,
                GlobalTransitions,
                EndActions,
                OnEnd,
                OutputMapper,
                ExceptionHandler,
                Import,
                InlineFlow,
            ],
            InlineFlow => &[Flow],
            ActionState => &[
                Attribute,
                Secured,
                EntryActions,
                OnEntry,
                Action,
                BeanAction,
                EvaluateAction,
                Set,
                Transition,
                ExitActions,
                OnExit,
                ExceptionHandler,
            ],
            ViewState => &[
                Attribute,
                Secured,
                Var,
                EntryActions,
                OnEntry,
                RenderActions,
                OnRender,
                Transition,
                ExitActions,
                OnExit,
                ExceptionHandler,
            ],
            DecisionState => &[
                Attribute,
                Secured,
                EntryActions,
                OnEntry,
                If,
                ExitActions,
                OnExit,
                ExceptionHandler,
            ],
            SubflowState => &[
                Attribute,
                Secured,
                EntryActions,
                OnEntry,
                AttributeMapper,
                Transition,
                ExitActions,
                OnExit,
                ExceptionHandler,
            ],
            EndState => &[
                Attribute,
                Secured,
                EntryActions,
                OnEntry,
                OutputMapper,
                ExceptionHandler,
            ],
            Transition => &[Attribute, Secured, Action, BeanAction, EvaluateAction, Set],
            If => &[IfTransition],
            GlobalTransitions => &[Transition],
            EntryActions | ExitActions | RenderActions | StartActions | EndActions | OnEntry
            | OnExit | OnRender | OnStart | OnEnd => &[Action, BeanAction, EvaluateAction, Set],
            Action | Set => &[Attribute],
            BeanAction => &[Attribute, MethodArguments, MethodResult],
            EvaluateAction => &[Attribute, EvaluationResult],
            MethodArguments => &[Argument],
            AttributeMapper => &[InputMapper, OutputMapper],
            InputMapper => &[InputAttribute, Mapping],
            OutputMapper => &[OutputAttribute, Mapping],
            IfTransition | Argument | MethodResult | EvaluationResult | InputAttribute
            | OutputAttribute | Mapping | Attribute | Var | Import | ExceptionHandler
            | Secured => &[],
        }
    }

    /// Whether a parent of this kind accepts a child of `child` kind.
    pub fn accepts(&self, child: ElementKind) -> bool {
        self.child_kinds().contains(&child)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// SLOTS
// ============================================================================

/// Where a child sits inside its parent.
///
/// Declaration order is the fixed traversal order used by the visitor:
/// attributes first, then entry actions, the kind-specific middle content,
/// exit actions, exception handlers and finally outbound transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Attributes,
    Secured,
    Vars,
    InputMapper,
    EntryActions,
    Actions,
    RenderActions,
    Ifs,
    AttributeMapper,
    States,
    Mappings,
    Arguments,
    Results,
    OutputMapper,
    ExitActions,
    ExceptionHandlers,
    Transitions,
    GlobalTransitions,
    Imports,
    InlineFlows,
    Body,
}

impl Slot {
    /// Single-valued slots hold at most one element.
    ///
    /// `Arguments` is single-valued under a bean action (the
    /// `method-arguments` wrapper) but not under the wrapper itself, so the
    /// caller passes the parent kind.
    pub fn is_single(&self, parent: ElementKind) -> bool {
        match self {
            Slot::Secured
            | Slot::InputMapper
            | Slot::EntryActions
            | Slot::RenderActions
            | Slot::AttributeMapper
            | Slot::OutputMapper
            | Slot::ExitActions
            | Slot::GlobalTransitions
            | Slot::Results
            | Slot::Body => true,
            Slot::Arguments => parent != ElementKind::MethodArguments,
            _ => false,
        }
    }
}

// ============================================================================
// ACTION CONTEXT
// ============================================================================

/// The semantic context an action was parsed in.
///
/// The same action node shape means different things depending on the
/// container that holds it, so the container assigns this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionType {
    Action,
    EntryAction,
    ExitAction,
    RenderAction,
}

impl ActionType {
    /// The action type assigned to actions held by `container`.
    pub fn for_container(container: ElementKind) -> Option<Self> {
        if matches!(container, ElementKind::ActionState | ElementKind::Transition) {
            return Some(Self::Action);
        }
        if !container.is_action_container() {
            return None;
        }
        match container.slot() {
            Slot::EntryActions => Some(Self::EntryAction),
            Slot::ExitActions => Some(Self::ExitAction),
            Slot::RenderActions => Some(Self::RenderAction),
            _ => None,
        }
    }
}

/// Which branch of an `if` a virtual transition projects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    Then,
    Else,
}

impl Branch {
    /// The `if` attribute holding this branch's target state id.
    pub fn attribute(&self) -> &'static str {
        match self {
            Branch::Then => "then",
            Branch::Else => "else",
        }
    }
}
