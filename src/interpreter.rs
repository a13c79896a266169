use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info, warn};

use crate::builtins::{native_member, NativeRegistry};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::function::{Arguments, Closure, Function};
use crate::instruction::{Conditional, Instruction, InstructionKind, NamedArgument};
use crate::numeric::MathContext;
use crate::operator::Operator;
use crate::parser::parse_source;
use crate::result::{ExecutionResult, Flow, State};
use crate::scope::{BindingFlags, Scope, ScopeError};
use crate::source::Location;
use crate::value::{
    ErrorValue, Frame, Resolver, Value, ABSENT_FIELD_ERROR, ACCESS_ERROR, ARGUMENT_ERROR,
    BASE_ERROR, TYPE_ERROR,
};

/// Tree-walking evaluator.
///
/// Owns the root scope (populated from a [`NativeRegistry`]), the numeric
/// precision settings, the diagnostic frame stack and the sink `print`
/// writes to.
pub struct Interpreter {
    config: EngineConfig,
    math: MathContext,
    root: Scope,
    frames: Vec<Frame>,
    output: Box<dyn Write>,
}

impl Interpreter {
    /// An interpreter with the default natives, printing to stdout.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(config, &NativeRegistry::with_defaults())
    }

    pub fn with_registry(config: EngineConfig, registry: &NativeRegistry) -> Self {
        info!("Initializing Interpreter for '{}'", config.script_name);

        let root = Scope::new();
        if let Err(e) = registry.install(&root) {
            warn!("Native installation stopped early: {}", e);
        }

        Self {
            math: config.math_context(),
            config,
            root,
            frames: Vec::new(),
            output: Box::new(io::stdout()),
        }
    }

    /// Redirect `print` output.
    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn math(&self) -> MathContext {
        self.math
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// Frames of the calls in progress, innermost last.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Evaluate a parsed program against the root scope.
    pub fn run(&mut self, program: &Instruction) -> ExecutionResult {
        info!("Running program");

        let root = self.root.clone();
        let result = self.evaluate(program, &root);

        info!("Program finished in state {}", result.state());
        result
    }

    /// Parse `source` under the configured script name and run it.
    pub fn run_source(&mut self, source: &str) -> Result<ExecutionResult> {
        let program = parse_source(source, &self.config.script_name)?;
        Ok(self.run(&program))
    }

    pub(crate) fn write_line(&mut self, text: &str, at: &Location) -> Flow<()> {
        writeln!(self.output, "{text}")
            .and_then(|_| self.output.flush())
            .map_err(|e| self.raise(BASE_ERROR, format!("output failed: {e}"), at))
    }

    // ───────────────────────── errors ─────────────────────────

    /// A thrown error value named `name`, carrying the current frames.
    pub fn raise<M: Into<String>>(&self, name: &str, message: M, at: &Location) -> ExecutionResult {
        let error = ErrorValue::new(name, message);
        debug!("Raising {} at {}", error, at);

        self.capture_trace(&error, at);
        ExecutionResult::throwing(Value::error(error), at.clone())
    }

    fn capture_trace(&self, error: &ErrorValue, at: &Location) {
        let mut trace = error.trace.borrow_mut();
        if trace.is_empty() {
            trace.extend(self.frames.iter().cloned());
            trace.push(Frame {
                location: at.clone(),
                description: error.name.clone(),
            });
        }
    }

    pub(crate) fn scope_error(&self, error: ScopeError, at: &Location) -> ExecutionResult {
        let name = match error {
            ScopeError::Absent(_) => ABSENT_FIELD_ERROR,
            ScopeError::Private(_) | ScopeError::Finalized(_) => ACCESS_ERROR,
        };
        self.raise(name, error.to_string(), at)
    }

    // ───────────────────────── evaluation ─────────────────────────

    /// Evaluate to a value, handing abnormal results back as `Err`.
    pub fn eval(&mut self, instruction: &Instruction, scope: &Scope) -> Flow<Value> {
        self.evaluate(instruction, scope).into_flow()
    }

    pub fn evaluate(&mut self, instruction: &Instruction, scope: &Scope) -> ExecutionResult {
        let at = &instruction.location;

        match &instruction.kind {
            InstructionKind::Literal(value) => ExecutionResult::normal(value.clone(), at.clone()),

            InstructionKind::ArrayLiteral(elements) => {
                let flow = elements
                    .iter()
                    .map(|element| self.eval(element, scope))
                    .collect::<Flow<Vec<Value>>>()
                    .map(Value::array);
                ExecutionResult::from_flow(flow, at)
            }

            InstructionKind::Get { target, name } => {
                let flow = self.get(target.as_deref(), name, scope, at);
                ExecutionResult::from_flow(flow, at)
            }

            InstructionKind::Set {
                target,
                name,
                operator,
                value,
                local,
            } => {
                let flow = self.set(target.as_deref(), name, *operator, value, *local, scope, at);
                ExecutionResult::from_flow(flow, at)
            }

            InstructionKind::Invoke {
                target,
                arguments,
                named,
            } => {
                match self.call_site(target, arguments, named, scope) {
                    Ok((Value::Function(function), args)) => self.invoke(&function, args, at),
                    Ok((other, _)) => {
                        debug!("Invoked a non-function {}; result is void", other.type_name());
                        ExecutionResult::normal(Value::Void, at.clone())
                    }
                    Err(abnormal) => abnormal,
                }
            }

            InstructionKind::Operate {
                operator,
                left,
                right,
            } => self.operate(*operator, left, right.as_deref(), scope, at),

            InstructionKind::Sequence(instructions) => {
                let mut last = ExecutionResult::normal(Value::Void, at.clone());
                for instruction in instructions {
                    last = self.evaluate(instruction, scope);
                    if last.is_abnormal() {
                        break;
                    }
                }
                last
            }

            InstructionKind::MakeFunction {
                parameters,
                statics,
                body,
            } => {
                if !Instruction::parameters_are_ordered(parameters) {
                    return self.raise(
                        ARGUMENT_ERROR,
                        "required parameter after a defaulted one",
                        at,
                    );
                }

                let own = Scope::child_of(scope);
                for initializer in statics {
                    let result = self.evaluate(initializer, &own);
                    if result.is_abnormal() {
                        return result;
                    }
                }

                let closure = Closure {
                    parameters: parameters.clone(),
                    body: body.clone(),
                    scope: own,
                    location: at.clone(),
                };

                ExecutionResult::normal(
                    Value::Function(Rc::new(Function::Closure(closure))),
                    at.clone(),
                )
            }

            InstructionKind::MakeObject { body } => {
                let own = Scope::child_of(scope);
                let result = self.evaluate(body, &own);

                match result.state() {
                    State::Throwing | State::Breaking | State::Continuing => result,
                    State::Normal | State::Returning => {
                        ExecutionResult::normal(Value::Object(own), at.clone())
                    }
                }
            }

            InstructionKind::MakeResolver { body } => {
                let resolver = Resolver {
                    body: body.clone(),
                    scope: scope.clone(),
                    cached: Default::default(),
                };
                ExecutionResult::normal(Value::Resolver(Rc::new(resolver)), at.clone())
            }

            InstructionKind::FlagAssign { flag, name, value } => {
                let flow = self.flag_assign(*flag, name, value.as_deref(), scope, at);
                ExecutionResult::from_flow(flow, at)
            }

            InstructionKind::StateChange {
                state,
                label,
                value,
            } => self.state_change(*state, label.as_deref(), value.as_deref(), scope, at),

            InstructionKind::If { label, chain } => {
                let result = self.if_chain(chain, scope, at);
                Self::consume_named_break(result, label.as_deref())
            }

            InstructionKind::While {
                label,
                condition,
                body,
            } => self.loop_while(label.as_deref(), condition, body, false, scope, at),

            InstructionKind::DoWhile {
                label,
                body,
                condition,
            } => self.loop_while(label.as_deref(), condition, body, true, scope, at),

            InstructionKind::ForEach {
                label,
                variable,
                iterable,
                body,
            } => self.for_each(label.as_deref(), variable, iterable, body, scope, at),

            InstructionKind::TryCatch {
                label,
                body,
                variable,
                handler,
            } => {
                let result = self.evaluate(body, &Scope::child_of(scope));

                let result = if result.state() == State::Throwing {
                    debug!("Caught {} into '{}'", result.value(), variable);

                    let catch_scope = Scope::child_of(scope);
                    match catch_scope.set_locally(variable, result.into_value()) {
                        Ok(()) => self.evaluate(handler, &catch_scope),
                        Err(e) => self.scope_error(e, at),
                    }
                } else {
                    result
                };

                Self::consume_named_break(result, label.as_deref())
            }

            InstructionKind::ScopeBlock { label, body } => {
                let result = self.evaluate(body, &Scope::child_of(scope));
                Self::consume_named_break(result, label.as_deref())
            }
        }
    }

    /// A named `if`/`try`/scope block ends normally on a break naming it.
    fn consume_named_break(result: ExecutionResult, label: Option<&str>) -> ExecutionResult {
        if result.state() == State::Breaking && result.names(label) {
            let location = result.location().clone();
            ExecutionResult::normal(result.into_value(), location)
        } else {
            result
        }
    }

    // ───────────────────────── bindings ─────────────────────────

    /// Force a resolver, caching its value; other values pass through.
    pub fn force(&mut self, value: Value, at: &Location) -> Flow<Value> {
        let resolver = match value {
            Value::Resolver(resolver) => resolver,
            other => return Ok(other),
        };

        if let Some(cached) = resolver.cached.borrow().clone() {
            return Ok(cached);
        }

        debug!("Forcing resolver at {}", at);

        let result = self.evaluate(&resolver.body, &Scope::child_of(&resolver.scope));
        let forced = match result.state() {
            State::Normal | State::Returning => result.into_value(),
            _ => return Err(result),
        };
        let forced = self.force(forced, at)?;

        *resolver.cached.borrow_mut() = Some(forced.clone());
        Ok(forced)
    }

    /// The scope a targeted get/set operates on.
    fn target_scope(&mut self, target: &Instruction, scope: &Scope) -> Flow<(Value, Option<Scope>)> {
        let value = self.eval(target, scope)?;
        let own = value.scope();
        Ok((value, own))
    }

    fn get(
        &mut self,
        target: Option<&Instruction>,
        name: &str,
        scope: &Scope,
        at: &Location,
    ) -> Flow<Value> {
        let value = match target {
            None => scope
                .lookup_from(name, scope)
                .map_err(|e| self.scope_error(e, at))?,
            Some(target) => {
                let (receiver, own) = self.target_scope(target, scope)?;
                self.member(&receiver, own.as_ref(), name, scope, at)?
            }
        };

        self.force(value, at)
    }

    /// `receiver.name` read from code running in `accessor`.
    fn member(
        &mut self,
        receiver: &Value,
        own: Option<&Scope>,
        name: &str,
        accessor: &Scope,
        at: &Location,
    ) -> Flow<Value> {
        if let Some(own) = own {
            match own.lookup_from(name, accessor) {
                Ok(value) => return Ok(value),
                Err(ScopeError::Absent(_)) => {}
                Err(e) => return Err(self.scope_error(e, at)),
            }
        }

        native_member(receiver, name).ok_or_else(|| {
            self.raise(
                ABSENT_FIELD_ERROR,
                format!("{} has no member '{}'", receiver.type_name(), name),
                at,
            )
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn set(
        &mut self,
        target: Option<&Instruction>,
        name: &str,
        operator: Option<Operator>,
        value: &Instruction,
        local: bool,
        scope: &Scope,
        at: &Location,
    ) -> Flow<Value> {
        let destination = match target {
            None => scope.clone(),
            Some(target) => {
                let (receiver, own) = self.target_scope(target, scope)?;
                own.ok_or_else(|| {
                    self.raise(
                        TYPE_ERROR,
                        format!("cannot set member '{}' on {}", name, receiver.type_name()),
                        at,
                    )
                })?
            }
        };

        let new_value = match operator {
            // Compound: the current value is read before the right side runs.
            Some(operator) => {
                let current = destination
                    .lookup_from(name, scope)
                    .map_err(|e| self.scope_error(e, at))?;
                let current = self.force(current, at)?;
                let right = self.eval(value, scope)?;
                self.dispatch(&current, operator, Some(&right), at).into_flow()?
            }
            None => self.eval(value, scope)?,
        };

        debug!("Assigning '{}'", name);

        let written = if local || target.is_some() {
            destination.set_locally_from(name, new_value.clone(), scope)
        } else {
            destination.set_from(name, new_value.clone(), scope)
        };
        written.map_err(|e| self.scope_error(e, at))?;

        Ok(new_value)
    }

    fn flag_assign(
        &mut self,
        flag: BindingFlags,
        name: &str,
        value: Option<&Instruction>,
        scope: &Scope,
        at: &Location,
    ) -> Flow<Value> {
        let assigned = match value {
            Some(value) => {
                let assigned = self.eval(value, scope)?;
                scope
                    .set_locally(name, assigned.clone())
                    .map_err(|e| self.scope_error(e, at))?;
                assigned
            }
            None => Value::Void,
        };

        scope.set_flag(name, flag);
        Ok(assigned)
    }

    // ───────────────────────── control flow ─────────────────────────

    fn state_change(
        &mut self,
        state: State,
        label: Option<&str>,
        value: Option<&Instruction>,
        scope: &Scope,
        at: &Location,
    ) -> ExecutionResult {
        let value = match value {
            Some(value) => match self.eval(value, scope) {
                Ok(value) => value,
                Err(abnormal) => return abnormal,
            },
            None => Value::Void,
        };
        let label: Option<Rc<str>> = label.map(Rc::from);

        match state {
            State::Normal => ExecutionResult::normal(value, at.clone()),
            State::Returning => ExecutionResult::returning(value, at.clone()),
            State::Breaking => ExecutionResult::breaking(label, value, at.clone()),
            State::Continuing => ExecutionResult::continuing(label, at.clone()),
            State::Throwing => {
                if let Value::Error(error) = &value {
                    self.capture_trace(error, at);
                }
                ExecutionResult::throwing(value, at.clone())
            }
        }
    }

    fn if_chain(&mut self, chain: &Conditional, scope: &Scope, at: &Location) -> ExecutionResult {
        let mut link = Some(chain);

        while let Some(conditional) = link {
            let taken = match &conditional.condition {
                None => true,
                Some(condition) => {
                    let flow = self
                        .eval(condition, scope)
                        .and_then(|value| self.as_boolean(&value, condition.location()));
                    match flow {
                        Ok(taken) => taken,
                        Err(abnormal) => return abnormal,
                    }
                }
            };

            if taken {
                return self.evaluate(&conditional.body, &Scope::child_of(scope));
            }

            link = conditional.next.as_deref();
        }

        ExecutionResult::normal(Value::Void, at.clone())
    }

    /// Loop bookkeeping shared by every loop: `Ok(Some(result))` ends the
    /// loop with `result`, `Ok(None)` goes on to the next iteration.
    fn after_iteration(result: ExecutionResult, label: Option<&str>) -> Option<ExecutionResult> {
        match result.state() {
            State::Normal => None,
            State::Breaking if result.targets(label) => {
                let location = result.location().clone();
                Some(ExecutionResult::normal(result.into_value(), location))
            }
            State::Continuing if result.targets(label) => None,
            _ => Some(result),
        }
    }

    fn loop_while(
        &mut self,
        label: Option<&str>,
        condition: &Instruction,
        body: &Instruction,
        body_first: bool,
        scope: &Scope,
        at: &Location,
    ) -> ExecutionResult {
        let mut first = body_first;

        loop {
            if !first {
                let flow = self
                    .eval(condition, scope)
                    .and_then(|value| self.as_boolean(&value, condition.location()));
                match flow {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(abnormal) => return abnormal,
                }
            }
            first = false;

            let result = self.evaluate(body, &Scope::child_of(scope));
            if let Some(end) = Self::after_iteration(result, label) {
                return end;
            }
        }

        ExecutionResult::normal(Value::Void, at.clone())
    }

    fn for_each(
        &mut self,
        label: Option<&str>,
        variable: &str,
        iterable: &Instruction,
        body: &Instruction,
        scope: &Scope,
        at: &Location,
    ) -> ExecutionResult {
        let iterable = match self.eval(iterable, scope) {
            Ok(value) => value,
            Err(abnormal) => return abnormal,
        };

        let Some(iterator_method) = self.find_method(&iterable, "iterator", 0) else {
            debug!("No iterator on {}; binding once", iterable.type_name());
            let result = self.iteration(variable, iterable, body, scope, at);
            return Self::after_iteration(result, label)
                .unwrap_or_else(|| ExecutionResult::normal(Value::Void, at.clone()));
        };

        let iterator = match self
            .invoke(&iterator_method, Arguments::default(), at)
            .into_flow()
        {
            Ok(iterator) => iterator,
            Err(abnormal) => return abnormal,
        };

        let (Some(has_next), Some(next)) = (
            self.find_method(&iterator, "hasNext", 0),
            self.find_method(&iterator, "next", 0),
        ) else {
            return self.raise(TYPE_ERROR, "iterator lacks hasNext() or next()", at);
        };

        loop {
            let more = self
                .invoke(&has_next, Arguments::default(), at)
                .into_flow()
                .and_then(|value| self.as_boolean(&value, at));
            match more {
                Ok(true) => {}
                Ok(false) => break,
                Err(abnormal) => return abnormal,
            }

            let item = match self.invoke(&next, Arguments::default(), at).into_flow() {
                Ok(item) => item,
                Err(abnormal) => return abnormal,
            };

            let result = self.iteration(variable, item, body, scope, at);
            if let Some(end) = Self::after_iteration(result, label) {
                return end;
            }
        }

        ExecutionResult::normal(Value::Void, at.clone())
    }

    fn iteration(
        &mut self,
        variable: &str,
        item: Value,
        body: &Instruction,
        scope: &Scope,
        at: &Location,
    ) -> ExecutionResult {
        let iteration_scope = Scope::child_of(scope);
        match iteration_scope.set_locally(variable, item) {
            Ok(()) => self.evaluate(body, &iteration_scope),
            Err(e) => self.scope_error(e, at),
        }
    }

    // ───────────────────────── calls ─────────────────────────

    /// Callee first, then positional arguments left to right, then named.
    fn call_site(
        &mut self,
        target: &Instruction,
        arguments: &[Instruction],
        named: &[NamedArgument],
        scope: &Scope,
    ) -> Flow<(Value, Arguments)> {
        let callee = self.eval(target, scope)?;

        let mut args = Arguments::default();
        for argument in arguments {
            args.positional.push(self.eval(argument, scope)?);
        }
        for argument in named {
            let value = self.eval(&argument.value, scope)?;
            args.named.push((argument.name.clone(), value));
        }

        Ok((callee, args))
    }

    /// Call `function`, recording a diagnostic frame for the duration.
    pub fn invoke(&mut self, function: &Rc<Function>, args: Arguments, at: &Location) -> ExecutionResult {
        let required = function.required_parameters();
        if matches!(function.as_ref(), Function::Native(_)) && args.len() < required {
            return self.raise(
                ARGUMENT_ERROR,
                format!(
                    "{} expects at least {} argument(s), got {}",
                    function.name(),
                    required,
                    args.len()
                ),
                at,
            );
        }

        debug!("Invoking {} with {} argument(s)", function.name(), args.len());

        self.frames.push(Frame {
            location: at.clone(),
            description: function.name(),
        });
        let result = function.invoke(args, self, at);
        self.frames.pop();

        result
    }

    /// Bind arguments in a fresh activation scope and run the body.
    pub(crate) fn call_closure(
        &mut self,
        closure: &Closure,
        args: Arguments,
        at: &Location,
    ) -> ExecutionResult {
        let activation = Scope::child_of(&closure.scope);
        let Arguments {
            positional,
            mut named,
        } = args;
        let mut positional = positional.into_iter();

        for parameter in closure.parameters.iter() {
            let supplied = match positional.next() {
                Some(_) if named.iter().any(|(name, _)| *name == parameter.name) => {
                    return self.raise(
                        ARGUMENT_ERROR,
                        format!(
                            "argument '{}' given both by position and by name",
                            parameter.name
                        ),
                        at,
                    );
                }
                Some(value) => Some(value),
                None => named
                    .iter()
                    .position(|(name, _)| *name == parameter.name)
                    .map(|index| named.remove(index).1),
            };

            let value = match (supplied, &parameter.default) {
                (Some(value), _) => value,
                (None, Some(default)) => match self.eval(default, &activation) {
                    Ok(value) => value,
                    Err(abnormal) => return abnormal,
                },
                (None, None) => {
                    return self.raise(
                        ARGUMENT_ERROR,
                        format!("missing required argument '{}'", parameter.name),
                        at,
                    );
                }
            };

            if let Err(e) = activation.set_locally(&parameter.name, value) {
                return self.scope_error(e, at);
            }
        }

        for (name, value) in named {
            if let Err(e) = activation.set_locally(&name, value) {
                return self.scope_error(e, at);
            }
        }

        let result = self.evaluate(&closure.body, &activation);

        match result.state() {
            State::Returning => {
                let location = result.location().clone();
                ExecutionResult::normal(result.into_value(), location)
            }
            _ => result,
        }
    }
}
