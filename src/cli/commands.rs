//! Dispatch: each function here calls exactly one `cleo-engine` (or
//! `cleo-query`) operation and folds the result into one `Envelope`
//! (spec.md §4.15, §10.4). No store-mutation logic lives in this module.

use chrono::Utc;
use cleo_engine::{archive, deps, lifecycle, project, query, session, tasks, EngineContext};
use cleo_envelope::{CleoError, Envelope, EnvelopeMeta};
use cleo_query::ListQuery;
use serde_json::{json, Value};

use crate::cli::args::{Commands, DepsCommands, LifecycleCommands, ProjectCommands, SessionCommands, TaskCommands};

fn envelope(operation: &str, request_id: &str, result: Result<Value, CleoError>) -> Envelope {
    let meta = EnvelopeMeta::new("cleo", operation, request_id, Utc::now());
    match result {
        Ok(value) => Envelope::success(meta, value, None),
        Err(err) => Envelope::error(meta, &err),
    }
}

/// Run the parsed command against `ctx`, returning the one envelope this
/// invocation produces.
pub fn execute(command: &Commands, ctx: &EngineContext, request_id: &str) -> Envelope {
    match command {
        Commands::Task(cmd) => execute_task(cmd, ctx, request_id),
        Commands::Deps(cmd) => execute_deps(cmd, ctx, request_id),
        Commands::Session(cmd) => execute_session(cmd, ctx, request_id),
        Commands::Lifecycle(cmd) => execute_lifecycle(cmd, ctx, request_id),
        Commands::Project(cmd) => execute_project(cmd, ctx, request_id),
        Commands::List(args) => {
            let query = ListQuery {
                status: args.status.map(Into::into),
                parent_id: args.parent.clone(),
                phase: args.phase.clone(),
                priority: args.priority.map(Into::into),
                labels: args.labels.clone(),
                limit: args.limit,
                offset: args.offset,
                ..ListQuery::default()
            };
            let result = query::run_list(ctx, &query).map(|outcome| json!({
                "tasks": outcome.tasks,
                "total": outcome.total,
            }));
            envelope("query.list", request_id, result)
        }
        Commands::Find(args) => {
            let result = query::run_find(ctx, &args.needle).map(|matches| {
                json!(matches
                    .into_iter()
                    .map(|m| json!({"task": m.task, "score": m.score}))
                    .collect::<Vec<_>>())
            });
            envelope("query.find", request_id, result)
        }
        Commands::Stats => {
            let result = query::run_stats(ctx).and_then(|s| serde_json::to_value(s).map_err(|e| {
                CleoError::Store(cleo_store::StoreError::Parse {
                    path: ctx.tasks_path(),
                    source: e,
                })
            }));
            envelope("query.stats", request_id, result)
        }
        Commands::Leverage => {
            let result = query::run_leverage(ctx).and_then(|entries| serde_json::to_value(entries).map_err(|e| {
                CleoError::Store(cleo_store::StoreError::Parse {
                    path: ctx.tasks_path(),
                    source: e,
                })
            }));
            envelope("query.leverage", request_id, result)
        }
        Commands::CriticalPath => {
            let result = query::run_critical_path(ctx).map(|chain| json!({ "chain": chain }));
            envelope("query.critical_path", request_id, result)
        }
        Commands::WavePlan => {
            let result = query::run_wave_plan(ctx).map(|waves| json!({ "waves": waves }));
            envelope("query.wave_plan", request_id, result)
        }
    }
}

fn execute_task(cmd: &TaskCommands, ctx: &EngineContext, request_id: &str) -> Envelope {
    match cmd {
        TaskCommands::Create(args) => {
            let input = tasks::NewTask {
                title: args.title.clone(),
                description: args.description.clone(),
                parent_id: args.parent.clone(),
                task_type: args.task_type.map(Into::into),
                priority: args.priority.into(),
                size: args.size.map(Into::into),
                labels: args.labels.iter().cloned().collect(),
                depends: args.depends.iter().cloned().collect(),
            };
            let result = tasks::create(ctx, input).map(|t| json!(t));
            envelope("tasks.create", request_id, result)
        }
        TaskCommands::Show { id } => {
            let result = query::run_show(ctx, id).map(|outcome| json!({
                "task": outcome.task,
                "dependencies": outcome.dependencies,
            }));
            envelope("tasks.show", request_id, result)
        }
        TaskCommands::Transition { id, to, reason } => {
            let result = tasks::transition(ctx, id, (*to).into(), reason.clone()).map(|t| json!(t));
            envelope("tasks.transition", request_id, result)
        }
        TaskCommands::Uncancel { id } => {
            let result = tasks::uncancel(ctx, id).map(|t| json!(t));
            envelope("tasks.uncancel", request_id, result)
        }
        TaskCommands::Update(args) => {
            let labels = if args.clear_labels {
                Some(tasks::EditOp::Clear)
            } else if !args.set_labels.is_empty() {
                Some(tasks::EditOp::Replace(args.set_labels.iter().cloned().collect()))
            } else if !args.add_labels.is_empty() {
                Some(tasks::EditOp::Append(args.add_labels.iter().cloned().collect()))
            } else {
                None
            };
            let edit = tasks::TaskEdit {
                title: args.title.clone(),
                description: args.description.clone(),
                priority: args.priority.map(Into::into),
                size: if args.clear_size { Some(None) } else { args.size.map(|s| Some(s.into())) },
                phase: if args.clear_phase { Some(None) } else { args.phase.clone().map(Some) },
                labels,
                append_note: args.note.clone(),
                mark_validated: args.validated,
                mark_tested: args.tested,
                verification: (args.mark_implemented || args.mark_documented).then(|| tasks::VerificationPatch {
                    implemented: args.mark_implemented.then_some(true),
                    documented: args.mark_documented.then_some(true),
                    ..tasks::VerificationPatch::default()
                }),
                ..tasks::TaskEdit::default()
            };
            let result = tasks::update(ctx, &args.id, edit).map(|t| json!(t));
            envelope("tasks.update", request_id, result)
        }
        TaskCommands::DeletePreview { id, cascade } => {
            let result = archive::delete_preview(ctx, id, *cascade).map(|preview| json!({
                "primary": preview.primary,
                "descendants": preview.descendants,
                "dependents": preview.dependents,
                "countsByStatus": preview.counts_by_status,
                "warningCount": preview.warnings.len(),
            }));
            envelope("tasks.delete_preview", request_id, result)
        }
        TaskCommands::Delete { id, cascade, force } => {
            let result = archive::delete(ctx, id, *cascade, *force).map(|preview| json!({
                "primary": preview.primary,
                "descendants": preview.descendants,
            }));
            envelope("tasks.delete", request_id, result)
        }
        TaskCommands::Archive { id, cascade, reason } => {
            let result = archive::archive(ctx, id, *cascade, reason).map(|ids| json!({ "archived": ids }));
            envelope("tasks.archive", request_id, result)
        }
        TaskCommands::Restore { ids } => {
            let result = archive::restore(ctx, ids).map(|()| json!({ "restored": ids }));
            envelope("tasks.restore", request_id, result)
        }
    }
}

fn execute_deps(cmd: &DepsCommands, ctx: &EngineContext, request_id: &str) -> Envelope {
    match cmd {
        DepsCommands::Add { from, to } => {
            let result = deps::add(ctx, from, to).map(|()| json!({ "from": from, "to": to }));
            envelope("deps.add", request_id, result)
        }
        DepsCommands::View { id } => {
            let result = deps::view(ctx, id).map(|view| json!(view));
            envelope("deps.view", request_id, result)
        }
    }
}

fn execute_session(cmd: &SessionCommands, ctx: &EngineContext, request_id: &str) -> Envelope {
    match cmd {
        SessionCommands::Start { id, scope, multi_session } => {
            let result = session::start(ctx, id.clone(), scope, ctx.actor.clone(), *multi_session).map(|s| json!(s));
            envelope("session.start", request_id, result)
        }
        SessionCommands::End { id, note } => {
            let result = session::end(ctx, id, note.clone(), ctx.config.session.require_notes).map(|s| json!(s));
            envelope("session.end", request_id, result)
        }
    }
}

fn execute_lifecycle(cmd: &LifecycleCommands, ctx: &EngineContext, request_id: &str) -> Envelope {
    match cmd {
        LifecycleCommands::StartStage { epic_id, stage } => {
            let result = lifecycle::start_stage(ctx, epic_id, (*stage).into()).map(|d| json!(d));
            envelope("lifecycle.start_stage", request_id, result)
        }
        LifecycleCommands::RecordGate { epic_id, stage, name, result: verdict, details } => {
            let condition = cleo_gate::GateCondition {
                name: name.clone(),
                result: (*verdict).into(),
                checked_by: ctx.actor.clone(),
                checked_at: Utc::now(),
                details: details.clone(),
            };
            let result = lifecycle::record_gate(ctx, epic_id, (*stage).into(), condition).map(|d| json!(d));
            envelope("lifecycle.record_gate", request_id, result)
        }
        LifecycleCommands::AddEvidence { epic_id, stage, description, reference } => {
            let result =
                lifecycle::add_evidence(ctx, epic_id, (*stage).into(), description, reference.clone()).map(|d| json!(d));
            envelope("lifecycle.add_evidence", request_id, result)
        }
        LifecycleCommands::CompleteStage { epic_id, stage } => {
            let result = lifecycle::complete_stage(ctx, epic_id, (*stage).into()).map(|d| json!(d));
            envelope("lifecycle.complete_stage", request_id, result)
        }
        LifecycleCommands::SkipStage { epic_id, stage, reason } => {
            let result = lifecycle::skip_stage(ctx, epic_id, (*stage).into(), reason).map(|d| json!(d));
            envelope("lifecycle.skip_stage", request_id, result)
        }
        LifecycleCommands::ForceTransition { epic_id, stage, to, reason } => {
            let result =
                lifecycle::force_transition(ctx, epic_id, (*stage).into(), (*to).into(), reason).map(|d| json!(d));
            envelope("lifecycle.force_transition", request_id, result)
        }
    }
}

fn parse_phase(raw: &str, fallback_order: u32) -> cleo_store::PhaseDefinition {
    let (order, name) = match raw.split_once(':') {
        Some((order, name)) => (order.parse().unwrap_or(fallback_order), name.to_string()),
        None => (fallback_order, raw.to_string()),
    };
    cleo_store::PhaseDefinition {
        order,
        name,
        description: String::new(),
        status: cleo_store::PhaseStatus::NotStarted,
        started_at: None,
        completed_at: None,
    }
}

fn execute_project(cmd: &ProjectCommands, ctx: &EngineContext, request_id: &str) -> Envelope {
    match cmd {
        ProjectCommands::Show => {
            let result = project::show(ctx).map(|info| json!(info));
            envelope("project.show", request_id, result)
        }
        ProjectCommands::SetPhases { name, phases } => {
            let phases = phases.iter().enumerate().map(|(i, raw)| parse_phase(raw, i as u32)).collect();
            let result = project::set_phases(ctx, name.clone(), phases).map(|info| json!(info));
            envelope("project.set_phases", request_id, result)
        }
    }
}
