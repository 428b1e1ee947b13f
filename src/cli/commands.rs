//! Command dispatch: one handler per subcommand.

use std::io;
use std::path::Path;

use chrono::Utc;
use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{SyllabusService, TemplateService};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, TemplateCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Attributes, Direction, DragOutcome, DragSession, NodeId};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{FileAction, InfraError};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("resolve current directory", e))?,
    };

    match &cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Some(Commands::Config { command }) => execute_config(command, &dir),
        Some(command) => {
            let settings = Settings::load(Some(&dir))?;
            debug!("execute_command: data_dir={}", settings.data_dir.display());
            let container = ServiceContainer::new(settings);
            execute_template_command(command, &container)
        }
        None => Err(CliError::Usage(
            "no command given, see `syllabus --help`".to_string(),
        )),
    }
}

fn execute_template_command(command: &Commands, container: &ServiceContainer) -> CliResult<()> {
    let mut template = container.template_service()?;
    match command {
        Commands::Tree { depth } => cmd_tree(&template, *depth),
        Commands::Add {
            parent,
            kind,
            name,
            attrs,
        } => cmd_add(&mut template, *parent, kind, name.as_deref(), attrs),
        Commands::Delete { id } => {
            let mut syllabus = container.syllabus_service()?;
            cmd_delete(&mut template, &mut syllabus, *id)
        }
        Commands::Move { id, target } => cmd_move(&mut template, *id, *target),
        Commands::Reorder { id, direction } => cmd_reorder(&mut template, *id, *direction),
        Commands::Validate => cmd_validate(&template),
        Commands::Search { term } => cmd_search(&template, term),
        Commands::Set {
            node,
            field,
            value,
            group,
        } => {
            let mut syllabus = container.syllabus_service()?;
            cmd_set(&template, &mut syllabus, *node, field, value, group.as_deref())
        }
        Commands::Get { node, field } => {
            let syllabus = container.syllabus_service()?;
            cmd_get(&syllabus, *node, field)
        }
        Commands::Stats => {
            let syllabus = container.syllabus_service()?;
            cmd_stats(&template, &syllabus)
        }
        Commands::Generate { filename } => {
            let mut syllabus = container.syllabus_service()?;
            cmd_generate(&template, &mut syllabus, filename.as_deref())
        }
        Commands::Template { command } => match command {
            TemplateCommands::Export { output } => cmd_export(&template, output.as_deref()),
            TemplateCommands::Import { file } => {
                let mut syllabus = container.syllabus_service()?;
                cmd_import(&mut template, &mut syllabus, file)
            }
        },
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn execute_config(command: &ConfigCommands, dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(dir))?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(unavailable)".to_string());
            output::action("global", &global);
            output::action("local", &local_config_path(dir).display());
        }
    }
    Ok(())
}

#[instrument(level = "debug", skip(template))]
fn cmd_tree(template: &TemplateService, depth: usize) -> CliResult<()> {
    output::info(&template.query().render_tree(depth));
    Ok(())
}

fn cmd_add(
    template: &mut TemplateService,
    parent: NodeId,
    kind: &str,
    name: Option<&str>,
    attrs: &[(String, String)],
) -> CliResult<()> {
    let attributes: Attributes = attrs.iter().cloned().collect();
    let node = template.insert(parent, name.unwrap_or(kind), kind, attributes)?;
    output::success(&format!("added {node}"));
    after_mutation(template);
    Ok(())
}

fn cmd_delete(
    template: &mut TemplateService,
    syllabus: &mut SyllabusService,
    id: NodeId,
) -> CliResult<()> {
    let removed = template.delete(id)?;
    let dropped = syllabus.forget_nodes(&removed);
    output::success(&format!(
        "deleted {} node(s), dropped values of {}",
        removed.len(),
        dropped
    ));
    after_mutation(template);
    if let Some(w) = syllabus.take_persistence_warning() {
        output::warning(&w);
    }
    Ok(())
}

/// Runs the move as one drag gesture: start on `id`, hover and drop on `target`.
fn cmd_move(template: &mut TemplateService, id: NodeId, target: NodeId) -> CliResult<()> {
    let mut drag = DragSession::new();
    drag.start(&*template, id)?;
    drag.hover(target);
    match drag.drop_on(template, target) {
        DragOutcome::Moved(node) => output::success(&format!("moved {node}")),
        DragOutcome::NoOp => output::info(&"node dropped onto itself, nothing to do"),
        DragOutcome::Cancelled => output::info(&"move cancelled"),
        DragOutcome::Rejected(e) => return Err(e.into()),
    }
    after_mutation(template);
    Ok(())
}

fn cmd_reorder(template: &mut TemplateService, id: NodeId, direction: Direction) -> CliResult<()> {
    if template.reorder(id, direction)? {
        output::success(&format!("moved #{id} {direction:?}"));
        after_mutation(template);
    } else {
        output::info(&format!("#{id} is already at the edge of its siblings"));
    }
    Ok(())
}

fn cmd_validate(template: &TemplateService) -> CliResult<()> {
    let report = template.validate();
    if report.is_clean() {
        output::success(&"template is valid");
        return Ok(());
    }
    output::report(&report);
    if report.is_valid() {
        Ok(())
    } else {
        Err(ApplicationError::ExportBlocked {
            errors: report.errors,
        }
        .into())
    }
}

fn cmd_search(template: &TemplateService, term: &str) -> CliResult<()> {
    let query = template.query();
    let hits = query.search(term);
    if hits.is_empty() {
        output::info(&format!("no nodes match '{term}'"));
    }
    for node in hits {
        let depth = query
            .depth_of(node.id)
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        output::info(&format!("{node}  depth={depth}"));
    }
    Ok(())
}

fn cmd_set(
    template: &TemplateService,
    syllabus: &mut SyllabusService,
    node: NodeId,
    field: &str,
    value: &str,
    group: Option<&str>,
) -> CliResult<()> {
    match template.store().get(node) {
        None => output::warning(&format!("node {node} is not in the template; value kept anyway")),
        Some(n) if !n.attributes.contains_key(field) => {
            output::warning(&format!("'{field}' is not a field of {n}"))
        }
        Some(_) => {}
    }
    match group {
        Some(key) => syllabus.set_group_value(node, field, key, value),
        None => syllabus.set_value(node, field, value),
    }
    output::success(&format!("#{node} {field} set"));
    if let Some(w) = syllabus.take_persistence_warning() {
        output::warning(&w);
    }
    Ok(())
}

fn cmd_get(syllabus: &SyllabusService, node: NodeId, field: &str) -> CliResult<()> {
    match syllabus.get_value(node, field) {
        Some(value) => output::info(value),
        None => output::info(&""),
    }
    Ok(())
}

fn cmd_stats(template: &TemplateService, syllabus: &SyllabusService) -> CliResult<()> {
    let completion = syllabus.completion(template.store());
    let generation = syllabus.generation_stats()?;
    let sections = template.query().root_children().len();

    output::header(&"Template");
    output::detail(&format!("nodes: {}", template.nodes().len()));
    output::detail(&format!("sections: {sections}"));
    output::header(&"Completion");
    output::detail(&format!(
        "{}/{} fields ({}%)",
        completion.filled, completion.total, completion.percentage
    ));
    output::header(&"Generated documents");
    output::detail(&format!("count: {}", generation.count));
    if let Some(at) = generation.last_generated {
        output::detail(&format!("last: {}", at.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    Ok(())
}

fn cmd_generate(
    template: &TemplateService,
    syllabus: &mut SyllabusService,
    filename: Option<&str>,
) -> CliResult<()> {
    let report = template.validate();
    if !report.is_valid() {
        output::report(&report);
    }
    let result = syllabus.export(template, filename, Utc::now())?;
    let written = result.filename.unwrap_or_default();
    output::action("generated", &written);
    if let Some(message) = result.message {
        output::detail(&message);
    }
    if let Some(w) = syllabus.take_persistence_warning() {
        output::warning(&w);
    }
    Ok(())
}

fn cmd_export(template: &TemplateService, path: Option<&Path>) -> CliResult<()> {
    let json = template.export_snapshot(Utc::now())?;
    match path {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| InfraError::template_file(FileAction::Export, path, e))?;
            output::success(&format!("exported template to {}", path.display()));
        }
        None => output::info(&json),
    }
    Ok(())
}

/// Values keyed by ids of the replaced template are dropped with it.
fn cmd_import(
    template: &mut TemplateService,
    syllabus: &mut SyllabusService,
    file: &Path,
) -> CliResult<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| InfraError::template_file(FileAction::Import, file, e))?;
    let replaced = template.import_snapshot(&text)?;
    let dropped = syllabus.forget_nodes(&replaced);
    output::success(&format!(
        "imported {} nodes from {}, dropped values of {}",
        template.nodes().len(),
        file.display(),
        dropped
    ));
    after_mutation(template);
    if let Some(w) = syllabus.take_persistence_warning() {
        output::warning(&w);
    }
    Ok(())
}

/// Report validator findings and any failed write after a structural change.
fn after_mutation(template: &mut TemplateService) {
    let report = template.validate();
    output::report(&report);
    if let Some(w) = template.take_persistence_warning() {
        output::warning(&w);
    }
}
