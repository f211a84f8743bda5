//! Apis command - describes the registered operations.

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};

use dagway_dispatch::{
    ApiDescriptor, ApiRegistry, AssemblyContext, Dispatch, InputKind, ResolvedArguments, assemble,
};

use super::Context;

/// Arguments for the apis command.
#[derive(Args, Debug)]
pub struct ApisArgs {
    /// Show a single operation
    pub name: Option<String>,

    /// Print the command line each generic operation would run, using
    /// placeholder values
    #[arg(long)]
    pub show_command: bool,
}

/// Run the apis command.
pub async fn run(args: ApisArgs, ctx: &Context) -> Result<()> {
    let registry = ApiRegistry::builtin();

    let selected: Vec<&ApiDescriptor> = match args.name {
        Some(ref name) => match registry.lookup(name) {
            Some(descriptor) => vec![descriptor],
            None => bail!("API '{}' was not found", name),
        },
        None => registry.iter().collect(),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    let program = ctx
        .load_config()
        .map(|loaded| loaded.config.orchestrator())
        .unwrap_or_default();
    let log_folder = program.base_log_folder_path();
    let assembly = AssemblyContext {
        program: &program.program,
        log_folder: &log_folder,
    };

    let dim = Style::new().dim();
    for descriptor in selected {
        println!(
            "{} {}  {}",
            style(descriptor.http_method.as_str()).cyan(),
            style(descriptor.name).bold(),
            dim.apply_to(descriptor.available_since)
        );
        println!("    {}", descriptor.description);

        for spec in descriptor.arguments.iter().chain(&descriptor.post_arguments) {
            let marker = if spec.required { "*" } else { " " };
            let kind = match spec.input_kind {
                InputKind::Text => "text",
                InputKind::Flag => "flag",
                InputKind::File => "file",
            };
            println!(
                "    {} {:<20} {:<5} {}",
                marker,
                spec.name,
                kind,
                dim.apply_to(spec.description)
            );
        }

        if args.show_command && descriptor.dispatch == Dispatch::GenericCommandLine {
            let example = example_command(descriptor, &assembly);
            println!("    $ {}", style(example).green());
        }
        println!();
    }

    Ok(())
}

/// Assemble `descriptor` with a placeholder for every argument.
fn example_command(descriptor: &ApiDescriptor, ctx: &AssemblyContext<'_>) -> String {
    let resolved: ResolvedArguments = descriptor
        .arguments
        .iter()
        .map(|spec| (spec.name, format!("<{}>", spec.name)))
        .collect();
    let command = assemble(descriptor, &resolved, ctx);
    if command.is_background() {
        command.to_shell_command()
    } else {
        command.display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_example_command_uses_placeholders() {
        let registry = ApiRegistry::builtin();
        let log_folder = PathBuf::from("/var/log/airflow");
        let ctx = AssemblyContext {
            program: "airflow",
            log_folder: &log_folder,
        };

        let example = example_command(registry.lookup("list_tasks").unwrap(), &ctx);
        assert!(example.starts_with("airflow list_tasks"));
        assert!(example.contains("<dag_id>"));

        let example = example_command(registry.lookup("clear").unwrap(), &ctx);
        assert!(example.contains("--no_confirm"));
    }
}
