use crate::{
    cli::args::{CheckArgs, RunArgs},
    core::{
        policy::POLICY_FUNCTIONS, CompilationDatabase, ConfigLoader, ConfigValidator,
        DriverConfig, PipelineOrchestrator, RhaiPolicy, SpawnFailurePolicy, TempFileManager,
        TokioCommandRunner,
    },
    Result,
};
use std::io::Write;
use std::sync::Arc;

/// Apply command-line flags on top of the file and environment layers.
fn apply_run_overrides(config: &mut DriverConfig, args: &RunArgs) {
    if let Some(dir) = &args.temp_dir {
        config.temp.dir = Some(dir.clone());
    }
    if args.keep_temps {
        config.temp.keep = true;
    }
    if args.contain_spawn_failures {
        config.pipeline.spawn_failure = SpawnFailurePolicy::FailFile;
    }
    if args.quiet_children {
        config.runner.echo_child_output = false;
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let mut config = ConfigLoader::load(args.config.as_deref())?;
    apply_run_overrides(&mut config, &args);
    ConfigValidator::validate(&config)?;

    let policy = RhaiPolicy::load(&args.scripts.script, args.scripts.filter.as_deref())?;
    let database = CompilationDatabase::load_from_directory(&args.db)?;
    tracing::info!(
        database = %database.source().display(),
        entries = database.len(),
        keep_temps = config.temp.keep,
        spawn_failure = ?config.pipeline.spawn_failure,
        "loaded compilation database"
    );

    let runner = TokioCommandRunner::new(&config.runner);
    let temps = TempFileManager::new(&config.temp);
    let orchestrator = PipelineOrchestrator::new(Arc::new(policy), Arc::new(runner), temps)
        .with_spawn_failure_policy(config.pipeline.spawn_failure);

    let report = orchestrator.run(database.entries()).await.map_err(|e| {
        tracing::error!("Run aborted: {}", e);
        e
    })?;

    let rendered = report.render(args.format.into())?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

pub async fn check(args: CheckArgs) -> Result<()> {
    let config = ConfigLoader::load(args.config.as_deref())?;
    ConfigValidator::validate(&config)?;

    let policy = RhaiPolicy::load(&args.scripts.script, args.scripts.filter.as_deref())?;
    println!("Policy functions:");
    for name in POLICY_FUNCTIONS {
        let mark = if policy.defines(name) { "defined" } else { "-" };
        println!("  {:<24}{}", name, mark);
    }

    println!("Environment overrides:");
    for line in ConfigLoader::env_var_documentation() {
        println!("  {}", line);
    }

    if let Some(db) = &args.db {
        let database = CompilationDatabase::load_from_directory(db)?;
        println!(
            "Compilation database {}: {} entries",
            database.source().display(),
            database.len()
        );
    }
    Ok(())
}
