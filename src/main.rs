//! tt_replicasets: show the replicaset topology of a Tarantool application.
//!
//! The replies of the instances to the topology query are read from captured JSON files, one
//! per instance, given as `--instance APP:INSTANCE=PATH`.
use std::{collections::HashMap, path::Path, process, sync::Arc};
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::*;
use tt_replicasets::cconfig::{CConfigApplication, CConfigInstance};
use tt_replicasets::evaler::{EvalOptions, EvalTarget, Evaler, ReplayEvaler};
use tt_replicasets::replicaset::ReplicasetsGetter;
use tt_replicasets::{status, utility};

#[derive(Debug, Parser)]
#[command(version, about = "Resolve and classify the replicasets of a Tarantool application")]
pub struct Opts {
    /// instance and the file with its captured reply: APP:INSTANCE=PATH (repeatable)
    #[arg(short, long = "instance", required = true)]
    instances: Vec<String>,
    /// resolve through all instances of this application, even if only one is given
    #[arg(short, long)]
    app: Option<String>,
    /// number of instances queried at the same time
    #[arg(long)]
    parallel: Option<String>,
    /// per-instance timeout in seconds
    #[arg(long)]
    timeout: Option<String>,
    /// print the aggregate as JSON
    #[arg(long)]
    json: bool,
    /// write the parallel and timeout settings to .env
    #[arg(long)]
    write_dotenv: bool,
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::init();
    let options = Opts::parse();

    if let Err(error) = run(options) {
        error!("{:#}", error);
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}

fn run(options: Opts) -> Result<()> {
    let mut changed_options = HashMap::new();
    let parallel = utility::set_parallel(&options.parallel, &mut changed_options)?;
    let timeout = utility::set_timeout(&options.timeout, &mut changed_options)?;

    let mut targets = Vec::new();
    for argument in &options.instances {
        let (name, path) = utility::parse_target(argument)?;
        if let Some(app) = &options.app {
            if !name.starts_with(&format!("{}:", app)) {
                bail!("Instance {} does not belong to application {}", name, app);
            }
        }
        let evaler: Arc<dyn Evaler> = Arc::new(ReplayEvaler::new(path));
        targets.push(EvalTarget::new(name, evaler));
    }

    let (replicasets, failures) = if targets.len() == 1 && options.app.is_none() {
        info!("resolving through instance {}", targets[0].name);
        let getter = CConfigInstance::new(Arc::clone(&targets[0].evaler));
        let replicasets = getter.get_replicasets()
            .with_context(|| format!("Failed to get replicasets from {}", targets[0].name))?;
        (replicasets, Vec::new())
    } else {
        info!("resolving through {} instances", targets.len());
        let eval_options = EvalOptions {
            parallel,
            timeout,
            ..Default::default()
        };
        let report = CConfigApplication::new(targets, eval_options).resolve()?;
        (report.replicasets, report.failures)
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&replicasets)?);
    } else {
        print!("{}", status::format_status(&replicasets, &failures));
    }

    utility::dotenv_writer(options.write_dotenv, changed_options, Path::new(".env"))?;
    Ok(())
}
