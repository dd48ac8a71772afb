//! The status report of a replicasets aggregate.
use std::fmt::Write;
use colored::*;
use crate::error::InstanceFailure;
use crate::replicaset::{Master, Mode, Replicasets};

/// Renders the report. Colors follow the `colored` global settings, so the output is plain
/// when colors are turned off.
pub fn format_status(
    replicasets: &Replicasets,
    failures: &[InstanceFailure],
) -> String
{
    let mut output = String::new();
    // writing into a String cannot fail
    let _ = write_status(&mut output, replicasets, failures);
    output
}

fn write_status(
    output: &mut String,
    replicasets: &Replicasets,
    failures: &[InstanceFailure],
) -> std::fmt::Result
{
    writeln!(output, "Orchestrator:      {}", replicasets.orchestrator)?;
    writeln!(output, "Replicasets state: {}", replicasets.state)?;

    for replicaset in &replicasets.replicasets {
        writeln!(output)?;
        let name = if replicaset.alias.is_empty() { &replicaset.uuid } else { &replicaset.alias };
        writeln!(output, "• {}", name.bold())?;
        writeln!(output, "  Failover: {}", replicaset.failover)?;
        let master = match replicaset.master {
            Master::Single => replicaset.master.to_string().green(),
            Master::Unknown => replicaset.master.to_string().yellow(),
            Master::Multi => replicaset.master.to_string().red(),
            Master::No => replicaset.master.to_string().normal(),
        };
        writeln!(output, "  Master:   {}", master)?;
        if !replicaset.leader_uuid.is_empty() {
            writeln!(output, "  Leader:   {}", replicaset.leader_uuid)?;
        }
        for instance in &replicaset.instances {
            let mode = match instance.mode {
                Mode::RW => instance.mode.to_string().green(),
                Mode::Read => instance.mode.to_string().normal(),
                Mode::Unknown => instance.mode.to_string().yellow(),
            };
            let alias = if instance.alias.is_empty() { &instance.uuid } else { &instance.alias };
            writeln!(output, "    • {} {} {}", alias, instance.uri, mode)?;
        }
    }

    if !failures.is_empty() {
        writeln!(output)?;
        writeln!(output, "{}", "Failed instances:".red())?;
        for failure in failures {
            writeln!(output, "  {} {} {}", failure.timestamp.format("%Y-%m-%d %H:%M:%S"), failure.instance, failure.error)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use crate::error::ReplicasetError;
    use crate::replicaset::{Failover, Instance, Orchestrator, Replicaset, State};

    #[test]
    fn unit_format_status() {
        colored::control::set_override(false);
        let replicasets = Replicasets {
            state: State::Bootstrapped,
            orchestrator: Orchestrator::CentralizedConfig,
            replicasets: vec![
                Replicaset {
                    uuid: "r1".to_string(),
                    leader_uuid: "i1".to_string(),
                    alias: "storage-001".to_string(),
                    master: Master::Single,
                    failover: Failover::Manual,
                    instances: vec![
                        Instance { alias: "storage-001-a".to_string(), uuid: "i1".to_string(), uri: "localhost:3301".to_string(), mode: Mode::RW },
                        Instance { alias: String::new(), uuid: "i2".to_string(), uri: "localhost:3302".to_string(), mode: Mode::Read },
                    ],
                },
                Replicaset {
                    uuid: "r2".to_string(),
                    master: Master::No,
                    ..Default::default()
                },
            ],
        };
        let expected = "\
Orchestrator:      centralized config
Replicasets state: bootstrapped

• storage-001
  Failover: manual
  Master:   single
  Leader:   i1
    • storage-001-a localhost:3301 rw
    • i2 localhost:3302 read

• r2
  Failover: unknown
  Master:   no
";
        assert_eq!(format_status(&replicasets, &[]), expected);
    }

    #[test]
    fn unit_format_status_with_failures() {
        colored::control::set_override(false);
        let failures = vec![InstanceFailure {
            instance: "app:i3".to_string(),
            timestamp: Local::now(),
            error: ReplicasetError::Cancelled,
        }];
        let output = format_status(&Replicasets::default(), &failures);
        assert!(output.starts_with("Orchestrator:      unknown\nReplicasets state: unknown\n\nFailed instances:\n"));
        assert!(output.trim_end().ends_with("app:i3 resolution cancelled"));
    }
}
