//! The impls and functions.
//!
use std::{collections::{HashMap, HashSet}, fmt};
use log::*;
use crate::replicaset::{Failover, Instance, Master, Mode, Orchestrator, Replicaset, Replicasets, ReplicasetsMerger, State};

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            State::Unknown => write!(f, "unknown"),
            State::Bootstrapped => write!(f, "bootstrapped"),
            State::NotBootstrapped => write!(f, "uninitialized"),
        }
    }
}

impl fmt::Display for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Orchestrator::Unknown => write!(f, "unknown"),
            Orchestrator::CentralizedConfig => write!(f, "centralized config"),
            Orchestrator::Cartridge => write!(f, "cartridge"),
            Orchestrator::Custom => write!(f, "custom"),
        }
    }
}

impl fmt::Display for Failover {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Failover::Unknown => write!(f, "unknown"),
            Failover::Off => write!(f, "off"),
            Failover::Manual => write!(f, "manual"),
            Failover::Election => write!(f, "election"),
            Failover::Supervised => write!(f, "supervised"),
        }
    }
}

impl fmt::Display for Master {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Master::Unknown => write!(f, "unknown"),
            Master::No => write!(f, "no"),
            Master::Single => write!(f, "single"),
            Master::Multi => write!(f, "multi"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Unknown => write!(f, "unknown"),
            Mode::Read => write!(f, "read"),
            Mode::RW => write!(f, "rw"),
        }
    }
}

impl Failover {
    /// Exact, case sensitive lookup. Anything unrecognized is [Failover::Unknown].
    pub fn from_name(name: &str) -> Self {
        match name {
            "off" => Failover::Off,
            "manual" => Failover::Manual,
            "election" => Failover::Election,
            "supervised" => Failover::Supervised,
            _ => Failover::Unknown,
        }
    }
}

impl Orchestrator {
    pub fn from_name(name: &str) -> Self {
        match name {
            "centralized config" => Orchestrator::CentralizedConfig,
            "cartridge" => Orchestrator::Cartridge,
            "custom" => Orchestrator::Custom,
            _ => Orchestrator::Unknown,
        }
    }
}

impl Replicasets {
    pub fn new(
        state: State,
        orchestrator: Orchestrator,
    ) -> Self
    {
        Replicasets {
            state,
            orchestrator,
            replicasets: Vec::new(),
        }
    }
}

impl Replicaset {
    /// Derives `master` from the modes of the members.
    ///
    /// A single member with an unknown mode makes the result unknown: the introspection data
    /// only reports the read/write status of the instance that answered. So does a member
    /// listed twice, since one answer then stands for several entries.
    pub fn recalculate_master(&mut self) {
        let mut uuids = HashSet::new();
        let duplicated = self.instances.iter().any(|instance| !uuids.insert(instance.uuid.as_str()));
        if duplicated || self.instances.iter().any(|instance| instance.mode == Mode::Unknown) {
            self.master = Master::Unknown;
            return;
        }
        self.master = match self.instances.iter().filter(|instance| instance.mode == Mode::RW).count() {
            0 => Master::No,
            1 => Master::Single,
            _ => Master::Multi,
        };
    }
}

impl ReplicasetsMerger {
    pub fn new(orchestrator: Orchestrator) -> Self {
        ReplicasetsMerger {
            merged: Replicasets::new(State::Unknown, orchestrator),
            reporters: HashMap::new(),
        }
    }
    /// Adds the aggregate reported by `reporter`. Reports must be added in request order for
    /// the result to be deterministic.
    pub fn add(
        &mut self,
        reporter: &str,
        report: Replicasets,
    )
    {
        match (self.merged.state, report.state) {
            (_, State::Bootstrapped) => self.merged.state = State::Bootstrapped,
            (State::Bootstrapped, _) => {},
            (_, state) => self.merged.state = state,
        }

        for replicaset in report.replicasets {
            let position = self.merged.replicasets
                .iter()
                .position(|known| known.uuid == replicaset.uuid);
            match position {
                Some(position) => {
                    let known = &mut self.merged.replicasets[position];
                    merge_replicaset(known, replicaset, reporter, &mut self.reporters);
                },
                None => {
                    self.note_reporter(reporter, &replicaset);
                    self.merged.replicasets.push(replicaset);
                },
            }
        }
    }
    /// Finishes the fold: the master of every merged replicaset is derived from the collected
    /// member modes.
    pub fn finish(mut self) -> Replicasets {
        for replicaset in self.merged.replicasets.iter_mut() {
            replicaset.recalculate_master();
        }
        self.merged
    }
    fn note_reporter(
        &mut self,
        reporter: &str,
        replicaset: &Replicaset,
    )
    {
        let uuid = &replicaset.uuid;
        if !replicaset.leader_uuid.is_empty() {
            self.reporters.insert(format!("replicaset {} leader", uuid), reporter.to_string());
        }
        if !replicaset.alias.is_empty() {
            self.reporters.insert(format!("replicaset {} alias", uuid), reporter.to_string());
        }
        if replicaset.failover != Failover::Unknown {
            self.reporters.insert(format!("replicaset {} failover", uuid), reporter.to_string());
        }
        for instance in replicaset.instances.iter().filter(|instance| instance.mode != Mode::Unknown) {
            self.reporters.insert(format!("replicaset {} instance {} mode", uuid, instance.uuid), reporter.to_string());
        }
    }
}

fn merge_replicaset(
    known: &mut Replicaset,
    incoming: Replicaset,
    reporter: &str,
    reporters: &mut HashMap<String, String>,
)
{
    let uuid = known.uuid.clone();
    fill(&mut known.leader_uuid, incoming.leader_uuid, &String::new(), format!("replicaset {} leader", uuid), reporter, reporters);
    fill(&mut known.alias, incoming.alias, &String::new(), format!("replicaset {} alias", uuid), reporter, reporters);
    fill(&mut known.failover, incoming.failover, &Failover::Unknown, format!("replicaset {} failover", uuid), reporter, reporters);

    // members already present before this report; duplicates within the report itself are kept
    let known_members = known.instances.len();
    for instance in incoming.instances {
        let position = known.instances[..known_members]
            .iter()
            .position(|member| !member.uuid.is_empty() && member.uuid == instance.uuid);
        match position {
            Some(position) => {
                let member: &mut Instance = &mut known.instances[position];
                let key = format!("replicaset {} instance {} mode", uuid, member.uuid);
                fill(&mut member.alias, instance.alias, &String::new(), format!("replicaset {} instance {} alias", uuid, member.uuid), reporter, reporters);
                fill(&mut member.uri, instance.uri, &String::new(), format!("replicaset {} instance {} uri", uuid, member.uuid), reporter, reporters);
                fill(&mut member.mode, instance.mode, &Mode::Unknown, key, reporter, reporters);
            },
            None => {
                trace!("replicaset {}: instance {} first reported by {}", uuid, instance.uuid, reporter);
                if instance.mode != Mode::Unknown {
                    reporters.insert(format!("replicaset {} instance {} mode", uuid, instance.uuid), reporter.to_string());
                }
                known.instances.push(instance);
            },
        }
    }
}

// Fills an empty slot, or keeps the first value and logs when two reports disagree.
fn fill<T>(
    slot: &mut T,
    incoming: T,
    empty: &T,
    key: String,
    reporter: &str,
    reporters: &mut HashMap<String, String>,
)
where
    T: PartialEq + fmt::Display,
{
    if incoming == *empty {
        return;
    }
    if *slot == *empty {
        *slot = incoming;
        reporters.insert(key, reporter.to_string());
    } else if *slot != incoming {
        warn!("conflicting {}: keeping '{}' reported by {}, ignoring '{}' reported by {}",
            key,
            slot,
            reporters.get(&key).map(String::as_str).unwrap_or("unknown instance"),
            incoming,
            reporter,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(uuid: &str, mode: Mode) -> Instance {
        Instance {
            alias: format!("alias-{}", uuid),
            uuid: uuid.to_string(),
            uri: format!("{}:3301", uuid),
            mode,
        }
    }

    fn report(replicasets: Vec<Replicaset>) -> Replicasets {
        Replicasets {
            state: State::Bootstrapped,
            orchestrator: Orchestrator::CentralizedConfig,
            replicasets,
        }
    }

    #[test]
    fn unit_failover_from_name_is_exact() {
        assert_eq!(Failover::from_name("off"), Failover::Off);
        assert_eq!(Failover::from_name("manual"), Failover::Manual);
        assert_eq!(Failover::from_name("election"), Failover::Election);
        assert_eq!(Failover::from_name("supervised"), Failover::Supervised);
        assert_eq!(Failover::from_name(""), Failover::Unknown);
        assert_eq!(Failover::from_name("Off"), Failover::Unknown);
        assert_eq!(Failover::from_name("foo"), Failover::Unknown);
    }

    #[test]
    fn unit_recalculate_master() {
        let mut replicaset = Replicaset::default();
        replicaset.recalculate_master();
        assert_eq!(replicaset.master, Master::No);

        replicaset.instances = vec![instance("i1", Mode::RW), instance("i2", Mode::Read)];
        replicaset.recalculate_master();
        assert_eq!(replicaset.master, Master::Single);

        replicaset.instances.push(instance("i3", Mode::RW));
        replicaset.recalculate_master();
        assert_eq!(replicaset.master, Master::Multi);

        replicaset.instances.push(instance("i4", Mode::Unknown));
        replicaset.recalculate_master();
        assert_eq!(replicaset.master, Master::Unknown);
    }

    #[test]
    fn unit_recalculate_master_with_duplicated_member() {
        let mut replicaset = Replicaset {
            instances: vec![instance("i1", Mode::RW), instance("i1", Mode::RW)],
            ..Default::default()
        };
        replicaset.recalculate_master();
        assert_eq!(replicaset.master, Master::Unknown);

        replicaset.instances = vec![instance("i1", Mode::Read), instance("i1", Mode::Read)];
        replicaset.recalculate_master();
        assert_eq!(replicaset.master, Master::Unknown);
    }

    #[test]
    fn unit_merge_single_report_with_duplicates_stays_unknown() {
        let mut merger = ReplicasetsMerger::new(Orchestrator::CentralizedConfig);
        merger.add("app:i1", report(vec![Replicaset {
            uuid: "r1".to_string(),
            master: Master::Unknown,
            instances: vec![instance("i1", Mode::RW), instance("i1", Mode::RW)],
            ..Default::default()
        }]));
        assert_eq!(merger.finish().replicasets[0].master, Master::Unknown);
    }

    #[test]
    fn unit_merge_collects_modes_from_every_reporter() {
        let mut merger = ReplicasetsMerger::new(Orchestrator::CentralizedConfig);
        merger.add("app:i1", report(vec![Replicaset {
            uuid: "r1".to_string(),
            failover: Failover::Manual,
            master: Master::Unknown,
            instances: vec![instance("i1", Mode::RW), instance("i2", Mode::Unknown)],
            ..Default::default()
        }]));
        merger.add("app:i2", report(vec![Replicaset {
            uuid: "r1".to_string(),
            leader_uuid: "i1".to_string(),
            master: Master::Unknown,
            instances: vec![instance("i1", Mode::Unknown), instance("i2", Mode::Read)],
            ..Default::default()
        }]));
        let merged = merger.finish();

        assert_eq!(merged.state, State::Bootstrapped);
        assert_eq!(merged.replicasets.len(), 1);
        let replicaset = &merged.replicasets[0];
        assert_eq!(replicaset.leader_uuid, "i1");
        assert_eq!(replicaset.failover, Failover::Manual);
        assert_eq!(replicaset.master, Master::Single);
        assert_eq!(replicaset.instances, vec![instance("i1", Mode::RW), instance("i2", Mode::Read)]);
    }

    #[test]
    fn unit_merge_keeps_first_value_on_conflict() {
        let mut merger = ReplicasetsMerger::new(Orchestrator::CentralizedConfig);
        merger.add("app:i1", report(vec![Replicaset { uuid: "r1".to_string(), failover: Failover::Off, ..Default::default() }]));
        merger.add("app:i2", report(vec![Replicaset { uuid: "r1".to_string(), failover: Failover::Election, ..Default::default() }]));
        let merged = merger.finish();

        assert_eq!(merged.replicasets[0].failover, Failover::Off);
        assert_eq!(merged.replicasets[0].master, Master::No);
    }

    #[test]
    fn unit_merge_never_drops_a_replicaset() {
        let mut merger = ReplicasetsMerger::new(Orchestrator::CentralizedConfig);
        merger.add("app:a", report(vec![Replicaset { uuid: "r1".to_string(), ..Default::default() }]));
        merger.add("app:b", report(vec![Replicaset { uuid: "r2".to_string(), ..Default::default() }]));
        let merged = merger.finish();

        let uuids: Vec<&str> = merged.replicasets.iter().map(|replicaset| replicaset.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["r1", "r2"]);
    }

    #[test]
    fn unit_merge_keeps_duplicates_within_one_report() {
        let mut merger = ReplicasetsMerger::new(Orchestrator::CentralizedConfig);
        merger.add("app:a", report(vec![Replicaset { uuid: "r1".to_string(), ..Default::default() }]));
        merger.add("app:b", report(vec![Replicaset {
            uuid: "r1".to_string(),
            instances: vec![instance("i1", Mode::Unknown), instance("i1", Mode::Unknown)],
            ..Default::default()
        }]));
        let merged = merger.finish();

        assert_eq!(merged.replicasets[0].instances.len(), 2);
    }

    #[test]
    fn unit_merge_state() {
        let mut merger = ReplicasetsMerger::new(Orchestrator::CentralizedConfig);
        merger.add("app:a", Replicasets::new(State::NotBootstrapped, Orchestrator::CentralizedConfig));
        assert_eq!(merger.merged.state, State::NotBootstrapped);
        merger.add("app:b", report(Vec::new()));
        merger.add("app:c", Replicasets::new(State::NotBootstrapped, Orchestrator::CentralizedConfig));
        assert_eq!(merger.finish().state, State::Bootstrapped);
    }
}
