//! Utilities
use std::{collections::{BTreeMap, HashMap}, env, fs, path::{Path, PathBuf}, time::Duration};
use anyhow::{bail, Context, Result};
use log::*;
use regex::Regex;
use crate::evaler::{DEFAULT_PARALLEL, DEFAULT_TIMEOUT};

pub const ENV_PARALLEL: &str = "TT_REPLICASETS_PARALLEL";
pub const ENV_TIMEOUT: &str = "TT_REPLICASETS_TIMEOUT";

// The option set on the command line wins, then the environment (possibly set via .env),
// then the default.
fn resolve_option(
    option: &Option<String>,
    variable: &'static str,
    default: String,
    changed_options: &mut HashMap<&str, String>,
) -> String
{
    if let Some(value) = option {
        info!("{} set by argument: using: {}", variable, value);
        changed_options.insert(variable, value.to_string());
        return value.to_string();
    }
    match env::var(variable) {
        Ok(set_var) => {
            info!("{} not set by argument: set via environment: {}", variable, set_var);
            changed_options.insert(variable, set_var.to_owned());
            set_var
        },
        Err(_e) => {
            info!("{} not set by argument and not set via environment: using default: {}", variable, default);
            default
        },
    }
}

pub fn set_parallel(
    option: &Option<String>,
    changed_options: &mut HashMap<&str, String>,
) -> Result<usize>
{
    let parallel_string = resolve_option(option, ENV_PARALLEL, DEFAULT_PARALLEL.to_string(), changed_options);
    let parallel: usize = parallel_string.parse()
        .with_context(|| format!("Invalid parallel value: {}", parallel_string))?;
    if parallel == 0 {
        bail!("Invalid parallel value: {}: must be at least 1", parallel_string);
    }
    Ok(parallel)
}

/// Timeout in seconds, fractions allowed.
pub fn set_timeout(
    option: &Option<String>,
    changed_options: &mut HashMap<&str, String>,
) -> Result<Duration>
{
    let timeout_string = resolve_option(option, ENV_TIMEOUT, DEFAULT_TIMEOUT.as_secs_f64().to_string(), changed_options);
    let seconds: f64 = timeout_string.parse()
        .with_context(|| format!("Invalid timeout value: {}", timeout_string))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        bail!("Invalid timeout value: {}: must be a positive number of seconds", timeout_string);
    }
    Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("Invalid timeout value: {}: too large", timeout_string))
}

/// Splits an `APP:INSTANCE=PATH` target argument into the instance name and the path of its
/// captured reply.
pub fn parse_target(argument: &str) -> Result<(String, PathBuf)> {
    let regex = Regex::new(r"^(?P<name>[\w.-]+:[\w.-]+)=(?P<path>.+)$")?;
    match regex.captures(argument) {
        Some(captures) => Ok((captures["name"].to_string(), PathBuf::from(&captures["path"]))),
        None => bail!("Invalid target: {}: expected APP:INSTANCE=PATH", argument),
    }
}

/// Saves the options that were set by argument or environment to `path`, one `KEY=VALUE` line
/// each, sorted by key, so a later run picks them up through dotenv.
pub fn dotenv_writer(
    write_dotenv: bool,
    changed_options: HashMap<&str, String>,
    path: &Path,
) -> Result<()>
{
    if !write_dotenv || changed_options.is_empty() {
        return Ok(());
    }
    info!("writing settings to {}", path.display());
    let settings: BTreeMap<&str, String> = changed_options.into_iter().collect();
    let contents: String = settings.iter()
        .map(|(key, value)| format!("{}={}\n", key, value))
        .collect();
    fs::write(path, contents)
        .with_context(|| format!("Error writing settings file: {}", path.display()))?;
    for (key, value) in &settings {
        debug!("saved {}={}", key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_option_wins() {
        let mut changed_options = HashMap::new();
        assert_eq!(set_parallel(&Some("4".to_string()), &mut changed_options).unwrap(), 4);
        assert_eq!(set_timeout(&Some("0.5".to_string()), &mut changed_options).unwrap(), Duration::from_millis(500));
        assert_eq!(changed_options.get(ENV_PARALLEL).unwrap(), "4");
        assert_eq!(changed_options.get(ENV_TIMEOUT).unwrap(), "0.5");
    }

    #[test]
    fn unit_invalid_options() {
        let mut changed_options = HashMap::new();
        assert!(set_parallel(&Some("0".to_string()), &mut changed_options).is_err());
        assert!(set_parallel(&Some("many".to_string()), &mut changed_options).is_err());
        assert!(set_timeout(&Some("-1".to_string()), &mut changed_options).is_err());
        assert!(set_timeout(&Some("soon".to_string()), &mut changed_options).is_err());
        assert!(set_timeout(&Some("1e300".to_string()), &mut changed_options).is_err());
        assert!(set_timeout(&Some("inf".to_string()), &mut changed_options).is_err());
        assert!(set_timeout(&Some("1e19".to_string()), &mut changed_options).is_ok());
    }

    #[test]
    fn unit_dotenv_writer_sorts_keys() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(".env");
        let mut changed_options = HashMap::new();
        changed_options.insert(ENV_TIMEOUT, "0.5".to_string());
        changed_options.insert(ENV_PARALLEL, "4".to_string());

        dotenv_writer(true, changed_options, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "TT_REPLICASETS_PARALLEL=4\nTT_REPLICASETS_TIMEOUT=0.5\n",
        );
    }

    #[test]
    fn unit_dotenv_writer_only_when_asked() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(".env");
        let mut changed_options = HashMap::new();
        changed_options.insert(ENV_PARALLEL, "4".to_string());

        dotenv_writer(false, changed_options, &path).unwrap();
        dotenv_writer(true, HashMap::new(), &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn unit_parse_target() {
        let (name, path) = parse_target("app:storage-001=/tmp/storage-001.json").unwrap();
        assert_eq!(name, "app:storage-001");
        assert_eq!(path, PathBuf::from("/tmp/storage-001.json"));

        assert!(parse_target("storage-001=/tmp/storage-001.json").is_err());
        assert!(parse_target("app:storage-001").is_err());
    }
}
