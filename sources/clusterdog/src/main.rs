/*!
clusterdog computes the cluster-level configuration documents a node should converge to, from
the node's resolved attributes (a JSON file shaped like `{"patroni": {...}, "praefect": {...},
"postgresql": {...}}`).  Attributes the file leaves out are taken from the built-in defaults.

Subcommands:

`praefect-topology`: normalize `praefect.virtual_storages` into the shape the Praefect config
template consumes.  Deprecated settings are reported in the log; malformed or duplicate entries
are an error.

`patroni-dcs`: build the dynamic configuration Patroni keeps in its DCS.  Requires
`patroni.enable`.

The document is printed as JSON to stdout, or written to the path given with `--output`.
*/

#[macro_use]
extern crate log;

mod attributes;

use argh::FromArgs;
use attributes::NodeAttributes;
use serde_json::Value;
use simplelog::{ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode};
use snafu::{ensure, ResultExt};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

/// Default location of the node's resolved attributes
const DEFAULT_ATTRIBUTES_PATH: &str = "/etc/clusterdog/node.json";

/// Stores arguments
#[derive(FromArgs, PartialEq, Debug)]
struct Args {
    /// log-level trace|debug|info|warn|error
    #[argh(option)]
    log_level: Option<LevelFilter>,
    /// path to the node attributes JSON file
    #[argh(
        option,
        default = "DEFAULT_ATTRIBUTES_PATH.to_string()",
        short = 'a'
    )]
    attributes: String,
    /// write the document to this file instead of stdout
    #[argh(option, short = 'o')]
    output: Option<String>,
    #[argh(subcommand)]
    subcommand: Subcommand,
}

/// Stores the subcommand to be executed
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand)]
enum Subcommand {
    PraefectTopology(PraefectTopologyArgs),
    PatroniDcs(PatroniDcsArgs),
}

/// Normalizes the Praefect virtual storage topology
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "praefect-topology")]
struct PraefectTopologyArgs {}

/// Builds the Patroni DCS configuration
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "patroni-dcs")]
struct PatroniDcsArgs {}

/// Normalizes the node's virtual storages, logging any notices along the way.
fn normalize_topology(attributes: &NodeAttributes) -> Result<Value> {
    let praefect = &attributes.praefect;
    if let Some(notice) = praefect.election_strategy_notice() {
        log!(notice.level(), "{}", notice);
    }

    let normalized = praefect
        .normalize_virtual_storages()
        .context(error::TopologySnafu)?;
    for notice in &normalized.notices {
        log!(notice.level(), "{}", notice);
    }
    info!(
        "Normalized {} Praefect virtual storage(s)",
        normalized.topology.len()
    );

    serde_json::to_value(&normalized.topology).context(error::SerializeSnafu)
}

/// Builds the DCS document for the node's Patroni settings.
fn build_dcs(attributes: NodeAttributes) -> Result<Value> {
    let NodeAttributes {
        mut patroni,
        postgresql,
        ..
    } = attributes;
    ensure!(patroni.enable, error::PatroniDisabledSnafu);

    patroni_dcs::resolve_parameters(&mut patroni, &postgresql);
    let dcs = patroni_dcs::build(&patroni);
    debug!(
        "Built DCS config with {} parameter(s) and {} slot(s)",
        dcs.postgresql.parameters.len(),
        dcs.slots.len()
    );

    serde_json::to_value(&dcs).context(error::SerializeSnafu)
}

/// Write the document as pretty JSON, to the given path or, without one, to `stdout`.
fn write_document<W: Write>(document: &Value, output: Option<&str>, mut stdout: W) -> Result<()> {
    let mut rendered = serde_json::to_string_pretty(document).context(error::SerializeSnafu)?;
    rendered.push('\n');

    match output {
        Some(path) => {
            let path = Path::new(path);
            fs::write(path, rendered).context(error::WriteOutputSnafu { path })?;
            info!("Wrote {}", path.display());
        }
        None => {
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|()| stdout.flush())
                .context(error::WriteStdoutSnafu)?;
        }
    }
    Ok(())
}

fn setup_logger(args: &Args) -> Result<()> {
    let log_level = args.log_level.unwrap_or(LevelFilter::Info);
    // TerminalMode::Stderr will send all logs to stderr, stdout only carries the document.
    TermLogger::init(
        log_level,
        LogConfig::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context(error::LoggerSnafu)
}

fn run() -> Result<()> {
    let args: Args = argh::from_env();
    setup_logger(&args)?;

    let attributes = attributes::from_path(&args.attributes)?;
    let document = match args.subcommand {
        Subcommand::PraefectTopology(_) => normalize_topology(&attributes)?,
        Subcommand::PatroniDcs(_) => build_dcs(attributes)?,
    };

    write_document(&document, args.output.as_deref(), io::stdout().lock())
}

// Returning a Result from main makes it print a Debug representation of the error, but with Snafu
// we have nice Display representations of the error, so we wrap "main" (run) and print any error.
// https://github.com/shepmaster/snafu/issues/110
fn main() {
    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}

/// ＜コ：ミ くコ:彡 ＜コ：ミ くコ:彡 ＜コ：ミ くコ:彡 ＜コ：ミ くコ:彡 ＜コ：ミ くコ:彡 ＜コ：ミ くコ:彡
mod error {
    use snafu::Snafu;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("Cannot merge mismatched data types at attribute '{}'", key))]
        DataTypeMismatch { key: String },

        #[snafu(display("Failed to convert default attributes to JSON: {}", source))]
        ConvertDefaults { source: serde_json::Error },

        #[snafu(display("Failed to deserialize node attributes: {}", source))]
        DeserializeAttributes { source: serde_json::Error },

        #[snafu(display("Failed to setup logger: {}", source))]
        Logger { source: log::SetLoggerError },

        #[snafu(display("Failed to parse node attributes '{}': {}", path.display(), source))]
        ParseAttributes {
            path: PathBuf,
            source: serde_json::Error,
        },

        #[snafu(display("Failed to parse default attributes: {}", source))]
        ParseDefaults { source: toml::de::Error },

        #[snafu(display("Patroni is not enabled, refusing to build its DCS config"))]
        PatroniDisabled,

        #[snafu(display("Failed to read node attributes '{}': {}", path.display(), source))]
        ReadAttributes {
            path: PathBuf,
            source: std::io::Error,
        },

        #[snafu(display("Failed to serialize document: {}", source))]
        Serialize { source: serde_json::Error },

        #[snafu(display("Invalid Praefect topology: {}", source))]
        Topology { source: praefect_topology::Error },

        #[snafu(display("Failed to write '{}': {}", path.display(), source))]
        WriteOutput {
            path: PathBuf,
            source: std::io::Error,
        },

        #[snafu(display("Failed to write document to stdout: {}", source))]
        WriteStdout { source: std::io::Error },
    }
}

type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::*;
    use maplit::hashset;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn test_data() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_data")
    }

    fn read_json(name: &str) -> Value {
        let contents = fs::read_to_string(test_data().join(name)).unwrap();
        serde_json::from_str(&contents).unwrap()
    }

    fn node() -> NodeAttributes {
        attributes::from_path(test_data().join("node.json")).unwrap()
    }

    #[test]
    fn praefect_topology_matches_expected() {
        let topology = normalize_topology(&node()).unwrap();
        assert_eq!(topology, read_json("expected-topology.json"));
    }

    #[test]
    fn praefect_topology_keeps_declaration_order() {
        let topology = normalize_topology(&node()).unwrap();
        let names: Vec<&String> = topology.as_object().unwrap().keys().collect();
        assert_eq!(names, vec!["default", "storage-b"]);
    }

    #[test]
    fn praefect_topology_unconfigured() {
        let attributes = attributes::with_defaults(&serde_json::json!({})).unwrap();
        assert_eq!(
            normalize_topology(&attributes).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn praefect_topology_duplicate() {
        let attributes = attributes::from_path(test_data().join("node-duplicate.json")).unwrap();
        let err = normalize_topology(&attributes).unwrap_err();
        assert!(matches!(err, error::Error::Topology { .. }));
        assert!(err.to_string().contains("gitaly-1"));
    }

    #[test]
    fn patroni_dcs_matches_expected() {
        let dcs = build_dcs(node()).unwrap();
        assert_eq!(dcs, read_json("expected-dcs.json"));
    }

    #[test]
    fn patroni_dcs_slots() {
        let dcs = build_dcs(node()).unwrap();
        let slots: HashSet<&str> = dcs["slots"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(slots, hashset! {"geo_secondary"});
    }

    #[test]
    fn patroni_dcs_disabled() {
        let attributes = attributes::with_defaults(&serde_json::json!({})).unwrap();
        assert!(matches!(
            build_dcs(attributes),
            Err(error::Error::PatroniDisabled)
        ));
    }

    #[test]
    fn missing_attributes_file() {
        let err = attributes::from_path(test_data().join("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, error::Error::ReadAttributes { .. }));
    }

    #[test]
    fn write_document_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dcs.json");
        let document = serde_json::json!({"ttl": 30});
        let mut stdout = Vec::new();
        write_document(&document, path.to_str(), &mut stdout).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        assert_eq!(serde_json::from_str::<Value>(&written).unwrap(), document);
        assert!(stdout.is_empty());
    }

    #[test]
    fn write_document_to_stdout() {
        let document = build_dcs(node()).unwrap();
        let mut stdout = Vec::new();
        write_document(&document, None, &mut stdout).unwrap();

        let written = String::from_utf8(stdout).unwrap();
        assert!(written.ends_with('\n'));
        assert_eq!(serde_json::from_str::<Value>(&written).unwrap(), document);
    }

    #[test]
    fn patroni_dcs_null_parameters() {
        let attributes = attributes::with_defaults(&serde_json::json!({
            "patroni": {"enable": true, "postgresql": null},
            "postgresql": null,
        }))
        .unwrap();
        let dcs = build_dcs(attributes).unwrap();
        assert_eq!(dcs["ttl"], serde_json::json!(30));
        assert!(dcs["postgresql"]["parameters"].as_object().unwrap().is_empty());
    }
}
