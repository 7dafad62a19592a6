mod common;
use crate::common::{Sandbox, init_tracing};

use clap::Parser;

use slurmbench::cli::CliArgs;
use slurmbench::errors::BenchError;

const SETTINGS: &str = r#"
[scheduler]
poll_interval = "1s"

[topic.assembly]
cmd = "asm"

[topic.plasmidness]
cmd = "plm"

[tool.unicycler]
topic = "assembly"
provides = ["fasta_gz", "gfa_gz"]
command = "unicycler -o \"$WORK_EXP_SAMPLE_DIR\""

[tool.skesa]
topic = "assembly"
provides = ["fasta_gz"]
command = "skesa"

[tool.plasbin]
topic = "plasmidness"
command = "plasbin --graph \"$GRAPH\""

[tool.plasbin.arguments.graph]
topic = "assembly"
result = "gfa_gz"

[tool.plasbin.arguments.fasta]
topic = "assembly"
result = "fasta_gz"
"#;

fn args(sandbox: &Sandbox, rest: &[&str]) -> CliArgs {
    let settings = sandbox.configs.join("slurmbench.toml");
    std::fs::write(&settings, SETTINGS).unwrap();
    let mut argv = vec!["slurmbench".to_string(), "--settings".to_string()];
    argv.push(settings.to_string_lossy().into_owned());
    argv.extend(rest.iter().map(|s| s.to_string()));
    CliArgs::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn draft_config_lists_the_tools_able_to_feed_each_argument() {
    init_tracing();
    let sandbox = Sandbox::new();
    let output = sandbox.configs.join("plb.yaml");
    let output_arg = output.to_string_lossy().into_owned();

    slurmbench::run(args(&sandbox, &["draft-config", "plasbin", "plb", &output_arg]))
        .await
        .unwrap();

    let draft = std::fs::read_to_string(&output).unwrap();
    assert!(draft.starts_with("name: plb\n"));
    assert!(draft.contains("    graph: [unicycler, $input_experiment_name]\n"));
    assert!(draft.contains("    fasta: [skesa | unicycler, $input_experiment_name]\n"));
    assert!(draft.ends_with("  options: []\nslurm: []\n"));
}

#[tokio::test]
async fn status_reads_the_data_side() {
    init_tracing();
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.data_root.join("samples.tsv"), "species_id\tsample_id\nsp1\ts1\n").unwrap();
    let data = sandbox.data_root.to_string_lossy().into_owned();

    slurmbench::run(args(&sandbox, &["status", "asm", &data, "asm"]))
        .await
        .unwrap_err();
    // "asm" is a topic cmd, not a tool; the tool is looked up by its own cmd.
    slurmbench::run(args(&sandbox, &["status", "unicycler", &data, "asm"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_tool_is_reported() {
    init_tracing();
    let sandbox = Sandbox::new();
    let err = slurmbench::run(args(&sandbox, &["draft-config", "megahit", "x", "x.yaml"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BenchError>(),
        Some(BenchError::ToolNotFound(tool)) if tool == "megahit"
    ));
}
