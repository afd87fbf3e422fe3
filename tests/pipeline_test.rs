//! End-to-end pipeline tests with a scripted explorer and fake external tools.

use contract_sentinel::fetcher::{
    ExplorerClient, ExplorerResponse, ExplorerResult, FetchError, SourceEntry, SourceFetcher,
};
use contract_sentinel::project::ProjectLayout;
use contract_sentinel::runner::{CommandOutput, CommandRunner, CommandSpec, NoProgress};
use contract_sentinel::{Pipeline, PipelineError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const VAULT_PAYLOAD: &str = include_str!("fixtures/vault_standard_json.txt");

/// Explorer returning scripted replies per address.
#[derive(Clone, Default)]
struct ScriptedExplorer {
    replies: Arc<Mutex<HashMap<String, Vec<Result<ExplorerResponse, FetchError>>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExplorer {
    fn script(&self, address: &str, replies: Vec<Result<ExplorerResponse, FetchError>>) {
        self.replies.lock().unwrap().insert(address.to_string(), replies);
    }

    fn calls_for(&self, address: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|a| *a == address).count()
    }
}

impl ExplorerClient for ScriptedExplorer {
    fn get_source_code(&self, address: &str) -> Result<ExplorerResponse, FetchError> {
        self.calls.lock().unwrap().push(address.to_string());
        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(address) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => Err(FetchError::Status(404)),
        }
    }
}

/// Stands in for both `solc-select` and `slither`.
#[derive(Clone, Default)]
struct FakeTools {
    installed: Vec<String>,
    fail_files: Vec<String>,
    fail_install: bool,
    log: Arc<Mutex<Vec<CommandSpec>>>,
    running_analyses: Arc<AtomicUsize>,
    switched_mid_analysis: Arc<AtomicBool>,
}

impl FakeTools {
    fn slither_calls(&self) -> Vec<CommandSpec> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program == "slither")
            .cloned()
            .collect()
    }

    fn manager_calls(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program == "solc-select")
            .map(|c| c.args.join(" "))
            .collect()
    }
}

impl CommandRunner for FakeTools {
    fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        self.log.lock().unwrap().push(command.clone());

        match command.program.as_str() {
            "solc-select" => match command.args.first().map(String::as_str) {
                Some("versions") => Ok(CommandOutput::ok(self.installed.join("\n"))),
                Some("install") if self.fail_install => {
                    Ok(CommandOutput::failed(1, "Unknown version"))
                }
                Some("use") => {
                    if self.running_analyses.load(Ordering::SeqCst) > 0 {
                        self.switched_mid_analysis.store(true, Ordering::SeqCst);
                    }
                    Ok(CommandOutput::ok(""))
                }
                _ => Ok(CommandOutput::ok("")),
            },
            "slither" => {
                let target = &command.args[0];
                if self.fail_files.iter().any(|f| target.ends_with(f.as_str())) {
                    return Err(std::io::Error::new(std::io::ErrorKind::Other, "crashed"));
                }
                self.running_analyses.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(2));
                self.running_analyses.fetch_sub(1, Ordering::SeqCst);
                let name = target.rsplit('/').next().unwrap_or(target);
                Ok(CommandOutput::failed(255, format!("INFO:Detectors: {}", name)))
            }
            other => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", other),
            )),
        }
    }
}

fn entry(source_code: &str, compiler_version: &str) -> ExplorerResponse {
    ExplorerResponse::success(SourceEntry {
        source_code: source_code.to_string(),
        compiler_version: compiler_version.to_string(),
        contract_name: "Vault".to_string(),
    })
}

fn pipeline(temp: &TempDir, explorer: &ScriptedExplorer, tools: &FakeTools) -> Pipeline {
    Pipeline::new(
        SourceFetcher::new(Box::new(explorer.clone())),
        ProjectLayout::new(temp.path().join("tmp/contracts")),
        Box::new(tools.clone()),
    )
}

#[test]
fn test_multi_file_contract_end_to_end() {
    let temp = TempDir::new().unwrap();
    let explorer = ScriptedExplorer::default();
    explorer.script("0xvault", vec![Ok(entry(VAULT_PAYLOAD, "v0.8.24+commit.e11b9ed9"))]);
    let tools = FakeTools::default();

    let run = pipeline(&temp, &explorer, &tools)
        .execute("0xvault", &NoProgress)
        .unwrap();

    // Pragmas agree on ^0.8.20, so the explorer string is not needed.
    assert_eq!(run.compiler_version, "0.8.20");
    assert_eq!(
        tools.manager_calls(),
        vec!["versions", "install 0.8.20", "use 0.8.20"]
    );

    assert_eq!(
        run.result.slither_results(),
        concat!(
            "INFO:Detectors: Vault.sol\n",
            "INFO:Detectors: SafeMath.sol\n",
            "INFO:Detectors: Ownable.sol\n",
            "INFO:Detectors: Context.sol\n",
        )
    );
    let contents: Vec<&str> = run.sources.iter().map(|(_, f)| f.content.as_str()).collect();
    assert_eq!(run.result.combined_source_code(), contents.join("\n"));

    let ownable = run
        .project
        .dependency_root
        .join("@openzeppelin/contracts/access/Ownable.sol");
    assert!(ownable.is_file());
    assert_eq!(
        run.project.path_of("@openzeppelin/contracts/access/Ownable.sol"),
        Some(ownable.as_path())
    );

    let expected_remap = format!(
        "@openzeppelin={}",
        run.project.dependency_root.join("@openzeppelin").display()
    );
    assert_eq!(
        run.remaps.get("@openzeppelin").map(|r| r.to_string()),
        Some(expected_remap.clone())
    );

    let slither = tools.slither_calls();
    assert_eq!(slither.len(), 4);
    for call in &slither {
        let remap_arg = call
            .args
            .iter()
            .position(|a| a == "--solc-remaps")
            .map(|i| call.args[i + 1].clone())
            .unwrap();
        assert!(remap_arg.starts_with(&expected_remap));
        assert!(remap_arg.contains("forge-std/="));
        assert!(call.args.last().unwrap().starts_with("--solc-args=--allow-paths .,"));
    }
}

#[test]
fn test_single_retry_is_transparent() {
    let direct_dir = TempDir::new().unwrap();
    let retry_dir = TempDir::new().unwrap();
    let explorer = ScriptedExplorer::default();
    explorer.script("0xdirect", vec![Ok(entry(VAULT_PAYLOAD, "v0.8.24"))]);
    explorer.script(
        "0xretry",
        vec![Err(FetchError::Status(502)), Ok(entry(VAULT_PAYLOAD, "v0.8.24"))],
    );
    let tools = FakeTools {
        installed: vec!["0.8.20".to_string()],
        ..Default::default()
    };

    let direct = pipeline(&direct_dir, &explorer, &tools)
        .try_analyze("0xdirect")
        .unwrap();
    let retried = pipeline(&retry_dir, &explorer, &tools)
        .try_analyze("0xretry")
        .unwrap();

    assert_eq!(direct, retried);
    assert_eq!(explorer.calls_for("0xdirect"), 1);
    assert_eq!(explorer.calls_for("0xretry"), 2);
}

#[test]
fn test_double_502_aborts_before_staging() {
    let temp = TempDir::new().unwrap();
    let explorer = ScriptedExplorer::default();
    explorer.script(
        "0xdown",
        vec![
            Err(FetchError::Status(502)),
            Err(FetchError::Status(502)),
            Ok(entry(VAULT_PAYLOAD, "v0.8.24")),
        ],
    );
    let tools = FakeTools::default();
    let pipeline = pipeline(&temp, &explorer, &tools);

    let err = pipeline.try_analyze("0xdown").unwrap_err();

    assert!(matches!(err, PipelineError::TransientFetchFailure { .. }));
    assert_eq!(explorer.calls_for("0xdown"), 2);
    assert!(!temp.path().join("tmp/contracts").exists());
    assert!(tools.manager_calls().is_empty());
}

#[test]
fn test_failed_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    let explorer = ScriptedExplorer::default();
    let payload = r#"{
        "A.sol": {"content": "contract A {}"},
        "B.sol": {"content": "contract B {}"},
        "C.sol": {"content": "contract C {}"}
    }"#;
    explorer.script("0xabc", vec![Ok(entry(payload, "v0.8.19+commit.7dd6d404"))]);
    let tools = FakeTools {
        fail_files: vec!["B.sol".to_string()],
        ..Default::default()
    };

    let result = pipeline(&temp, &explorer, &tools).analyze("0xabc").unwrap();

    assert_eq!(
        result.slither_results(),
        "INFO:Detectors: A.sol\nINFO:Detectors: C.sol\n"
    );
    assert_eq!(
        result.combined_source_code(),
        "contract A {}\ncontract B {}\ncontract C {}"
    );
    assert_eq!(tools.slither_calls().len(), 3);
    assert_eq!(tools.manager_calls(), vec!["versions", "install 0.8.19", "use 0.8.19"]);
}

#[test]
fn test_successive_runs_do_not_leak_files() {
    let temp = TempDir::new().unwrap();
    let explorer = ScriptedExplorer::default();
    explorer.script("0xfirst", vec![Ok(entry(VAULT_PAYLOAD, "v0.8.24"))]);
    explorer.script(
        "0xsecond",
        vec![Ok(entry("pragma solidity 0.6.12;\ncontract Token {}\n", "v0.6.12"))],
    );
    let tools = FakeTools::default();
    let pipeline = pipeline(&temp, &explorer, &tools);

    pipeline.execute("0xfirst", &NoProgress).unwrap();
    let second = pipeline.execute("0xsecond", &NoProgress).unwrap();

    let on_disk = second.project.files_on_disk();
    assert_eq!(on_disk, vec![second.project.staging_root.join("Vault.sol")]);
    assert!(second.project.libraries.is_empty());
    assert!(second.remaps.is_empty());
}

#[test]
fn test_fatal_errors_return_none() {
    let temp = TempDir::new().unwrap();
    let explorer = ScriptedExplorer::default();
    explorer.script(
        "0xunverified",
        vec![Ok(ExplorerResponse {
            status: "1".to_string(),
            message: "OK".to_string(),
            result: ExplorerResult::Entries(vec![SourceEntry::default()]),
        })],
    );
    explorer.script("0xbroken", vec![Ok(entry("{{\"sources\": {\"A.sol\": }}", "v0.8.24"))]);
    explorer.script(
        "0xnoversion",
        vec![
            Ok(entry("contract A {}", "unknown")),
            Ok(entry("contract A {}", "unknown")),
        ],
    );
    let tools = FakeTools::default();
    let pipeline = pipeline(&temp, &explorer, &tools);

    assert!(matches!(
        pipeline.try_analyze("0xunverified"),
        Err(PipelineError::SourceUnavailable { .. })
    ));
    assert!(matches!(
        pipeline.try_analyze("0xbroken"),
        Err(PipelineError::MalformedSourceMap(_))
    ));
    assert!(matches!(
        pipeline.try_analyze("0xnoversion"),
        Err(PipelineError::VersionUnresolvable { .. })
    ));
    assert!(pipeline.analyze("0xnoversion").is_none());
    assert!(tools.slither_calls().is_empty());
}

#[test]
fn test_toolchain_failure_stops_before_analysis() {
    let temp = TempDir::new().unwrap();
    let explorer = ScriptedExplorer::default();
    explorer.script("0xvault", vec![Ok(entry(VAULT_PAYLOAD, "v0.8.24"))]);
    let tools = FakeTools {
        fail_install: true,
        ..Default::default()
    };

    let err = pipeline(&temp, &explorer, &tools).try_analyze("0xvault").unwrap_err();

    match err {
        PipelineError::ToolchainSwitchFailure { message, .. } => {
            assert!(message.contains("Unknown version"))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(tools.slither_calls().is_empty());
}

#[test]
fn test_stage_only_leaves_toolchain_alone() {
    let temp = TempDir::new().unwrap();
    let explorer = ScriptedExplorer::default();
    explorer.script("0xvault", vec![Ok(entry(VAULT_PAYLOAD, "v0.8.24"))]);
    let tools = FakeTools::default();

    let staged = pipeline(&temp, &explorer, &tools).stage("0xvault").unwrap();

    assert_eq!(staged.project.files.len(), 4);
    assert_eq!(staged.project.libraries, vec!["@openzeppelin"]);
    assert!(tools.manager_calls().is_empty());
    assert!(tools.slither_calls().is_empty());
}

#[test]
fn test_concurrent_runs_never_switch_compiler_mid_analysis() {
    let explorer = ScriptedExplorer::default();
    explorer.script("0xvault", vec![Ok(entry(VAULT_PAYLOAD, "v0.8.24"))]);
    explorer.script(
        "0xtoken",
        vec![Ok(entry("pragma solidity 0.6.12;\ncontract Token {}\n", "v0.6.12"))],
    );
    let tools = FakeTools::default();
    let vault_dir = TempDir::new().unwrap();
    let token_dir = TempDir::new().unwrap();

    let (vault, token) = std::thread::scope(|scope| {
        let vault = scope.spawn(|| pipeline(&vault_dir, &explorer, &tools).try_analyze("0xvault"));
        let token = scope.spawn(|| pipeline(&token_dir, &explorer, &tools).try_analyze("0xtoken"));
        (vault.join().unwrap(), token.join().unwrap())
    });

    assert!(vault.is_ok());
    assert!(token.is_ok());
    assert_eq!(tools.slither_calls().len(), 5);
    assert!(!tools.switched_mid_analysis.load(Ordering::SeqCst));

    // Each run's `use` is immediately followed by its own analyzer calls.
    let programs: Vec<String> = tools
        .log
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.program == "slither" || c.args.first().map(String::as_str) == Some("use"))
        .map(|c| c.args.join(" "))
        .collect();
    let first_use = programs.iter().position(|p| p.starts_with("use")).unwrap();
    let second_use = programs.iter().rposition(|p| p.starts_with("use")).unwrap();
    let first_batch = second_use - first_use - 1;
    assert!(first_batch == 4 || first_batch == 1);
    assert_eq!(programs.len() - second_use - 1, 5 - first_batch);
}
