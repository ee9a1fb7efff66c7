//! `wirecheck run` end to end: manifest on disk, target on a local socket, exit code out.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use wirecheck::cli::commands::run_manifest;
use wirecheck::cli::{ExitCode, RunArgs};

fn run_args(manifest: PathBuf, port: u16) -> RunArgs {
    RunArgs {
        manifest,
        host: Some("127.0.0.1".to_string()),
        port: Some(port),
        timeout: Some(5),
        delimiter: None,
        quit_command: None,
        max_frame_len: None,
        filter: None,
        no_color: true,
    }
}

/// Accept one connection, answer `Success` to every command except `fail`, and return what was received.
async fn serve_once(listener: TcpListener) -> Vec<String> {
    let (stream, _) = listener.accept().await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut received = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        let reply: &[u8] = match line.as_str() {
            "quit" => b"",
            "fail" => b"{\"type\":\"Error\",\"err\":\"failed on purpose\",\"data\":null}\n",
            _ => b"{\"type\":\"Info\",\"data\":\"working\"}\n{\"type\":\"Success\"}\n",
        };
        let quit = line == "quit";
        received.push(line);
        if quit {
            break;
        }
        write.write_all(reply).await.unwrap();
    }
    received
}

fn write_manifest(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("suites.toml");
    std::fs::write(&path, body).unwrap();
    path
}

const MANIFEST: &str = r#"
[[suite]]
namespace = "Tests"
tests = [
    { name = "Test_1", command = "shadok" },
    { name = "Test_2", command = "cmd_test" },
]

[[suite]]
namespace = "Tests 2"
tests = [
    { name = "Test_1", command = "fail" },
    { name = "Test_2", command = "ultimate_answer" },
]
"#;

#[tokio::test]
async fn failing_run_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let target = tokio::spawn(serve_once(listener));

    let code = run_manifest(&run_args(manifest, port)).await.unwrap();

    assert_eq!(code, ExitCode::FAILURE);
    assert_eq!(target.await.unwrap(), ["shadok", "cmd_test", "fail", "quit"]);
}

#[tokio::test]
async fn filtered_run_exits_with_success() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let target = tokio::spawn(serve_once(listener));

    let args = RunArgs {
        filter: Some("Test_2".to_string()),
        ..run_args(manifest, port)
    };
    let code = run_manifest(&args).await.unwrap();

    assert_eq!(code, ExitCode::SUCCESS);
    assert_eq!(target.await.unwrap(), ["cmd_test", "ultimate_answer"]);
}

#[tokio::test]
async fn unreachable_target_is_a_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = run_manifest(&run_args(manifest, port)).await.unwrap_err();
    assert_eq!(err.exit_code, ExitCode::ERROR);
    assert!(err.message.contains(&format!("127.0.0.1:{port}")));
}

#[tokio::test]
async fn invalid_manifest_is_a_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, "[[suite]]\nnamespace = \"Empty\"\n");

    let err = run_manifest(&run_args(manifest, 4444)).await.unwrap_err();
    assert_eq!(err.exit_code, ExitCode::ERROR);
    assert!(err.message.contains("suite \"Empty\" has no tests"));
}

#[tokio::test]
async fn filter_matching_nothing_is_a_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);

    let args = RunArgs {
        filter: Some("nope".to_string()),
        ..run_args(manifest, 4444)
    };
    let err = run_manifest(&args).await.unwrap_err();
    assert_eq!(err.exit_code, ExitCode::ERROR);
}
