use clap::Parser;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

#[derive(Debug, Default)]
struct FakeTerminalClient;

impl carmock::TerminalClient for FakeTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        false
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

async fn run_with_argv<const N: usize>(
    argv: [&str; N],
    output_format: carmock::OutputFormat,
) -> anyhow::Result<String> {
    let args = carmock::Args::try_parse_from(argv)?;
    let log_level = args.log_level();
    let mut output = Vec::new();
    carmock::run_with_clients(
        args.into_command(),
        &mut output,
        &FakeTerminalClient,
        log_level,
        output_format,
    )
    .await?;
    Ok(String::from_utf8(output)?)
}

#[tokio::test(start_paused = true)]
async fn replay_reports_frames_with_offsets_as_json() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        ["carmock", "replay", "--frame", "ATE0\\r"],
        carmock::OutputFormat::Json,
    )
    .await?;

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(2, lines.len());
    assert_snapshot!(lines[0], @r##"{"command":"ATE0\\r","sequence":"#1","notifications":[{"offset_ms":2000,"text":"ATE0\\r","bytes":"415445300D"},{"offset_ms":4000,"text":"OK\\r\\r>","bytes":"4F4B0D0D3E"}]}"##);
    assert_snapshot!(lines[1], @r#"{"commands":1,"notifications":2,"pending_value":"OK\\r\\r>","identity":""}"#);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn replay_reports_unknown_commands_and_fallback() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        [
            "carmock",
            "replay",
            "--interval",
            "500ms",
            "--frame",
            "FOO\\r",
            "P0301",
        ],
        carmock::OutputFormat::Json,
    )
    .await?;

    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!("unrecognised command `FOO\\r`", lines[0]["error"]);
    assert_eq!(serde_json::Value::Null, lines[0]["sequence"]);
    assert_eq!("?\\r\\r>", lines[0]["notifications"][0]["text"]);
    assert_eq!(500, lines[0]["notifications"][0]["offset_ms"]);
    assert_eq!("ATZ\\r", lines[1]["pending_value"]);
    assert_eq!("P0301", lines[1]["identity"]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn replay_accepts_hex_frames() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        [
            "carmock",
            "replay",
            "--hex",
            "--interval",
            "1s",
            "--frame",
            "30 31 30 30 0D",
        ],
        carmock::OutputFormat::Pretty,
    )
    .await?;

    assert!(stdout.starts_with("[0001] 0100\\r sequence #1\n"));
    assert!(stdout.contains("  +1s 4100BEEA813\\r raw=34 31 30 30 42 45 45 41 38 31 33 0D\n"));
    assert!(stdout.contains("  +2s \\r> raw=0D 3E\n"));
    assert!(stdout.contains("Session:"));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn replay_rejects_invalid_frame_literal() {
    let result = run_with_argv(
        ["carmock", "replay", "--frame", "ATZ\\q"],
        carmock::OutputFormat::Json,
    )
    .await;

    let error = result.expect_err("unsupported escape should fail");
    assert!(error.to_string().contains("unsupported escape sequence"));
}

#[tokio::test]
async fn commands_lists_table_in_order_as_json() -> anyhow::Result<()> {
    let stdout = run_with_argv(
        ["carmock", "commands", "P0301"],
        carmock::OutputFormat::Json,
    )
    .await?;

    let commands: Vec<String> = stdout
        .lines()
        .map(|line| {
            let record: serde_json::Value = serde_json::from_str(line)?;
            Ok(record["command"].as_str().unwrap_or_default().to_string())
        })
        .collect::<anyhow::Result<_>>()?;
    assert_eq!("ATZ\\rATE0\\r\\r\\r\\r\\r\\r\\r\\r\\r", commands[0]);
    assert_eq!("\\r\\r", commands[1]);
    assert_eq!("ATE0\\r", commands[2]);
    assert_eq!(Some(&"0902\\r".to_string()), commands.last());

    let stored_codes = stdout
        .lines()
        .find(|line| line.contains(r#""command":"03\\r""#))
        .expect("mode 03 entry should be listed");
    assert_snapshot!(stored_codes, @r#"{"command":"03\\r","frames":["43010301\\r\\r>"]}"#);

    Ok(())
}

#[tokio::test]
async fn commands_pretty_output_mentions_fallback() -> anyhow::Result<()> {
    let stdout = run_with_argv(["carmock", "commands"], carmock::OutputFormat::Pretty).await?;

    assert!(stdout.starts_with("Command table:"));
    assert!(stdout.contains("0902\\r"));
    assert!(stdout.trim_end().ends_with("unknown commands: ?\\r\\r>"));

    Ok(())
}
