use anyhow::{anyhow, bail};
use clap::{ArgGroup, Parser};
use platform::wire::AddFaultRequest;
use serde_json::Value;
use support::{duration::parse_duration_string, net::parse_hostport};
use trogdor_client as client;

/// A client for the trogdor agent process.
#[derive(Parser, Debug)]
#[command(name = "trogdor", author, version, about)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["status", "faults", "add_fault", "shutdown"]),
))]
struct Args {
    /// The hostname and port of the trogdor agent, for example
    /// example.com:8888.
    #[arg(long)]
    agent: String,

    /// Get the agent status.
    #[arg(long)]
    status: bool,

    /// Get the list of faults.
    #[arg(long)]
    faults: bool,

    /// Add a new fault.
    #[arg(long)]
    add_fault: bool,

    /// Shut down the agent.
    #[arg(long)]
    shutdown: bool,

    /// A name for the new fault.
    #[arg(long)]
    fault_name: Option<String>,

    /// The specification for the new fault, as JSON.
    #[arg(long)]
    fault_spec: Option<String>,

    /// The start time for the new fault in ms since the epoch.
    #[arg(long, conflicts_with = "fault_start_time_delta")]
    fault_start_time_ms: Option<i64>,

    /// The delta between now and the start time for the new fault, e.g.
    /// 1h30m.
    #[arg(long)]
    fault_start_time_delta: Option<String>,

    /// The end time for the new fault in ms since the epoch.
    #[arg(long, conflicts_with = "fault_duration")]
    fault_end_time_ms: Option<i64>,

    /// The duration for the new fault, e.g. 15s.
    #[arg(long)]
    fault_duration: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (hostname, port) = parse_hostport(&args.agent)?;
    let output: Value = if args.status {
        serde_json::to_value(client::get_agent_status(&hostname, port).await?)?
    } else if args.faults {
        serde_json::to_value(client::get_agent_faults(&hostname, port).await?)?
    } else if args.add_fault {
        let request = build_add_fault_request(&args)?;
        client::add_agent_fault(&hostname, port, &request).await?
    } else {
        client::shutdown_agent(&hostname, port).await?
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn build_add_fault_request(args: &Args) -> anyhow::Result<AddFaultRequest> {
    let spec_text = args
        .fault_spec
        .as_ref()
        .ok_or_else(|| anyhow!("you must supply a fault specification using --fault-spec"))?;
    let spec: Value = serde_json::from_str(spec_text)?;
    let mut request = AddFaultRequest {
        name: args.fault_name.clone(),
        spec: Some(spec),
        ..AddFaultRequest::default()
    };
    match (args.fault_start_time_ms, &args.fault_start_time_delta) {
        (Some(start_ms), None) => request.start_time_ms = Some(start_ms),
        (None, Some(delta)) => {
            request.start_time_ms_delta = Some(parse_duration_string(delta)?.as_millis() as i64);
        }
        _ => bail!(
            "you must specify the fault start time via --fault-start-time-ms \
             or --fault-start-time-delta"
        ),
    }
    match (args.fault_end_time_ms, &args.fault_duration) {
        (Some(end_ms), None) => request.end_time_ms = Some(end_ms),
        (None, Some(duration)) => {
            request.duration_ms = Some(parse_duration_string(duration)?.as_millis() as i64);
        }
        _ => bail!(
            "you must specify the fault end time via --fault-end-time-ms \
             or --fault-duration"
        ),
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn add_fault_should_compose_delta_and_duration_fields() {
        let args = args(&[
            "trogdor",
            "--agent",
            "example.com:8888",
            "--add-fault",
            "--fault-start-time-delta",
            "1h30m",
            "--fault-duration",
            "15s",
            "--fault-spec",
            r#"{"kind":"NoOpFault"}"#,
        ]);
        let request = build_add_fault_request(&args).unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["start_time_ms_delta"], 5_400_000);
        assert_eq!(body["duration_ms"], 15_000);
        assert_eq!(body["spec"], json!({ "kind": "NoOpFault" }));
        assert!(body.get("start_time_ms").is_none());
        assert!(body.get("end_time_ms").is_none());
    }

    #[test]
    fn add_fault_should_accept_absolute_times() {
        let args = args(&[
            "trogdor",
            "--agent",
            "[::1]:8888",
            "--add-fault",
            "--fault-start-time-ms",
            "1000",
            "--fault-end-time-ms",
            "2000",
            "--fault-spec",
            r#"{"kind":"NoOpFault"}"#,
        ]);
        let request = build_add_fault_request(&args).unwrap();
        assert_eq!(request.start_time_ms, Some(1000));
        assert_eq!(request.end_time_ms, Some(2000));
        assert_eq!(request.start_time_ms_delta, None);
        assert_eq!(request.duration_ms, None);
    }

    #[test]
    fn add_fault_should_require_a_spec_and_timing() {
        let parsed = args(&[
            "trogdor",
            "--agent",
            "example.com:8888",
            "--add-fault",
            "--fault-start-time-ms",
            "1000",
            "--fault-duration",
            "15s",
        ]);
        let err = build_add_fault_request(&parsed).unwrap_err();
        assert!(err.to_string().contains("--fault-spec"));

        let parsed = args(&[
            "trogdor",
            "--agent",
            "example.com:8888",
            "--add-fault",
            "--fault-spec",
            r#"{"kind":"NoOpFault"}"#,
            "--fault-duration",
            "15s",
        ]);
        let err = build_add_fault_request(&parsed).unwrap_err();
        assert!(err.to_string().contains("--fault-start-time"));
    }

    #[test]
    fn exactly_one_action_should_be_required() {
        assert!(Args::try_parse_from(["trogdor", "--agent", "example.com:8888"]).is_err());
        assert!(Args::try_parse_from([
            "trogdor",
            "--agent",
            "example.com:8888",
            "--status",
            "--faults"
        ])
        .is_err());
        assert!(Args::try_parse_from([
            "trogdor",
            "--agent",
            "example.com:8888",
            "--shutdown"
        ])
        .is_ok());
    }

    #[test]
    fn conflicting_timing_flags_should_be_rejected_by_the_parser() {
        assert!(Args::try_parse_from([
            "trogdor",
            "--agent",
            "example.com:8888",
            "--add-fault",
            "--fault-start-time-ms",
            "1",
            "--fault-start-time-delta",
            "5s",
            "--fault-spec",
            "{}"
        ])
        .is_err());
    }
}
